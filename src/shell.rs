//! App shell: readiness gate plus route guard.
//!
//! ARCHITECTURE
//! ============
//! `start` spawns startup resolution in the background and flips a readiness
//! signal once it has completed and the minimum loading display has elapsed.
//! Until then every path renders the loading view. After that, each render
//! reads one session snapshot and hands it to the guard.

#[cfg(test)]
#[path = "shell_test.rs"]
mod shell_test;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::routes::{LANDING_PATH, Route};
use crate::services::gateway::AuthGateway;
use crate::state::auth::SessionState;
use crate::util::auth::{GuardDecision, guard};

/// Redirect chains longer than this are cut short.
const MAX_REDIRECTS: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum View {
    Loading,
    Redirect { to: String },
    Page(Route),
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => f.write_str("Loading..."),
            Self::Redirect { to } => write!(f, "redirect -> {to}"),
            Self::Page(route) => write!(f, "{route}"),
        }
    }
}

/// Where a navigation ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Navigation {
    pub path: String,
    pub view: View,
}

pub struct AppShell {
    gateway: Arc<AuthGateway>,
    ready: watch::Receiver<bool>,
}

impl AppShell {
    /// Start resolving the persisted session and return immediately.
    pub fn start(gateway: Arc<AuthGateway>, min_loading: Duration) -> Self {
        let (ready_tx, ready) = watch::channel(false);
        let started = Instant::now();
        let startup = gateway.clone();
        tokio::spawn(async move {
            let phase = startup.resolve_existing_session().await;
            tokio::time::sleep_until(started + min_loading).await;
            tracing::debug!(?phase, "app shell ready");
            ready_tx.send_replace(true);
        });
        Self { gateway, ready }
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<AuthGateway> {
        &self.gateway
    }

    #[must_use]
    pub fn session(&self) -> SessionState {
        self.gateway.store().snapshot()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait until startup resolution and the minimum loading display are done.
    pub async fn wait_ready(&self) {
        let mut ready = self.ready.clone();
        if ready.wait_for(|r| *r).await.is_err() {
            tracing::warn!("startup task ended without signalling readiness");
        }
    }

    /// What to show for `path` right now.
    #[must_use]
    pub fn render(&self, path: &str) -> View {
        let route = Route::parse(path);
        match guard(&self.session(), self.is_ready(), &route) {
            GuardDecision::Loading => View::Loading,
            GuardDecision::Redirect(to) => View::Redirect { to: to.path() },
            GuardDecision::Render if route == Route::Index => View::Redirect { to: LANDING_PATH.to_owned() },
            GuardDecision::Render => View::Page(route),
        }
    }

    /// Render `path` and follow redirects to the final view.
    #[must_use]
    pub fn navigate(&self, path: &str) -> Navigation {
        let mut current = path.to_owned();
        for _ in 0..MAX_REDIRECTS {
            match self.render(&current) {
                View::Redirect { to } => {
                    tracing::debug!(from = %current, %to, "following redirect");
                    current = to;
                }
                view => return Navigation { path: current, view },
            }
        }
        tracing::warn!(path, "redirect limit reached");
        let view = self.render(&current);
        Navigation { path: current, view }
    }
}
