//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Used by the route guard and user-aware views to coordinate login redirects
//! and identity-dependent rendering. The gateway is the only writer; every
//! other consumer reads a snapshot or subscribes for changes.
//!
//! DESIGN
//! ======
//! State lives in a `tokio::sync::watch` channel. A write replaces the whole
//! `SessionState` in one step, so readers never observe a half-applied
//! transition, and subscribers are woken on every replacement.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::Arc;

use tokio::sync::watch;

use super::storage::{DurableStorage, TOKEN_KEY};
use crate::net::types::User;

/// Authentication state tracking the current user, loading status and last error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::resolving()
    }
}

impl SessionState {
    /// Startup state: identity unknown, resolution pending.
    #[must_use]
    pub fn resolving() -> Self {
        Self { user: None, loading: true, error: None }
    }

    #[must_use]
    pub fn authenticated(user: User) -> Self {
        Self { user: Some(user), loading: false, error: None }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self { user: None, loading: false, error: None }
    }

    /// Anonymous with a user-visible error from a failed attempt.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self { user: None, loading: false, error: Some(error.into()) }
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match (self.loading, &self.user) {
            (true, _) => SessionPhase::Resolving,
            (false, Some(_)) => SessionPhase::Authenticated,
            (false, None) => SessionPhase::Anonymous,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// An identity operation is in flight.
    Resolving,
    Authenticated,
    Anonymous,
}

/// Single source of truth for "who is logged in".
pub struct SessionStore {
    state: watch::Sender<SessionState>,
    storage: Arc<dyn DurableStorage>,
}

impl SessionStore {
    /// Create a store in the `Resolving` state backed by `storage`.
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        let (state, _) = watch::channel(SessionState::resolving());
        Self { state, storage }
    }

    /// The persisted credential token, if any. Unreadable storage counts as absent.
    pub fn get_token(&self) -> Option<String> {
        match self.storage.get_item(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted token");
                None
            }
        }
    }

    pub(crate) fn persist_token(&self, token: &str) {
        if let Err(e) = self.storage.set_item(TOKEN_KEY, token) {
            tracing::warn!(error = %e, "failed to persist token");
        }
    }

    pub(crate) fn clear_token(&self) {
        if let Err(e) = self.storage.remove_item(TOKEN_KEY) {
            tracing::warn!(error = %e, "failed to delete persisted token");
        }
    }

    /// Replace the session state atomically and notify subscribers.
    pub(crate) fn set_state(&self, state: SessionState) {
        tracing::debug!(phase = ?state.phase(), has_error = state.error.is_some(), "session state replaced");
        self.state.send_replace(state);
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut SessionState)) {
        self.state.send_modify(f);
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Observer handle woken on every state replacement.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}
