//! Auth gateway: login, register, logout and startup session resolution.
//!
//! ARCHITECTURE
//! ============
//! The gateway is the only writer of the `SessionStore`. Each operation is a
//! complete transition: it marks the session loading, talks to the identity
//! API, then replaces the state in one step with the outcome.
//!
//! TRADE-OFFS
//! ==========
//! Credential operations are serialized through an async mutex, so a
//! double-submitted login runs twice in order instead of racing. `logout`
//! does not wait on that mutex; it always succeeds immediately and a login
//! still in flight may land after it (last write wins).
//!
//! A settled failure, whether a rejected attempt or a failed resolution,
//! always leaves durable state matching the anonymous session: the token is
//! deleted and the bearer detached, so a restart cannot revive an identity
//! the last attempt did not establish.

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use crate::net::api::{ApiError, IdentityApi};
use crate::net::types::{AuthResponse, User};
use crate::state::auth::{SessionPhase, SessionState, SessionStore};

const MISSING_FIELDS: &str = "Missing required fields";

/// User-facing failure of a login or register attempt. `Display` is the
/// message stored in `SessionState::error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The identity service refused the request with its own message.
    #[error("{0}")]
    Rejected(String),

    /// The identity service could not be reached.
    #[error("Unable to reach the identity service: {0}")]
    Unavailable(String),

    /// The identity service answered with a body we could not read.
    #[error("Unexpected response from the identity service: {0}")]
    Malformed(String),
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::InvalidCredentials | ApiError::Unauthorized => Self::InvalidCredentials,
            ApiError::Rejected { message, .. } => Self::Rejected(message),
            ApiError::Decode(_) => Self::Malformed(err.to_string()),
            ApiError::Transport(_) | ApiError::HttpClientBuild(_) => Self::Unavailable(err.to_string()),
        }
    }
}

pub struct AuthGateway {
    store: Arc<SessionStore>,
    api: Arc<dyn IdentityApi>,
    resolve_timeout: Duration,
    op_lock: Mutex<()>,
    pending: AtomicUsize,
}

/// Counts one queued or running operation for as long as it lives.
struct Pending<'a>(&'a AtomicUsize);

impl<'a> Pending<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Held for the duration of one credential operation. Dropping it before the
/// operation settles (caller future cancelled) clears the loading flag so the
/// shell does not stay on the loading view forever.
struct Operation<'a> {
    _lock: MutexGuard<'a, ()>,
    _pending: Pending<'a>,
    gateway: &'a AuthGateway,
    settled: bool,
}

impl Operation<'_> {
    fn settle(&mut self, state: SessionState) {
        self.gateway.store.set_state(state);
        self.settled = true;
    }
}

impl Drop for Operation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.gateway.store.update(|s| s.loading = false);
        }
    }
}

impl AuthGateway {
    pub fn new(store: Arc<SessionStore>, api: Arc<dyn IdentityApi>, resolve_timeout: Duration) -> Self {
        Self { store, api, resolve_timeout, op_lock: Mutex::new(()), pending: AtomicUsize::new(0) }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// True while a login, register or resolution is running or queued
    /// behind one. Forms use it to refuse re-entrant submission.
    pub fn is_busy(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    async fn begin(&self) -> Operation<'_> {
        let pending = Pending::enter(&self.pending);
        let lock = self.op_lock.lock().await;
        Operation { _lock: lock, _pending: pending, gateway: self, settled: false }
    }

    /// Re-derive the user from the persisted token. Called once at startup.
    ///
    /// Failures are absorbed: whether the service rejects the token, cannot
    /// be reached, or does not answer within the resolve timeout, the token is
    /// deleted and the session becomes anonymous without a user-visible error.
    pub async fn resolve_existing_session(&self) -> SessionPhase {
        let mut op = self.begin().await;

        let Some(token) = self.store.get_token() else {
            tracing::debug!("no persisted token; session is anonymous");
            op.settle(SessionState::anonymous());
            return SessionPhase::Anonymous;
        };

        self.store.set_state(SessionState::resolving());
        self.api.set_bearer_token(Some(&token));

        match tokio::time::timeout(self.resolve_timeout, self.api.current_user()).await {
            Ok(Ok(user)) => {
                tracing::info!(user_id = user.id, "restored session from persisted token");
                op.settle(SessionState::authenticated(user));
                return SessionPhase::Authenticated;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "failed to get current user; discarding persisted token");
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = u64::try_from(self.resolve_timeout.as_millis()).unwrap_or(u64::MAX),
                    "session resolution timed out; discarding persisted token"
                );
            }
        }

        self.discard_credentials();
        op.settle(SessionState::anonymous());
        SessionPhase::Anonymous
    }

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] whose message was also stored in the session
    /// state, so the calling view can stay on its form.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let mut op = self.begin().await;
        self.start_attempt();

        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(self.fail(&mut op, "login", AuthError::Validation(MISSING_FIELDS.to_owned())));
        }

        match self.api.login(email, password).await {
            Ok(resp) => Ok(self.establish(&mut op, "login", resp)),
            Err(e) => Err(self.fail(&mut op, "login", e.into())),
        }
    }

    /// Create a new identity and sign in as it. New identities get the
    /// least-privileged role.
    ///
    /// # Errors
    ///
    /// Same contract as [`AuthGateway::login`].
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let mut op = self.begin().await;
        self.start_attempt();

        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(self.fail(&mut op, "register", AuthError::Validation(MISSING_FIELDS.to_owned())));
        }

        match self.api.register(name, email, password).await {
            Ok(resp) => Ok(self.establish(&mut op, "register", resp)),
            Err(e) => Err(self.fail(&mut op, "register", e.into())),
        }
    }

    /// Drop the session: delete the token, detach it from requests, clear the user.
    pub fn logout(&self) {
        let was_signed_in = self.store.snapshot().user.is_some();
        self.discard_credentials();
        self.store.set_state(SessionState::anonymous());
        if was_signed_in {
            tracing::info!("logged out");
        }
    }

    fn discard_credentials(&self) {
        self.store.clear_token();
        self.api.set_bearer_token(None);
    }

    fn start_attempt(&self) {
        self.store.update(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn establish(&self, op: &mut Operation<'_>, action: &'static str, resp: AuthResponse) -> User {
        self.store.persist_token(&resp.token);
        self.api.set_bearer_token(Some(&resp.token));
        tracing::info!(user_id = resp.user.id, role = %resp.user.role, action, "session established");
        op.settle(SessionState::authenticated(resp.user.clone()));
        resp.user
    }

    fn fail(&self, op: &mut Operation<'_>, action: &'static str, err: AuthError) -> AuthError {
        tracing::warn!(error = %err, action, "authentication attempt failed");
        self.discard_credentials();
        op.settle(SessionState::failed(err.to_string()));
        err
    }
}
