//! In-memory identity service.
//!
//! Seeds the demo account, issues random hex tokens and keeps the token to
//! user mapping in process memory. Test hooks simulate latency, outages and
//! revoked tokens.

#[cfg(test)]
#[path = "mock_test.rs"]
mod mock_test;

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::Rng;

use super::api::{ApiError, BearerSlot, IdentityApi};
use super::types::{AuthResponse, Role, User};

pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "password";
pub const DEMO_NAME: &str = "Demo User";
pub const DEMO_AVATAR: &str =
    "https://images.pexels.com/photos/220453/pexels-photo-220453.jpeg?auto=compress&cs=tinysrgb&dpr=2&h=750&w=1260";

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
pub struct MockIdentityApi {
    accounts: Mutex<Vec<Account>>,
    /// token -> user id
    sessions: Mutex<HashMap<String, u64>>,
    bearer: BearerSlot,
    calls: AtomicUsize,
    offline: AtomicBool,
    latency: Option<Duration>,
}

impl MockIdentityApi {
    /// Empty service with no accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Service seeded with the demo account (`demo@example.com` / `password`).
    #[must_use]
    pub fn with_demo_account() -> Self {
        let api = Self::new();
        api.lock_accounts().push(Account {
            user: User {
                id: 1,
                name: DEMO_NAME.to_owned(),
                email: DEMO_EMAIL.to_owned(),
                role: Role::Admin,
                avatar: Some(DEMO_AVATAR.to_owned()),
            },
            password: DEMO_PASSWORD.to_owned(),
        });
        api
    }

    /// Delay every request by `latency` before answering.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of identity requests received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// While offline, every request fails as a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Forget a previously issued token so it no longer resolves.
    pub fn revoke(&self, token: &str) {
        self.lock_sessions().remove(token);
    }

    fn lock_accounts(&self) -> std::sync::MutexGuard<'_, Vec<Account>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, u64>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self) -> Result<(), ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("identity service unreachable".to_owned()));
        }
        Ok(())
    }

    fn issue(&self, user: User) -> AuthResponse {
        let token = generate_token();
        self.lock_sessions().insert(token.clone(), user.id);
        AuthResponse { token, user }
    }
}

#[async_trait::async_trait]
impl IdentityApi for MockIdentityApi {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.enter().await?;
        let user = self
            .lock_accounts()
            .iter()
            .find(|a| a.user.email == email && a.password == password)
            .map(|a| a.user.clone())
            .ok_or(ApiError::InvalidCredentials)?;
        Ok(self.issue(user))
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.enter().await?;
        let user = {
            let mut accounts = self.lock_accounts();
            if accounts.iter().any(|a| a.user.email == email) {
                return Err(ApiError::Rejected { status: 400, message: "User already exists".to_owned() });
            }
            let user = User {
                id: accounts.len() as u64 + 1,
                name: name.to_owned(),
                email: email.to_owned(),
                role: Role::User,
                avatar: None,
            };
            accounts.push(Account { user: user.clone(), password: password.to_owned() });
            user
        };
        Ok(self.issue(user))
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.enter().await?;
        let token = self.bearer.get().ok_or(ApiError::Unauthorized)?;
        let user_id = self
            .lock_sessions()
            .get(&token)
            .copied()
            .ok_or(ApiError::Unauthorized)?;
        self.lock_accounts()
            .iter()
            .find(|a| a.user.id == user_id)
            .map(|a| a.user.clone())
            .ok_or(ApiError::Unauthorized)
    }

    fn set_bearer_token(&self, token: Option<&str>) {
        self.bearer.set(token);
    }

    fn bearer_token(&self) -> Option<String> {
        self.bearer.get()
    }
}
