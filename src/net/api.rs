//! Identity API capability and its HTTP implementation.
//!
//! DESIGN
//! ======
//! The gateway depends on `dyn IdentityApi`, never on a concrete client, so a
//! real HTTP service and the in-memory mock are interchangeable. The bearer
//! token lives on the API object itself, mirroring default request headers:
//! once attached, every authenticated call carries it until it is removed.
//!
//! ERROR HANDLING
//! ==============
//! HTTP status codes are mapped to `ApiError` variants in pure helpers so the
//! mapping is testable without a network.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;

use super::types::{AuthResponse, CurrentUserResponse, ErrorBody, LoginRequest, RegisterRequest, User};
use crate::config::HttpTimeouts;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The identity service rejected the identifier/secret pair.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The bearer token is missing, expired or unknown.
    #[error("not authenticated")]
    Unauthorized,

    /// The identity service refused the request for another reason.
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body did not match the expected schema.
    #[error("response parse failed: {0}")]
    Decode(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// IDENTITY API TRAIT
// =============================================================================

/// Provider-neutral identity service. Enables mocking in tests.
#[async_trait::async_trait]
pub trait IdentityApi: Send + Sync {
    /// Exchange credentials for a token and identity (`POST /auth/login`).
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidCredentials`] when rejected; transport or decode
    /// errors otherwise.
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError>;

    /// Create an identity and return its first token (`POST /auth/register`).
    ///
    /// # Errors
    ///
    /// [`ApiError::Rejected`] for duplicate or malformed registrations.
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse, ApiError>;

    /// Look up the identity owning the attached bearer token (`GET /auth/me`).
    ///
    /// # Errors
    ///
    /// [`ApiError::Unauthorized`] when no token is attached or it is not accepted.
    async fn current_user(&self) -> Result<User, ApiError>;

    /// Attach (`Some`) or remove (`None`) the bearer token sent with later requests.
    fn set_bearer_token(&self, token: Option<&str>);

    /// The bearer token currently attached, if any.
    fn bearer_token(&self) -> Option<String>;
}

/// Shared slot for the `Authorization: Bearer` credential.
#[derive(Debug, Default)]
pub struct BearerSlot(RwLock<Option<String>>);

impl BearerSlot {
    pub fn set(&self, token: Option<&str>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = token.map(str::to_owned);
    }

    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpIdentityApi {
    http: reqwest::Client,
    base_url: String,
    bearer: BearerSlot,
}

impl HttpIdentityApi {
    /// Build a client rooted at `base_url` (e.g. `https://host/api`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the reqwest client cannot be built.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned(), bearer: BearerSlot::default() })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn exchange<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<AuthResponse, ApiError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(map_status(status, &text, ApiError::InvalidCredentials));
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl IdentityApi for HttpIdentityApi {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.exchange("/auth/login", &LoginRequest { email, password }).await
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.exchange("/auth/register", &RegisterRequest { name, email, password }).await
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        let Some(token) = self.bearer.get() else {
            return Err(ApiError::Unauthorized);
        };
        let response = self
            .http
            .get(self.endpoint("/auth/me"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(map_status(status, &text, ApiError::Unauthorized));
        }
        serde_json::from_str::<CurrentUserResponse>(&text)
            .map(CurrentUserResponse::into_user)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn set_bearer_token(&self, token: Option<&str>) {
        self.bearer.set(token);
    }

    fn bearer_token(&self) -> Option<String> {
        self.bearer.get()
    }
}

// =============================================================================
// STATUS MAPPING
// =============================================================================

/// Map a non-success status to an error; `on_unauthorized` is returned for 401.
fn map_status(status: u16, body: &str, on_unauthorized: ApiError) -> ApiError {
    if status == 401 {
        return on_unauthorized;
    }
    ApiError::Rejected { status, message: error_message(status, body) }
}

/// Pull a human-readable message out of an error body.
fn error_message(status: u16, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("identity service returned status {status}")
    } else {
        trimmed.to_owned()
    }
}
