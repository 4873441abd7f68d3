use super::*;
use crate::net::mock::{DEMO_EMAIL, DEMO_NAME, DEMO_PASSWORD, MockIdentityApi};
use crate::net::types::Role;
use crate::state::storage::{DurableStorage, MemoryStorage, TOKEN_KEY};

// =========================================================================
// Harness
// =========================================================================

struct Harness {
    api: Arc<MockIdentityApi>,
    storage: Arc<MemoryStorage>,
    gateway: AuthGateway,
}

impl Harness {
    fn new(api: MockIdentityApi) -> Self {
        Self::with_storage(Arc::new(api), Arc::new(MemoryStorage::new()), Duration::from_secs(5))
    }

    fn with_storage(api: Arc<MockIdentityApi>, storage: Arc<MemoryStorage>, resolve_timeout: Duration) -> Self {
        let store = Arc::new(SessionStore::new(storage.clone()));
        let gateway = AuthGateway::new(store, api.clone(), resolve_timeout);
        Self { api, storage, gateway }
    }

    fn state(&self) -> SessionState {
        self.gateway.store().snapshot()
    }

    fn persisted_token(&self) -> Option<String> {
        self.storage.get_item(TOKEN_KEY).unwrap()
    }
}

// =========================================================================
// AuthError mapping
// =========================================================================

#[test]
fn api_errors_map_to_user_facing_kinds() {
    assert_eq!(AuthError::from(ApiError::InvalidCredentials), AuthError::InvalidCredentials);
    assert_eq!(AuthError::from(ApiError::Unauthorized), AuthError::InvalidCredentials);
    assert_eq!(
        AuthError::from(ApiError::Rejected { status: 400, message: "User already exists".to_owned() }),
        AuthError::Rejected("User already exists".to_owned())
    );
    assert!(matches!(AuthError::from(ApiError::Transport("refused".to_owned())), AuthError::Unavailable(_)));
}

#[test]
fn unreadable_response_is_not_reported_as_unreachable() {
    let err = AuthError::from(ApiError::Decode("missing field `token`".to_owned()));
    assert!(matches!(err, AuthError::Malformed(_)));
    assert!(!err.to_string().contains("Unable to reach"));
}

#[test]
fn invalid_credentials_message_matches_login_form_copy() {
    assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid email or password");
}

// =========================================================================
// resolve_existing_session
// =========================================================================

#[tokio::test]
async fn resolve_without_token_is_anonymous_without_api_call() {
    let h = Harness::new(MockIdentityApi::with_demo_account());
    assert_eq!(h.state().phase(), SessionPhase::Resolving);

    let phase = h.gateway.resolve_existing_session().await;

    assert_eq!(phase, SessionPhase::Anonymous);
    assert_eq!(h.state(), SessionState::anonymous());
    assert_eq!(h.api.calls(), 0);
}

#[tokio::test]
async fn login_then_restart_restores_same_user() {
    let api = Arc::new(MockIdentityApi::with_demo_account());
    let storage = Arc::new(MemoryStorage::new());

    let first = Harness::with_storage(api.clone(), storage.clone(), Duration::from_secs(5));
    let user = first.gateway.login(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();

    // Fresh process: new store over the same durable storage, no headers attached.
    api.set_bearer_token(None);
    let second = Harness::with_storage(api.clone(), storage, Duration::from_secs(5));
    let phase = second.gateway.resolve_existing_session().await;

    assert_eq!(phase, SessionPhase::Authenticated);
    assert_eq!(second.state().user, Some(user));
    assert_eq!(api.bearer_token(), second.persisted_token());
}

#[tokio::test]
async fn resolve_with_stale_token_discards_it_silently() {
    let h = Harness::new(MockIdentityApi::with_demo_account());
    h.storage.set_item(TOKEN_KEY, "stale-token").unwrap();

    let phase = h.gateway.resolve_existing_session().await;

    assert_eq!(phase, SessionPhase::Anonymous);
    assert_eq!(h.state(), SessionState::anonymous());
    assert_eq!(h.state().error, None);
    assert_eq!(h.persisted_token(), None);
    assert_eq!(h.api.bearer_token(), None);
}

#[tokio::test]
async fn resolve_timeout_falls_back_to_anonymous_and_discards_token() {
    let api = Arc::new(MockIdentityApi::with_demo_account().with_latency(Duration::from_secs(30)));
    let storage = Arc::new(MemoryStorage::new());
    storage.set_item(TOKEN_KEY, "maybe-valid").unwrap();
    let h = Harness::with_storage(api, storage, Duration::from_millis(20));

    let phase = h.gateway.resolve_existing_session().await;

    assert_eq!(phase, SessionPhase::Anonymous);
    assert_eq!(h.state(), SessionState::anonymous());
    assert_eq!(h.persisted_token(), None);
    assert_eq!(h.api.bearer_token(), None);
}

#[tokio::test]
async fn resolve_with_unreachable_service_discards_token_silently() {
    let api = Arc::new(MockIdentityApi::with_demo_account());
    let storage = Arc::new(MemoryStorage::new());
    let first = Harness::with_storage(api.clone(), storage.clone(), Duration::from_secs(5));
    first.gateway.login(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();

    api.set_bearer_token(None);
    api.set_offline(true);
    let second = Harness::with_storage(api.clone(), storage, Duration::from_secs(5));
    let phase = second.gateway.resolve_existing_session().await;

    assert_eq!(phase, SessionPhase::Anonymous);
    assert_eq!(second.state(), SessionState::anonymous());
    assert_eq!(second.persisted_token(), None);
    assert_eq!(api.bearer_token(), None);
}

// =========================================================================
// login
// =========================================================================

#[tokio::test]
async fn demo_login_succeeds_and_persists_token() {
    let h = Harness::new(MockIdentityApi::with_demo_account());

    let user = h.gateway.login("demo@example.com", "password").await.unwrap();

    assert_eq!(user.name, DEMO_NAME);
    let state = h.state();
    assert_eq!(state.user.as_ref().map(|u| u.name.as_str()), Some("Demo User"));
    assert!(!state.loading);
    assert!(state.error.is_none());
    let token = h.persisted_token().expect("token persisted");
    assert_eq!(h.api.bearer_token(), Some(token));
}

#[tokio::test]
async fn wrong_credentials_fail_with_visible_error() {
    let h = Harness::new(MockIdentityApi::with_demo_account());

    let err = h.gateway.login("wrong@example.com", "bad").await.unwrap_err();

    assert_eq!(err, AuthError::InvalidCredentials);
    let state = h.state();
    assert!(state.user.is_none());
    assert!(!state.loading);
    assert!(!state.error.as_deref().unwrap_or_default().is_empty());
    assert_eq!(h.persisted_token(), None);
}

#[tokio::test]
async fn failed_login_while_signed_in_does_not_survive_restart() {
    let api = Arc::new(MockIdentityApi::with_demo_account());
    let storage = Arc::new(MemoryStorage::new());
    let first = Harness::with_storage(api.clone(), storage.clone(), Duration::from_secs(5));
    first.gateway.login(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();

    let err = first.gateway.login(DEMO_EMAIL, "bad").await.unwrap_err();

    assert_eq!(err, AuthError::InvalidCredentials);
    assert_eq!(first.state(), SessionState::failed("Invalid email or password"));
    assert_eq!(first.persisted_token(), None);
    assert_eq!(api.bearer_token(), None);

    let second = Harness::with_storage(api.clone(), storage, Duration::from_secs(5));
    let calls_before = api.calls();
    assert_eq!(second.gateway.resolve_existing_session().await, SessionPhase::Anonymous);
    assert_eq!(api.calls(), calls_before);
}

#[tokio::test]
async fn failed_register_while_signed_in_discards_credentials() {
    let h = Harness::new(MockIdentityApi::with_demo_account());
    h.gateway.login(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();

    let err = h.gateway.register("Someone", DEMO_EMAIL, "pw").await.unwrap_err();

    assert_eq!(err, AuthError::Rejected("User already exists".to_owned()));
    assert!(h.state().user.is_none());
    assert_eq!(h.persisted_token(), None);
    assert_eq!(h.api.bearer_token(), None);
}

#[tokio::test]
async fn blank_credentials_never_reach_the_api() {
    let h = Harness::new(MockIdentityApi::with_demo_account());

    let err = h.gateway.login("   ", "password").await.unwrap_err();

    assert_eq!(err, AuthError::Validation("Missing required fields".to_owned()));
    assert_eq!(h.state().error.as_deref(), Some("Missing required fields"));
    assert_eq!(h.api.calls(), 0);
}

#[tokio::test]
async fn transport_failure_is_surfaced_as_unavailable() {
    let h = Harness::new(MockIdentityApi::with_demo_account());
    h.api.set_offline(true);

    let err = h.gateway.login(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap_err();

    assert!(matches!(err, AuthError::Unavailable(_)));
    assert!(h.state().error.unwrap().starts_with("Unable to reach the identity service"));
}

#[tokio::test]
async fn new_attempt_clears_previous_error_while_in_flight() {
    let api = Arc::new(MockIdentityApi::with_demo_account().with_latency(Duration::from_millis(50)));
    let h = Arc::new(Harness::with_storage(api, Arc::new(MemoryStorage::new()), Duration::from_secs(5)));
    let _ = h.gateway.login(DEMO_EMAIL, "bad").await;
    assert!(h.state().error.is_some());

    let mut rx = h.gateway.store().subscribe();
    let task = {
        let h = h.clone();
        tokio::spawn(async move { h.gateway.login(DEMO_EMAIL, DEMO_PASSWORD).await })
    };

    let in_flight: SessionState = (*rx.wait_for(|s| s.loading).await.unwrap()).clone();
    assert!(in_flight.error.is_none());
    assert!(h.gateway.is_busy());

    task.await.unwrap().unwrap();
    assert_eq!(h.state().phase(), SessionPhase::Authenticated);
    assert!(!h.gateway.is_busy());
}

#[tokio::test]
async fn overlapping_logins_are_serialized() {
    let api = Arc::new(MockIdentityApi::with_demo_account().with_latency(Duration::from_millis(20)));
    let h = Harness::with_storage(api, Arc::new(MemoryStorage::new()), Duration::from_secs(5));

    let (a, b) = tokio::join!(
        h.gateway.login(DEMO_EMAIL, DEMO_PASSWORD),
        h.gateway.login(DEMO_EMAIL, DEMO_PASSWORD),
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(h.api.calls(), 2);
    assert_eq!(h.state().phase(), SessionPhase::Authenticated);
    assert_eq!(h.api.bearer_token(), h.persisted_token());
}

#[tokio::test]
async fn queued_login_keeps_gateway_busy_across_handover() {
    let h = Arc::new(Harness::new(MockIdentityApi::with_demo_account()));
    let running = h.gateway.begin().await;

    let queued = {
        let h = h.clone();
        tokio::spawn(async move { h.gateway.login(DEMO_EMAIL, DEMO_PASSWORD).await })
    };
    while h.gateway.pending.load(Ordering::SeqCst) < 2 {
        tokio::task::yield_now().await;
    }

    drop(running);
    assert!(h.gateway.is_busy());

    queued.await.unwrap().unwrap();
    assert!(!h.gateway.is_busy());
}

#[tokio::test]
async fn cancelled_login_does_not_leave_session_loading() {
    let api = Arc::new(MockIdentityApi::with_demo_account().with_latency(Duration::from_secs(30)));
    let h = Harness::with_storage(api, Arc::new(MemoryStorage::new()), Duration::from_secs(5));
    h.gateway.resolve_existing_session().await;

    let outcome = tokio::time::timeout(Duration::from_millis(20), h.gateway.login(DEMO_EMAIL, DEMO_PASSWORD)).await;

    assert!(outcome.is_err());
    assert!(!h.state().loading);
    assert!(!h.gateway.is_busy());
}

// =========================================================================
// register
// =========================================================================

#[tokio::test]
async fn register_signs_in_with_least_privileged_role() {
    let h = Harness::new(MockIdentityApi::with_demo_account());

    let user = h.gateway.register("Grace Hopper", "grace@example.com", "secret").await.unwrap();

    assert_eq!(user.role, Role::User);
    assert_eq!(h.state(), SessionState::authenticated(user));
    assert!(h.persisted_token().is_some());
}

#[tokio::test]
async fn register_duplicate_keeps_session_anonymous() {
    let h = Harness::new(MockIdentityApi::with_demo_account());

    let err = h.gateway.register("Someone", DEMO_EMAIL, "pw").await.unwrap_err();

    assert_eq!(err, AuthError::Rejected("User already exists".to_owned()));
    assert_eq!(h.state(), SessionState::failed("User already exists"));
}

#[tokio::test]
async fn register_requires_display_name() {
    let h = Harness::new(MockIdentityApi::with_demo_account());
    let err = h.gateway.register("", "grace@example.com", "secret").await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
    assert_eq!(h.api.calls(), 0);
}

// =========================================================================
// logout
// =========================================================================

#[tokio::test]
async fn logout_clears_user_token_and_header() {
    let h = Harness::new(MockIdentityApi::with_demo_account());
    h.gateway.login(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();

    h.gateway.logout();

    assert_eq!(h.state(), SessionState::anonymous());
    assert_eq!(h.persisted_token(), None);
    assert_eq!(h.api.bearer_token(), None);
}

#[tokio::test]
async fn logout_when_anonymous_is_a_no_op() {
    let h = Harness::new(MockIdentityApi::with_demo_account());
    h.gateway.resolve_existing_session().await;

    h.gateway.logout();
    h.gateway.logout();

    assert_eq!(h.state(), SessionState::anonymous());
}

#[tokio::test]
async fn login_logout_sequences_never_leak_user() {
    let h = Harness::new(MockIdentityApi::with_demo_account());
    for _ in 0..3 {
        h.gateway.login(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();
        assert!(h.state().user.is_some());
        h.gateway.logout();
        assert!(h.state().user.is_none());
    }
}
