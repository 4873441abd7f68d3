//! Shared route-guard policy.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every view must apply identical redirect behavior, so the decision is a
//! pure function of session state, shell readiness and the route's access
//! class.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use crate::routes::{Access, Route};
use crate::state::auth::SessionState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show the loading view; no route content yet.
    Loading,
    /// Send the user to another route instead.
    Redirect(Route),
    /// Show the requested route.
    Render,
}

/// True once auth has settled and no user is present.
#[must_use]
pub fn should_redirect_unauth(state: &SessionState) -> bool {
    !state.loading && state.user.is_none()
}

/// Decide what to show for `route`.
///
/// Loading wins over everything, including not-found pages: until the shell
/// is ready nothing route-specific is rendered.
#[must_use]
pub fn guard(state: &SessionState, ready: bool, route: &Route) -> GuardDecision {
    if state.loading || !ready {
        return GuardDecision::Loading;
    }
    match route.access() {
        Access::Open => GuardDecision::Render,
        Access::Protected if should_redirect_unauth(state) => GuardDecision::Redirect(Route::Login),
        Access::Public if state.user.is_some() => GuardDecision::Redirect(Route::Dashboard),
        Access::Protected | Access::Public => GuardDecision::Render,
    }
}
