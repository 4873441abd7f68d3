//! ProjectFlow client session core.
//!
//! SYSTEM CONTEXT
//! ==============
//! The dashboard UI only ever asks two questions of this crate: "who is signed
//! in?" and "may this path be shown right now?". `state` answers the first,
//! `util::auth` plus `routes` answer the second, and `shell` ties both to the
//! startup readiness signal. `services::gateway` is the single writer of
//! session state and talks to the identity service through `net::api`.

pub mod config;
pub mod net;
pub mod routes;
pub mod services;
pub mod shell;
pub mod state;
pub mod util;
