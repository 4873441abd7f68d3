//! Networking modules for the identity service.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` defines the `IdentityApi` capability and its HTTP implementation,
//! `mock` provides the in-memory stand-in used by demos and tests, and
//! `types` defines the shared wire schema.

pub mod api;
pub mod mock;
pub mod types;
