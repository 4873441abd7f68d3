//! Utility helpers shared across views.
//!
//! SYSTEM CONTEXT
//! ==============
//! Utility modules keep navigation policy out of the shell so it can be
//! tested as plain functions.

pub mod auth;
