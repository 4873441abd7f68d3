//! Client state containers.
//!
//! SYSTEM CONTEXT
//! ==============
//! `auth` is the session store read by the shell and route guard; `storage`
//! is the durable key-value store the session token lives in.

pub mod auth;
pub mod storage;
