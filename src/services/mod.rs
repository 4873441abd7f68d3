//! Session services.
//!
//! ARCHITECTURE
//! ============
//! `gateway` owns every session-state write. Views and the shell only read.

pub mod gateway;
