//! Test utilities for Deer services.
//!
//! Import from `[dev-dependencies]` only, never from production code.

pub mod auth;
