//! Cross-cutting HTTP plumbing shared by Deer services: the response
//! envelope, the common error type, configuration loading, tracing setup
//! and request-id middleware.

pub mod config;
pub mod error;
pub mod extract;
pub mod health;
pub mod middleware;
pub mod response;
pub mod serde;
pub mod tracing;
