//! Auth types shared across Deer services.
//!
//! Provides the bearer-token service, the request identity and its
//! extractors, and the static route policy consulted by the gate.

pub mod identity;
pub mod policy;
pub mod token;
