//! Domain types shared across all Deer services.
//!
//! This crate contains only pure types and input validators with no framework
//! dependencies. Import in `usecase/` and `domain/` layers; never in `infra/`.

pub mod id;
pub mod user;
pub mod validate;
pub mod verification;

/// Returned when a wire string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}
