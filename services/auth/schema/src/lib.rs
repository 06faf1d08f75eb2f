//! sea-orm entities for the auth service tables.

pub mod outbox_events;
pub mod users;
pub mod verification_codes;
