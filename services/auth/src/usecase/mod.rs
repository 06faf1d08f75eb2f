pub mod account;
pub mod admin;
pub mod outbox;
pub mod password;
pub mod verification;
