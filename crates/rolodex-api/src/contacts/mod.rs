//! Contact access for authenticated accounts

pub mod repository;

pub use repository::{clamp_limit, OwnedContacts, DEFAULT_LIMIT, MAX_LIMIT};
