//! Persistence traits and backends
//!
//! The stores are the only shared mutable state in the system. Every
//! contact operation takes the owning account id, so no method can reach a
//! row belonging to another tenant.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::birthday::BirthdayWindow;
use crate::models::{Account, Contact, ContactFields, ContactSearch, NewAccount};
use crate::Result;

/// Trait for account persistence
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up an account by email, ignoring case
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Look up an account by id
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>>;

    /// Insert a new, unconfirmed account
    ///
    /// Fails with `EmailAlreadyRegistered` if the email is taken.
    async fn create_account(&self, account: NewAccount) -> Result<Account>;

    /// Replace (or clear) the stored refresh token digest
    async fn set_refresh_token(&self, account_id: i64, digest: Option<&str>) -> Result<()>;

    /// Set the confirmed flag; a no-op when already set
    async fn mark_confirmed(&self, account_id: i64) -> Result<()>;

    /// Replace the password hash
    async fn set_password_hash(&self, account_id: i64, password_hash: &str) -> Result<()>;

    /// Replace the avatar URL and return the updated account
    async fn set_avatar(&self, account_id: i64, url: &str) -> Result<Account>;
}

/// Trait for owner-scoped contact persistence
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Page through an owner's contacts in insertion order
    async fn list_contacts(&self, owner_id: i64, offset: i64, limit: i64) -> Result<Vec<Contact>>;

    /// Fetch one contact if it exists and belongs to the owner
    async fn get_contact(&self, owner_id: i64, id: i64) -> Result<Option<Contact>>;

    /// Insert a contact for the owner
    ///
    /// Fails with `DuplicateContactEmail` if any contact already uses the email.
    async fn create_contact(&self, owner_id: i64, fields: &ContactFields) -> Result<Contact>;

    /// Replace every field of an owned contact
    async fn update_contact(
        &self,
        owner_id: i64,
        id: i64,
        fields: &ContactFields,
    ) -> Result<Option<Contact>>;

    /// Delete an owned contact, returning the removed row
    async fn delete_contact(&self, owner_id: i64, id: i64) -> Result<Option<Contact>>;

    /// Filter an owner's contacts
    ///
    /// `birthdays`, when given, keeps only contacts whose month/day falls in
    /// the window.
    async fn search_contacts(
        &self,
        owner_id: i64,
        search: &ContactSearch,
        birthdays: Option<&BirthdayWindow>,
    ) -> Result<Vec<Contact>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
