//! Ownership-scoped contact access
//!
//! `OwnedContacts` binds a store handle to one resolved account. Every call
//! forwards that account's id, so a handler holding one cannot read or
//! modify another tenant's rows.

use chrono::NaiveDate;
use rolodex_core::{
    Account, BirthdayWindow, Contact, ContactSearch, ContactStore, CreateContact, Result,
    UpdateContact,
};
use tracing::debug;

/// Page size when the caller gives none, and the largest accepted
pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 100;

/// Clamp a requested page size into `1..=MAX_LIMIT`
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Contacts belonging to one account
pub struct OwnedContacts<'a> {
    store: &'a dyn ContactStore,
    owner_id: i64,
    today: NaiveDate,
}

impl<'a> OwnedContacts<'a> {
    /// `today` bounds birth dates and anchors the birthday window
    pub fn new(store: &'a dyn ContactStore, owner: &Account, today: NaiveDate) -> Self {
        Self {
            store,
            owner_id: owner.id,
            today,
        }
    }

    /// Page through contacts in insertion order
    pub async fn list(&self, offset: Option<i64>, limit: Option<i64>) -> Result<Vec<Contact>> {
        let offset = offset.unwrap_or(0).max(0);
        let limit = clamp_limit(limit);
        self.store.list_contacts(self.owner_id, offset, limit).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Contact>> {
        self.store.get_contact(self.owner_id, id).await
    }

    pub async fn create(&self, request: &CreateContact) -> Result<Contact> {
        request.fields.validate_at(self.today)?;
        let contact = self.store.create_contact(self.owner_id, &request.fields).await?;
        debug!(
            owner_id = self.owner_id,
            contact_id = contact.id,
            store = self.store.name(),
            "Contact created"
        );
        Ok(contact)
    }

    /// Replace every field; `None` when the contact is missing or not owned
    pub async fn update(&self, id: i64, request: &UpdateContact) -> Result<Option<Contact>> {
        request.fields.validate_at(self.today)?;
        self.store
            .update_contact(self.owner_id, id, &request.fields)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<Option<Contact>> {
        self.store.delete_contact(self.owner_id, id).await
    }

    /// Filter contacts; blank filters are ignored
    pub async fn search(&self, search: ContactSearch) -> Result<Vec<Contact>> {
        let search = search.normalized();
        let window = search
            .upcoming_birthdays
            .then(|| BirthdayWindow::upcoming(self.today));

        self.store
            .search_contacts(self.owner_id, &search, window.as_ref())
            .await
    }
}
