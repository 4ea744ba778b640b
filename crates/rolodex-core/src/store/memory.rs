//! In-memory store
//!
//! Backs tests and `--memory` development runs. Ids increase monotonically,
//! so `BTreeMap` iteration order is insertion order.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{AccountStore, ContactStore};
use crate::birthday::BirthdayWindow;
use crate::models::{Account, Contact, ContactFields, ContactSearch, NewAccount};
use crate::{Result, RolodexError};

#[derive(Default)]
struct MemoryState {
    accounts: BTreeMap<i64, Account>,
    contacts: BTreeMap<i64, Contact>,
    last_account_id: i64,
    last_contact_id: i64,
}

impl MemoryState {
    fn contact_email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.contacts
            .values()
            .any(|c| Some(c.id) != except && c.fields.email.eq_ignore_ascii_case(email))
    }

    fn account_mut(&mut self, id: i64) -> Result<&mut Account> {
        self.accounts
            .get_mut(&id)
            .ok_or(RolodexError::AccountNotFound)
    }
}

/// Thread-safe in-memory account and contact store
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn search_matches(
    contact: &Contact,
    search: &ContactSearch,
    birthdays: Option<&BirthdayWindow>,
) -> bool {
    let fields = &contact.fields;

    if let Some(name) = &search.name {
        if !contains_ignore_case(&fields.name, name) {
            return false;
        }
    }
    if let Some(surname) = &search.surname {
        match &fields.last_name {
            Some(last_name) if contains_ignore_case(last_name, surname) => {}
            _ => return false,
        }
    }
    if let Some(email) = &search.email {
        if !contains_ignore_case(&fields.email, email) {
            return false;
        }
    }
    if let Some(window) = birthdays {
        if !window.contains(fields.date_of_birth) {
            return false;
        }
    }
    true
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.values().find(|a| a.has_email(email)).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&id).cloned())
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let mut state = self.state.write().await;
        if state.accounts.values().any(|a| a.has_email(&account.email)) {
            return Err(RolodexError::EmailAlreadyRegistered);
        }

        state.last_account_id += 1;
        let created = Account {
            id: state.last_account_id,
            display_name: account.display_name,
            email: account.email.trim().to_string(),
            password_hash: account.password_hash,
            confirmed: false,
            refresh_token: None,
            avatar: None,
            created_at: Utc::now(),
        };
        state.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn set_refresh_token(&self, account_id: i64, digest: Option<&str>) -> Result<()> {
        let mut state = self.state.write().await;
        state.account_mut(account_id)?.refresh_token = digest.map(str::to_string);
        Ok(())
    }

    async fn mark_confirmed(&self, account_id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        state.account_mut(account_id)?.confirmed = true;
        Ok(())
    }

    async fn set_password_hash(&self, account_id: i64, password_hash: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.account_mut(account_id)?.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn set_avatar(&self, account_id: i64, url: &str) -> Result<Account> {
        let mut state = self.state.write().await;
        let account = state.account_mut(account_id)?;
        account.avatar = Some(url.to_string());
        Ok(account.clone())
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn list_contacts(&self, owner_id: i64, offset: i64, limit: i64) -> Result<Vec<Contact>> {
        let state = self.state.read().await;
        Ok(state
            .contacts
            .values()
            .filter(|c| c.owner_id == owner_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn get_contact(&self, owner_id: i64, id: i64) -> Result<Option<Contact>> {
        let state = self.state.read().await;
        Ok(state
            .contacts
            .get(&id)
            .filter(|c| c.owner_id == owner_id)
            .cloned())
    }

    async fn create_contact(&self, owner_id: i64, fields: &ContactFields) -> Result<Contact> {
        let mut state = self.state.write().await;
        if state.contact_email_taken(&fields.email, None) {
            return Err(RolodexError::DuplicateContactEmail);
        }

        state.last_contact_id += 1;
        let contact = Contact {
            id: state.last_contact_id,
            owner_id,
            fields: fields.clone(),
            created_at: Utc::now(),
        };
        state.contacts.insert(contact.id, contact.clone());
        Ok(contact)
    }

    async fn update_contact(
        &self,
        owner_id: i64,
        id: i64,
        fields: &ContactFields,
    ) -> Result<Option<Contact>> {
        let mut state = self.state.write().await;
        if !matches!(state.contacts.get(&id), Some(c) if c.owner_id == owner_id) {
            return Ok(None);
        }
        if state.contact_email_taken(&fields.email, Some(id)) {
            return Err(RolodexError::DuplicateContactEmail);
        }

        let contact = state.contacts.get_mut(&id).map(|c| {
            c.fields = fields.clone();
            c.clone()
        });
        Ok(contact)
    }

    async fn delete_contact(&self, owner_id: i64, id: i64) -> Result<Option<Contact>> {
        let mut state = self.state.write().await;
        if !matches!(state.contacts.get(&id), Some(c) if c.owner_id == owner_id) {
            return Ok(None);
        }
        Ok(state.contacts.remove(&id))
    }

    async fn search_contacts(
        &self,
        owner_id: i64,
        search: &ContactSearch,
        birthdays: Option<&BirthdayWindow>,
    ) -> Result<Vec<Contact>> {
        let state = self.state.read().await;
        Ok(state
            .contacts
            .values()
            .filter(|c| c.owner_id == owner_id && search_matches(c, search, birthdays))
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
