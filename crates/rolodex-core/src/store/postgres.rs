//! PostgreSQL store
//!
//! Each trait call opens its own transaction and hands the connection to
//! the query helpers below; dropping the transaction on any early return
//! rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder, Transaction};
use std::time::Duration;
use tracing::{debug, info};

use super::{AccountStore, ContactStore};
use crate::birthday::BirthdayWindow;
use crate::config::DatabaseConfig;
use crate::models::{Account, Contact, ContactFields, ContactSearch, NewAccount};
use crate::{Result, RolodexError};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const ACCOUNT_COLUMNS: &str =
    "id, display_name, email, password_hash, confirmed, refresh_token, avatar, created_at";

const CONTACT_COLUMNS: &str = "id, owner_id, name, last_name, email, phone_number, \
     date_of_birth, additional_data, created_at";

/// PostgreSQL account and contact store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store with a bounded connection pool
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| RolodexError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        info!(
            max_connections = config.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self { pool })
    }

    /// Create tables and indexes when they are missing
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| RolodexError::DatabaseError(format!("Failed to apply schema: {e}")))?;
        debug!("Schema is up to date");
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| RolodexError::DatabaseError(format!("Failed to begin transaction: {e}")))
    }
}

async fn commit(tx: Transaction<'static, Postgres>) -> Result<()> {
    tx.commit()
        .await
        .map_err(|e| RolodexError::DatabaseError(format!("Failed to commit: {e}")))
}

fn db_error(context: &str) -> impl Fn(sqlx::Error) -> RolodexError + '_ {
    move |e| RolodexError::DatabaseError(format!("{context}: {e}"))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Wrap user input for ILIKE so `%`, `_` and `\` match literally
fn like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len() + 2);
    escaped.push('%');
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Account row from database
#[derive(Debug, FromRow)]
struct AccountRow {
    id: i64,
    display_name: String,
    email: String,
    password_hash: String,
    confirmed: bool,
    refresh_token: Option<String>,
    avatar: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            display_name: row.display_name,
            email: row.email,
            password_hash: row.password_hash,
            confirmed: row.confirmed,
            refresh_token: row.refresh_token,
            avatar: row.avatar,
            created_at: row.created_at,
        }
    }
}

/// Contact row from database
#[derive(Debug, FromRow)]
struct ContactRow {
    id: i64,
    owner_id: i64,
    name: String,
    last_name: Option<String>,
    email: String,
    phone_number: String,
    date_of_birth: NaiveDate,
    additional_data: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Contact {
            id: row.id,
            owner_id: row.owner_id,
            fields: ContactFields {
                name: row.name,
                last_name: row.last_name,
                email: row.email,
                phone_number: row.phone_number,
                date_of_birth: row.date_of_birth,
                additional_data: row.additional_data,
            },
            created_at: row.created_at,
        }
    }
}

// ============================================================================
// Query helpers: every one takes the connection explicitly
// ============================================================================

async fn select_account_by_email(conn: &mut PgConnection, email: &str) -> Result<Option<Account>> {
    let row: Option<AccountRow> = sqlx::query_as(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE lower(email) = lower($1)"
    ))
    .bind(email.trim())
    .fetch_optional(conn)
    .await
    .map_err(db_error("Failed to fetch account"))?;

    Ok(row.map(Account::from))
}

async fn select_account_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Account>> {
    let row: Option<AccountRow> = sqlx::query_as(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(db_error("Failed to fetch account"))?;

    Ok(row.map(Account::from))
}

async fn update_account_column(
    conn: &mut PgConnection,
    sql: &str,
    id: i64,
    value: Option<&str>,
) -> Result<()> {
    let result = sqlx::query(sql)
        .bind(id)
        .bind(value)
        .execute(conn)
        .await
        .map_err(db_error("Failed to update account"))?;

    if result.rows_affected() == 0 {
        return Err(RolodexError::AccountNotFound);
    }
    Ok(())
}

async fn select_contact(conn: &mut PgConnection, owner_id: i64, id: i64) -> Result<Option<Contact>> {
    let row: Option<ContactRow> = sqlx::query_as(&format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1 AND owner_id = $2"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(conn)
    .await
    .map_err(db_error("Failed to fetch contact"))?;

    Ok(row.map(Contact::from))
}

fn contact_write_error(context: &'static str) -> impl Fn(sqlx::Error) -> RolodexError {
    move |e| {
        if is_unique_violation(&e) {
            RolodexError::DuplicateContactEmail
        } else {
            RolodexError::DatabaseError(format!("{context}: {e}"))
        }
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let mut tx = self.begin().await?;
        let account = select_account_by_email(&mut tx, email).await?;
        commit(tx).await?;
        Ok(account)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let mut tx = self.begin().await?;
        let account = select_account_by_id(&mut tx, id).await?;
        commit(tx).await?;
        Ok(account)
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let mut tx = self.begin().await?;

        if select_account_by_email(&mut tx, &account.email).await?.is_some() {
            return Err(RolodexError::EmailAlreadyRegistered);
        }

        let row: AccountRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO accounts (display_name, email, password_hash, confirmed, created_at)
            VALUES ($1, $2, $3, false, NOW())
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(&account.display_name)
        .bind(account.email.trim())
        .bind(&account.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RolodexError::EmailAlreadyRegistered
            } else {
                RolodexError::DatabaseError(format!("Failed to create account: {e}"))
            }
        })?;

        commit(tx).await?;
        Ok(row.into())
    }

    async fn set_refresh_token(&self, account_id: i64, digest: Option<&str>) -> Result<()> {
        let mut tx = self.begin().await?;
        update_account_column(
            &mut tx,
            "UPDATE accounts SET refresh_token = $2 WHERE id = $1",
            account_id,
            digest,
        )
        .await?;
        commit(tx).await
    }

    async fn mark_confirmed(&self, account_id: i64) -> Result<()> {
        let mut tx = self.begin().await?;
        let result = sqlx::query("UPDATE accounts SET confirmed = true WHERE id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to confirm account"))?;

        if result.rows_affected() == 0 {
            return Err(RolodexError::AccountNotFound);
        }
        commit(tx).await
    }

    async fn set_password_hash(&self, account_id: i64, password_hash: &str) -> Result<()> {
        let mut tx = self.begin().await?;
        update_account_column(
            &mut tx,
            "UPDATE accounts SET password_hash = $2 WHERE id = $1",
            account_id,
            Some(password_hash),
        )
        .await?;
        commit(tx).await
    }

    async fn set_avatar(&self, account_id: i64, url: &str) -> Result<Account> {
        let mut tx = self.begin().await?;
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "UPDATE accounts SET avatar = $2 WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(account_id)
        .bind(url)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to update avatar"))?;

        let account = row.map(Account::from).ok_or(RolodexError::AccountNotFound)?;
        commit(tx).await?;
        Ok(account)
    }
}

#[async_trait]
impl ContactStore for PgStore {
    async fn list_contacts(&self, owner_id: i64, offset: i64, limit: i64) -> Result<Vec<Contact>> {
        let mut tx = self.begin().await?;
        let rows: Vec<ContactRow> = sqlx::query_as(&format!(
            r#"
            SELECT {CONTACT_COLUMNS}
            FROM contacts
            WHERE owner_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("Failed to list contacts"))?;

        commit(tx).await?;
        Ok(rows.into_iter().map(Contact::from).collect())
    }

    async fn get_contact(&self, owner_id: i64, id: i64) -> Result<Option<Contact>> {
        let mut tx = self.begin().await?;
        let contact = select_contact(&mut tx, owner_id, id).await?;
        commit(tx).await?;
        Ok(contact)
    }

    async fn create_contact(&self, owner_id: i64, fields: &ContactFields) -> Result<Contact> {
        let mut tx = self.begin().await?;
        let row: ContactRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO contacts (
                owner_id, name, last_name, email, phone_number,
                date_of_birth, additional_data, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(&fields.name)
        .bind(&fields.last_name)
        .bind(&fields.email)
        .bind(&fields.phone_number)
        .bind(fields.date_of_birth)
        .bind(&fields.additional_data)
        .fetch_one(&mut *tx)
        .await
        .map_err(contact_write_error("Failed to create contact"))?;

        commit(tx).await?;
        Ok(row.into())
    }

    async fn update_contact(
        &self,
        owner_id: i64,
        id: i64,
        fields: &ContactFields,
    ) -> Result<Option<Contact>> {
        let mut tx = self.begin().await?;
        let row: Option<ContactRow> = sqlx::query_as(&format!(
            r#"
            UPDATE contacts SET
                name = $3,
                last_name = $4,
                email = $5,
                phone_number = $6,
                date_of_birth = $7,
                additional_data = $8
            WHERE id = $1 AND owner_id = $2
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(&fields.name)
        .bind(&fields.last_name)
        .bind(&fields.email)
        .bind(&fields.phone_number)
        .bind(fields.date_of_birth)
        .bind(&fields.additional_data)
        .fetch_optional(&mut *tx)
        .await
        .map_err(contact_write_error("Failed to update contact"))?;

        commit(tx).await?;
        Ok(row.map(Contact::from))
    }

    async fn delete_contact(&self, owner_id: i64, id: i64) -> Result<Option<Contact>> {
        let mut tx = self.begin().await?;
        let row: Option<ContactRow> = sqlx::query_as(&format!(
            "DELETE FROM contacts WHERE id = $1 AND owner_id = $2 RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to delete contact"))?;

        commit(tx).await?;
        Ok(row.map(Contact::from))
    }

    async fn search_contacts(
        &self,
        owner_id: i64,
        search: &ContactSearch,
        birthdays: Option<&BirthdayWindow>,
    ) -> Result<Vec<Contact>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE owner_id = "
        ));
        query.push_bind(owner_id);

        if let Some(name) = &search.name {
            query.push(" AND name ILIKE ").push_bind(like_pattern(name));
        }
        if let Some(surname) = &search.surname {
            query.push(" AND last_name ILIKE ").push_bind(like_pattern(surname));
        }
        if let Some(email) = &search.email {
            query.push(" AND email ILIKE ").push_bind(like_pattern(email));
        }
        if let Some(window) = birthdays {
            query
                .push(
                    " AND (EXTRACT(MONTH FROM date_of_birth)::int * 100 \
                     + EXTRACT(DAY FROM date_of_birth)::int) = ANY(",
                )
                .push_bind(window.keys())
                .push(")");
        }
        query.push(" ORDER BY id");

        let mut tx = self.begin().await?;
        let rows: Vec<ContactRow> = query
            .build_query_as::<ContactRow>()
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error("Failed to search contacts"))?;

        commit(tx).await?;
        Ok(rows.into_iter().map(Contact::from).collect())
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("john"), "%john%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_schema_defines_both_tables() {
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS accounts"));
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS contacts"));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_round_trip_against_postgres() {
        let config = DatabaseConfig {
            url: std::env::var("DATABASE_URL").unwrap_or_else(|_| DatabaseConfig::default().url),
            ..Default::default()
        };
        let store = PgStore::connect(&config).await.unwrap();
        store.ensure_schema().await.unwrap();

        let email = format!("pg-{}@example.com", Utc::now().timestamp_nanos_opt().unwrap());
        let account = store
            .create_account(NewAccount {
                display_name: "pg test".to_string(),
                email: email.clone(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let found = store.find_by_email(&email.to_uppercase()).await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(account.id));
    }
}
