//! Account and contact models
//!
//! These map to the `accounts` and `contacts` tables. Request payloads for
//! contacts share one base field set, [`ContactFields`], which the
//! per-operation structs flatten.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::validation;
use crate::Result;

/// Registered account
///
/// `password_hash` and `refresh_token` are never serialized; use
/// [`Account::to_public`] for anything that leaves the process.
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,

    /// Display name chosen at signup
    pub display_name: String,

    /// Login email, unique ignoring case
    pub email: String,

    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Whether the email address has been confirmed
    pub confirmed: bool,

    /// SHA-256 digest of the single outstanding refresh token
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,

    /// Avatar image URL
    pub avatar: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Convert account to public representation (without credentials)
    pub fn to_public(&self) -> AccountPublic {
        AccountPublic {
            id: self.id,
            display_name: self.display_name.clone(),
            email: self.email.clone(),
            confirmed: self.confirmed,
            avatar: self.avatar.clone(),
            created_at: self.created_at,
        }
    }

    /// Case-insensitive email comparison
    pub fn has_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("confirmed", &self.confirmed)
            .field("avatar", &self.avatar)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Public account representation (safe for API responses)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AccountPublic {
    pub id: i64,
    pub display_name: String,
    pub email: String,
    pub confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Account insert payload; the store assigns id and creation time
#[derive(Clone)]
pub struct NewAccount {
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
}

/// Fields shared by every contact payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ContactFields {
    #[validate(length(min = 1, max = 50, message = "must be 1-50 characters"))]
    pub name: String,

    #[validate(length(max = 50, message = "must be at most 50 characters"))]
    #[serde(default)]
    pub last_name: Option<String>,

    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    /// International dialing format, e.g. `+380501234567`
    #[validate(custom(function = "validation::validate_phone"))]
    pub phone_number: String,

    pub date_of_birth: NaiveDate,

    /// Free-text note
    #[serde(default)]
    pub additional_data: Option<String>,
}

impl ContactFields {
    /// Validate every field, taking `today` as the upper bound for the birth date
    ///
    /// Fails with a `ValidationError` naming the first offending field.
    pub fn validate_at(&self, today: NaiveDate) -> Result<()> {
        self.validate().map_err(validation::first_field_error)?;
        validation::validate_date_of_birth(self.date_of_birth, today)
    }
}

/// Create contact request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateContact {
    #[serde(flatten)]
    pub fields: ContactFields,
}

/// Update contact request
///
/// A full replace: every field is overwritten with the supplied value.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateContact {
    #[serde(flatten)]
    pub fields: ContactFields,
}

/// Stored contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Contact {
    pub id: i64,

    /// Owning account; never exposed over the API
    #[serde(skip)]
    pub owner_id: i64,

    #[serde(flatten)]
    pub fields: ContactFields,

    pub created_at: DateTime<Utc>,
}

/// Contact search filters
///
/// Textual filters are case-insensitive substring matches, all of which must
/// hold. Blank filters are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactSearch {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub upcoming_birthdays: bool,
}

impl ContactSearch {
    /// Drop blank filters and trim the rest
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            name: clean(self.name),
            surname: clean(self.surname),
            email: clean(self.email),
            upcoming_birthdays: self.upcoming_birthdays,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> ContactFields {
        ContactFields {
            name: "John".to_string(),
            last_name: Some("Doe".to_string()),
            email: "john@example.com".to_string(),
            phone_number: "+380501234567".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 6, 10).unwrap(),
            additional_data: None,
        }
    }

    fn sample_account() -> Account {
        Account {
            id: 1,
            display_name: "johnny".to_string(),
            email: "John@Example.com".to_string(),
            password_hash: "$argon2id$secret-hash".to_string(),
            confirmed: false,
            refresh_token: Some("digest".to_string()),
            avatar: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_account_to_public_hides_credentials() {
        let account = sample_account();
        let json = serde_json::to_string(&account.to_public()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("secret-hash"));

        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("digest"));
    }

    #[test]
    fn test_account_debug_hides_credentials() {
        let debug = format!("{:?}", sample_account());
        assert!(!debug.contains("secret-hash"));
        assert!(!debug.contains("digest"));
    }

    #[test]
    fn test_has_email_ignores_case() {
        let account = sample_account();
        assert!(account.has_email("john@example.com"));
        assert!(account.has_email(" JOHN@EXAMPLE.COM "));
        assert!(!account.has_email("jane@example.com"));
    }

    #[test]
    fn test_valid_fields() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 8).unwrap();
        assert!(sample_fields().validate_at(today).is_ok());
    }

    #[test]
    fn test_invalid_phone_names_field() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 8).unwrap();
        let mut fields = sample_fields();
        fields.phone_number = "050-123".to_string();
        match fields.validate_at(today) {
            Err(crate::RolodexError::ValidationError { field, .. }) => {
                assert_eq!(field, "phone_number")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_future_birth_date_names_field() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 8).unwrap();
        let mut fields = sample_fields();
        fields.date_of_birth = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();
        match fields.validate_at(today) {
            Err(crate::RolodexError::ValidationError { field, .. }) => {
                assert_eq!(field, "date_of_birth")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_email_names_field() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 8).unwrap();
        let mut fields = sample_fields();
        fields.email = "not-an-email".to_string();
        match fields.validate_at(today) {
            Err(crate::RolodexError::ValidationError { field, .. }) => assert_eq!(field, "email"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_contact_json_omits_owner() {
        let contact = Contact {
            id: 7,
            owner_id: 42,
            fields: sample_fields(),
            created_at: Utc::now(),
        };
        let json: serde_json::Value = serde_json::to_value(&contact).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["name"], "John");
        assert_eq!(json["date_of_birth"], "1990-06-10");
        assert!(json.get("owner_id").is_none());
    }

    #[test]
    fn test_create_contact_deserializes_flat_payload() {
        let request: CreateContact = serde_json::from_value(serde_json::json!({
            "name": "Jane",
            "email": "jane@example.com",
            "phone_number": "+15551234567",
            "date_of_birth": "1985-01-02"
        }))
        .unwrap();
        assert_eq!(request.fields.name, "Jane");
        assert_eq!(request.fields.last_name, None);
        assert_eq!(request.fields.additional_data, None);
    }

    #[test]
    fn test_search_normalized_drops_blank_filters() {
        let search = ContactSearch {
            name: Some("  ".to_string()),
            surname: Some(" Doe ".to_string()),
            email: None,
            upcoming_birthdays: true,
        }
        .normalized();
        assert_eq!(search.name, None);
        assert_eq!(search.surname.as_deref(), Some("Doe"));
        assert!(search.upcoming_birthdays);
    }
}
