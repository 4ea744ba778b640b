//! Field validation helpers
//!
//! Derive-based checks live on the models via `validator`; this module holds
//! the custom rules and the conversion into [`RolodexError::ValidationError`].

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use validator::{ValidationError, ValidationErrors};

use crate::{Result, RolodexError};

lazy_static! {
    /// E.164-style number: optional `+`, no leading zero, 2 to 15 digits
    static ref PHONE_PATTERN: Regex = Regex::new(r"^\+?[1-9]\d{1,14}$").unwrap();
}

/// Check a phone number against the international dialing pattern
pub fn validate_phone(phone: &str) -> std::result::Result<(), ValidationError> {
    if PHONE_PATTERN.is_match(phone) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone_number");
        err.message = Some("must match the international dialing format".into());
        Err(err)
    }
}

/// A birth date may be today but not later
pub fn validate_date_of_birth(date_of_birth: NaiveDate, today: NaiveDate) -> Result<()> {
    if date_of_birth > today {
        return Err(RolodexError::validation(
            "date_of_birth",
            "cannot be in the future",
        ));
    }
    Ok(())
}

/// Collapse `validator` output into a single error naming one field
///
/// Fields are reported in name order so the same payload always yields the
/// same error.
pub fn first_field_error(errors: ValidationErrors) -> RolodexError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    match fields.into_iter().next() {
        Some((field, errs)) => {
            let message = errs
                .iter()
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .or_else(|| errs.first().map(|e| e.code.to_string()))
                .unwrap_or_else(|| "invalid value".to_string());
            RolodexError::validation(field.to_string(), message)
        }
        None => RolodexError::validation("body", "invalid request"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_phone_pattern() {
        assert!(validate_phone("+380501234567").is_ok());
        assert!(validate_phone("15551234567").is_ok());
        assert!(validate_phone("12").is_ok());

        assert!(validate_phone("").is_err());
        assert!(validate_phone("+").is_err());
        assert!(validate_phone("0501234567").is_err());
        assert!(validate_phone("+1 555 123").is_err());
        assert!(validate_phone("+1234567890123456").is_err());
        assert!(validate_phone("phone").is_err());
    }

    #[test]
    fn test_date_of_birth_today_is_allowed() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert!(validate_date_of_birth(today, today).is_ok());
        assert!(validate_date_of_birth(today.pred_opt().unwrap(), today).is_ok());
        assert!(validate_date_of_birth(today.succ_opt().unwrap(), today).is_err());
    }

    proptest! {
        #[test]
        fn prop_digit_strings_without_leading_zero_are_valid(
            first in 1u8..=9,
            rest in proptest::collection::vec(0u8..=9, 1..=14),
            plus in any::<bool>(),
        ) {
            let mut phone = String::new();
            if plus {
                phone.push('+');
            }
            phone.push(char::from(b'0' + first));
            for d in rest {
                phone.push(char::from(b'0' + d));
            }
            prop_assert!(validate_phone(&phone).is_ok());
        }

        #[test]
        fn prop_strings_with_letters_are_invalid(s in "[0-9]{0,6}[a-zA-Z][0-9]{0,6}") {
            prop_assert!(validate_phone(&s).is_err());
        }
    }
}
