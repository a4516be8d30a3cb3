/// Input validation and error aggregation for every write path
///
/// Field rules are declared on the request types with `validator` derive
/// attributes. [`ValidationAggregator`] runs all of them, adds the rules that
/// cannot be expressed as attributes (cross-field checks, document payloads),
/// and only then reports, so a caller sees every violation at once.
use crate::error::{IdentityError, Result, Status};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use validator::{Validate, ValidationError, ValidationErrors};

// This regex is hardcoded and validated - it is a compile-time constant in practice
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?[0-9]{8,15}$").expect("hardcoded phone regex is invalid - fix source code")
});

/// Field name -> first human-readable violation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Record a violation; the first message per field wins
    pub fn insert(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, message) in other.0 {
            self.0.entry(field).or_insert(message);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "{}", fields.join(", "))
    }
}

impl From<&ValidationErrors> for FieldErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut out = FieldErrors::default();
        for (field, violations) in errors.field_errors() {
            let field = field.to_string();
            for violation in violations {
                let message = violation
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                out.insert(&field, &message);
            }
        }
        out
    }
}

/// Per-operation result shape
///
/// Exactly one holds: field errors present, fatal error present, or success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    status: Option<Status>,
    field_errors: FieldErrors,
    fatal_error: Option<String>,
}

impl ValidationOutcome {
    pub fn success() -> Self {
        Self {
            status: None,
            field_errors: FieldErrors::default(),
            fatal_error: None,
        }
    }

    pub fn invalid(field_errors: FieldErrors) -> Self {
        if field_errors.is_empty() {
            return Self::success();
        }
        Self {
            status: Some(Status::BadInput),
            field_errors,
            fatal_error: None,
        }
    }

    pub fn fatal(status: Status, message: &str) -> Self {
        debug_assert_ne!(status, Status::BadInput, "fatal errors are never BadInput");
        Self {
            status: Some(status),
            field_errors: FieldErrors::default(),
            fatal_error: Some(message.to_string()),
        }
    }

    /// Outcome of any core operation
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::success(),
            Err(err) => err.to_outcome(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_none()
    }

    pub fn status(&self) -> Option<Status> {
        self.status
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal_error.as_deref()
    }
}

/// Collects violations across declarative and ad-hoc rules without short-circuiting
#[derive(Debug, Default)]
pub struct ValidationAggregator {
    errors: FieldErrors,
}

impl ValidationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every rule declared on `input`
    pub fn check<T: Validate>(mut self, input: &T) -> Self {
        if let Err(errors) = input.validate() {
            self.errors.merge(FieldErrors::from(&errors));
        }
        self
    }

    /// Ad-hoc rule: record `message` against `field` unless `holds`
    pub fn rule(mut self, field: &str, holds: bool, message: &str) -> Self {
        if !holds {
            self.errors.insert(field, message);
        }
        self
    }

    /// Opaque binary payload that must be present and non-empty
    pub fn require_bytes(self, field: &str, bytes: Option<&[u8]>, message: &str) -> Self {
        let present = bytes.map_or(false, |b| !b.is_empty());
        self.rule(field, present, message)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(IdentityError::InvalidInput(self.errors))
        }
    }
}

/// Canonical comparison key for email addresses
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate phone number shape (optional leading +, 8-15 digits)
pub fn validate_phone_number(phone: &str) -> bool {
    PHONE_REGEX.is_match(phone)
}

/// validator crate compatible custom validator for phone number shape
pub fn validate_phone_shape_validator(phone: &str) -> std::result::Result<(), ValidationError> {
    if validate_phone_number(phone) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_phone_number");
        err.message = Some(Cow::Borrowed("Phone number must contain 8-15 digits"));
        Err(err)
    }
}
