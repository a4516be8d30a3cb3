use crate::validators::{FieldErrors, ValidationOutcome};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IdentityError>;

/// Transport-agnostic classification of every failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    BadInput,
    Unauthorized,
    Conflict,
    NotFound,
    Internal,
}

const MSG_INVALID_INPUT: &str = "Invalid input";
const MSG_INVALID_CREDENTIALS: &str = "Invalid email or password";
const MSG_INVALID_CURRENT_PASSWORD: &str = "Current password is incorrect";
const MSG_INVALID_TOKEN: &str = "Invalid or expired token";
const MSG_INVALID_RESET_CODE: &str = "Invalid or expired reset code";
const MSG_RESET_CODE_NOT_FOUND: &str = "Reset code not found";
const MSG_EMAIL_EXISTS: &str = "Email already registered";
const MSG_ACCOUNT_NOT_FOUND: &str = "Account not found";
const MSG_INTERNAL: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Validation failed: {0}")]
    InvalidInput(FieldErrors),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Current password is incorrect")]
    InvalidCurrentPassword,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid or expired password reset code")]
    InvalidResetCode,

    #[error("Password reset code not found")]
    ResetCodeNotFound,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Mail delivery error: {0}")]
    Mail(String),

    #[error("Password hashing error: {0}")]
    Hashing(String),

    #[error("Token signing error: {0}")]
    Signing(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Single field violation, for checks discovered outside the declarative rules
    pub fn invalid_field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::default();
        errors.insert(field, message);
        IdentityError::InvalidInput(errors)
    }

    pub fn status(&self) -> Status {
        match self {
            IdentityError::InvalidInput(_) => Status::BadInput,
            IdentityError::InvalidCredentials
            | IdentityError::InvalidCurrentPassword
            | IdentityError::InvalidToken
            | IdentityError::InvalidResetCode => Status::Unauthorized,
            IdentityError::EmailAlreadyExists => Status::Conflict,
            IdentityError::ResetCodeNotFound | IdentityError::AccountNotFound => Status::NotFound,
            IdentityError::Database(_)
            | IdentityError::Mail(_)
            | IdentityError::Hashing(_)
            | IdentityError::Signing(_)
            | IdentityError::Internal(_) => Status::Internal,
        }
    }

    /// Stable caller-facing message; never includes lower-level causes
    pub fn public_message(&self) -> &'static str {
        match self {
            IdentityError::InvalidInput(_) => MSG_INVALID_INPUT,
            IdentityError::InvalidCredentials => MSG_INVALID_CREDENTIALS,
            IdentityError::InvalidCurrentPassword => MSG_INVALID_CURRENT_PASSWORD,
            IdentityError::InvalidToken => MSG_INVALID_TOKEN,
            IdentityError::InvalidResetCode => MSG_INVALID_RESET_CODE,
            IdentityError::ResetCodeNotFound => MSG_RESET_CODE_NOT_FOUND,
            IdentityError::EmailAlreadyExists => MSG_EMAIL_EXISTS,
            IdentityError::AccountNotFound => MSG_ACCOUNT_NOT_FOUND,
            IdentityError::Database(_)
            | IdentityError::Mail(_)
            | IdentityError::Hashing(_)
            | IdentityError::Signing(_)
            | IdentityError::Internal(_) => MSG_INTERNAL,
        }
    }

    /// Convert to the outcome shape handed to the transport boundary
    pub fn to_outcome(&self) -> ValidationOutcome {
        match self {
            IdentityError::InvalidInput(errors) => ValidationOutcome::invalid(errors.clone()),
            other => ValidationOutcome::fatal(other.status(), other.public_message()),
        }
    }
}

impl From<IdentityError> for ValidationOutcome {
    fn from(err: IdentityError) -> Self {
        err.to_outcome()
    }
}

// Conversions from external error types
impl From<sqlx::Error> for IdentityError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        IdentityError::Database(err.to_string())
    }
}

impl From<validator::ValidationErrors> for IdentityError {
    fn from(err: validator::ValidationErrors) -> Self {
        IdentityError::InvalidInput(FieldErrors::from(&err))
    }
}

impl From<crypto_core::TokenError> for IdentityError {
    fn from(_: crypto_core::TokenError) -> Self {
        IdentityError::InvalidToken
    }
}

impl From<crypto_core::jwt::SigningError> for IdentityError {
    fn from(err: crypto_core::jwt::SigningError) -> Self {
        tracing::error!("JWT signing error: {}", err);
        IdentityError::Signing(err.to_string())
    }
}

impl From<lettre::address::AddressError> for IdentityError {
    fn from(err: lettre::address::AddressError) -> Self {
        IdentityError::Mail(format!("Invalid recipient address: {}", err))
    }
}

impl From<lettre::error::Error> for IdentityError {
    fn from(err: lettre::error::Error) -> Self {
        tracing::error!("Failed to build email message: {}", err);
        IdentityError::Mail(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for IdentityError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        tracing::error!("SMTP delivery failed: {}", err);
        IdentityError::Mail(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for IdentityError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {}", err);
        IdentityError::Hashing(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            IdentityError::invalid_field("email", "Email is required").status(),
            Status::BadInput
        );
        assert_eq!(IdentityError::InvalidCredentials.status(), Status::Unauthorized);
        assert_eq!(IdentityError::InvalidCurrentPassword.status(), Status::Unauthorized);
        assert_eq!(IdentityError::InvalidToken.status(), Status::Unauthorized);
        assert_eq!(IdentityError::InvalidResetCode.status(), Status::Unauthorized);
        assert_eq!(IdentityError::EmailAlreadyExists.status(), Status::Conflict);
        assert_eq!(IdentityError::ResetCodeNotFound.status(), Status::NotFound);
        assert_eq!(IdentityError::AccountNotFound.status(), Status::NotFound);
        assert_eq!(
            IdentityError::Database("connection reset".into()).status(),
            Status::Internal
        );
    }

    #[test]
    fn test_internal_causes_never_leak() {
        let errors = [
            IdentityError::Database("relation \"accounts\" does not exist".into()),
            IdentityError::Mail("smtp 550".into()),
            IdentityError::Hashing("salt".into()),
            IdentityError::Signing("key".into()),
            IdentityError::Internal("boom".into()),
        ];

        for err in errors {
            let outcome = err.to_outcome();
            assert_eq!(outcome.status(), Some(Status::Internal));
            assert_eq!(outcome.fatal_error(), Some("Internal server error"));
            assert!(outcome.field_errors().is_empty());
        }
    }

    #[test]
    fn test_field_errors_surface_verbatim() {
        let outcome = IdentityError::invalid_field("id_document", "ID document is required")
            .to_outcome();

        assert_eq!(outcome.status(), Some(Status::BadInput));
        assert_eq!(outcome.fatal_error(), None);
        assert_eq!(
            outcome.field_errors().get("id_document"),
            Some("ID document is required")
        );
    }

    #[test]
    fn test_wrong_current_password_has_its_own_message() {
        let outcome = IdentityError::InvalidCurrentPassword.to_outcome();
        assert_eq!(outcome.status(), Some(Status::Unauthorized));
        assert_eq!(outcome.fatal_error(), Some("Current password is incorrect"));
    }

    #[test]
    fn test_fatal_errors_are_never_bad_input() {
        let outcome = ValidationOutcome::from(IdentityError::EmailAlreadyExists);
        assert_eq!(outcome.status(), Some(Status::Conflict));
        assert_eq!(outcome.fatal_error(), Some("Email already registered"));
    }
}
