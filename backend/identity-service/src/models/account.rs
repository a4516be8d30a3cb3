use crate::error::IdentityError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Principal kind, fixed at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "account_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Rider,
    Driver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Rider => "rider",
            Role::Driver => "driver",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rider" => Ok(Role::Rider),
            "driver" => Ok(Role::Driver),
            other => Err(IdentityError::Internal(format!("unknown role: {}", other))),
        }
    }
}

/// KYC payloads stored with a driver account; opaque bytes
#[derive(Clone, PartialEq, Eq)]
pub struct DriverDocuments {
    pub profile_picture: Vec<u8>,
    pub id_document: Vec<u8>,
}

impl fmt::Debug for DriverDocuments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverDocuments")
            .field("profile_picture_bytes", &self.profile_picture.len())
            .field("id_document_bytes", &self.id_document.len())
            .finish()
    }
}

/// Account - core identity entity
///
/// `driver_documents` is present exactly when `role` is `Driver`; use the
/// constructors to keep that invariant.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    /// Normalized (trimmed, lowercase) address
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub password_hash: String,
    pub role: Role,
    pub driver_documents: Option<DriverDocuments>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new_rider(
        email: String,
        full_name: String,
        phone_number: String,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            full_name,
            phone_number,
            password_hash,
            role: Role::Rider,
            driver_documents: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_driver(
        email: String,
        full_name: String,
        phone_number: String,
        password_hash: String,
        documents: DriverDocuments,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            role: Role::Driver,
            driver_documents: Some(documents),
            ..Self::new_rider(email, full_name, phone_number, password_hash, now)
        }
    }

    pub fn is_driver(&self) -> bool {
        self.role == Role::Driver
    }
}

// Never print the password hash or document contents
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .field("driver_documents", &self.driver_documents)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Rider or driver registration request
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct RegistrationRequest {
    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: String,
    #[validate(email(message = "Email address is invalid"))]
    pub email: String,
    #[validate(custom(function = "crate::validators::validate_phone_shape_validator"))]
    pub phone_number: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
    pub password_confirmation: String,
}

/// Login request
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, max = 256, message = "Password is required"))]
    pub password: String,
}

/// Password change request (subject comes from a verified access token)
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, max = 256, message = "Current password is required"))]
    pub old_password: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

/// Password reset initiation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Email address is invalid"))]
    pub email: String,
}

/// Password reset completion request
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, max = 128, message = "Reset code is required"))]
    pub code: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!("rider".parse::<Role>().unwrap(), Role::Rider);
        assert_eq!("DRIVER".parse::<Role>().unwrap(), Role::Driver);
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(Role::Driver.to_string(), "driver");
    }

    #[test]
    fn test_driver_documents_follow_role() {
        let now = Utc::now();
        let rider = Account::new_rider(
            "r@example.com".into(),
            "Rider".into(),
            "+628123456789".into(),
            "hash".into(),
            now,
        );
        assert!(rider.driver_documents.is_none());
        assert!(!rider.is_driver());

        let driver = Account::new_driver(
            "d@example.com".into(),
            "Driver".into(),
            "+628123456789".into(),
            "hash".into(),
            DriverDocuments {
                profile_picture: vec![1, 2, 3],
                id_document: vec![4, 5, 6],
            },
            now,
        );
        assert!(driver.is_driver());
        assert!(driver.driver_documents.is_some());
        assert_ne!(driver.id, rider.id);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let account = Account::new_rider(
            "r@example.com".into(),
            "Rider".into(),
            "+628123456789".into(),
            "$argon2id$v=19$secret".into(),
            Utc::now(),
        );
        let rendered = format!("{:?}", account);
        assert!(!rendered.contains("argon2id"));
        assert!(rendered.contains("r@example.com"));
    }
}
