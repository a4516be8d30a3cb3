/// Account creation for riders and drivers
use crate::db::Repository;
use crate::error::{IdentityError, Result};
use crate::models::{Account, DriverDocuments, RegistrationRequest};
use crate::security::CredentialHasher;
use crate::validators::{normalize_email, ValidationAggregator};
use crypto_core::Clock;
use std::sync::Arc;
use tracing::info;

const MSG_PASSWORD_MISMATCH: &str = "Passwords do not match";
const MSG_FULL_NAME_BLANK: &str = "Full name is required";
const MSG_PROFILE_PICTURE_REQUIRED: &str = "Profile picture is required";
const MSG_ID_DOCUMENT_REQUIRED: &str = "ID document is required";

#[derive(Clone)]
pub struct RegistrationService {
    repo: Arc<dyn Repository>,
    hasher: CredentialHasher,
    clock: Arc<dyn Clock>,
}

impl RegistrationService {
    pub fn new(repo: Arc<dyn Repository>, hasher: CredentialHasher, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            hasher,
            clock,
        }
    }

    pub async fn register_rider(&self, mut req: RegistrationRequest) -> Result<Account> {
        req.email = normalize_email(&req.email);
        Self::validate(&req).finish()?;

        let email = self.ensure_email_available(&req.email).await?;
        let password_hash = self.hasher.hash(&req.password)?;

        let account = Account::new_rider(
            email,
            req.full_name.trim().to_string(),
            req.phone_number,
            password_hash,
            self.clock.now(),
        );
        self.repo.insert_account(&account).await?;

        info!(user_id = %account.id, role = %account.role, "Account registered");
        Ok(account)
    }

    /// Both documents are required; a missing or empty one is a field error
    pub async fn register_driver(
        &self,
        mut req: RegistrationRequest,
        profile_picture: Option<Vec<u8>>,
        id_document: Option<Vec<u8>>,
    ) -> Result<Account> {
        req.email = normalize_email(&req.email);
        Self::validate(&req)
            .require_bytes(
                "profile_picture",
                profile_picture.as_deref(),
                MSG_PROFILE_PICTURE_REQUIRED,
            )
            .require_bytes("id_document", id_document.as_deref(), MSG_ID_DOCUMENT_REQUIRED)
            .finish()?;

        let documents = match (profile_picture, id_document) {
            (Some(profile_picture), Some(id_document)) => DriverDocuments {
                profile_picture,
                id_document,
            },
            _ => return Err(IdentityError::invalid_field("id_document", MSG_ID_DOCUMENT_REQUIRED)),
        };

        let email = self.ensure_email_available(&req.email).await?;
        let password_hash = self.hasher.hash(&req.password)?;

        let account = Account::new_driver(
            email,
            req.full_name.trim().to_string(),
            req.phone_number,
            password_hash,
            documents,
            self.clock.now(),
        );
        self.repo.insert_account(&account).await?;

        info!(user_id = %account.id, role = %account.role, "Account registered");
        Ok(account)
    }

    fn validate(req: &RegistrationRequest) -> ValidationAggregator {
        ValidationAggregator::new()
            .check(req)
            .rule(
                "full_name",
                !req.full_name.trim().is_empty(),
                MSG_FULL_NAME_BLANK,
            )
            .rule(
                "password_confirmation",
                req.password == req.password_confirmation,
                MSG_PASSWORD_MISMATCH,
            )
    }

    /// Pre-check before paying for a hash; the store still enforces uniqueness
    async fn ensure_email_available(&self, email: &str) -> Result<String> {
        if self.repo.find_account_by_email(email).await?.is_some() {
            info!(email = %email, "Registration rejected: email already registered");
            return Err(IdentityError::EmailAlreadyExists);
        }
        Ok(email.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HasherSettings;
    use crate::db::MockRepository;
    use crate::error::Status;
    use crate::models::Role;
    use crypto_core::ManualClock;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(&HasherSettings {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    fn service(repo: MockRepository) -> RegistrationService {
        RegistrationService::new(Arc::new(repo), hasher(), Arc::new(ManualClock::default()))
    }

    fn request() -> RegistrationRequest {
        RegistrationRequest {
            full_name: "Dewi Lestari".to_string(),
            email: "  Dewi@Example.com ".to_string(),
            phone_number: "+628123456789".to_string(),
            password: "correct horse".to_string(),
            password_confirmation: "correct horse".to_string(),
        }
    }

    #[tokio::test]
    async fn test_rider_email_is_normalized_and_password_hashed() {
        let mut repo = MockRepository::new();
        repo.expect_find_account_by_email()
            .withf(|email| email == "dewi@example.com")
            .times(1)
            .returning(|_| Ok(None));
        repo.expect_insert_account()
            .withf(|account| {
                account.email == "dewi@example.com"
                    && account.role == Role::Rider
                    && account.password_hash.starts_with("$argon2id$")
            })
            .times(1)
            .returning(|_| Ok(()));

        let account = service(repo).register_rider(request()).await.unwrap();
        assert_eq!(account.email, "dewi@example.com");
        assert!(account.driver_documents.is_none());
    }

    #[tokio::test]
    async fn test_driver_email_with_surrounding_whitespace_is_accepted() {
        let mut repo = MockRepository::new();
        repo.expect_find_account_by_email()
            .withf(|email| email == "dewi@example.com")
            .times(1)
            .returning(|_| Ok(None));
        repo.expect_insert_account()
            .withf(|account| account.email == "dewi@example.com" && account.role == Role::Driver)
            .times(1)
            .returning(|_| Ok(()));

        let mut req = request();
        req.email = "\tDEWI@example.COM  ".to_string();
        let account = service(repo)
            .register_driver(req, Some(vec![1, 2, 3]), Some(vec![4, 5, 6]))
            .await
            .unwrap();
        assert_eq!(account.email, "dewi@example.com");
    }

    #[tokio::test]
    async fn test_invalid_input_never_touches_repository() {
        let repo = MockRepository::new();
        let req = RegistrationRequest {
            full_name: " ".to_string(),
            email: "nope".to_string(),
            phone_number: "12".to_string(),
            password: "short".to_string(),
            password_confirmation: "other".to_string(),
        };

        let err = service(repo).register_rider(req).await.unwrap_err();
        match err {
            IdentityError::InvalidInput(errors) => {
                for field in [
                    "full_name",
                    "email",
                    "phone_number",
                    "password",
                    "password_confirmation",
                ] {
                    assert!(errors.contains(field), "missing {field}");
                }
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_driver_missing_documents_are_field_errors() {
        let repo = MockRepository::new();

        let err = service(repo)
            .register_driver(request(), Some(Vec::new()), None)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Status::BadInput);
        let outcome = err.to_outcome();
        assert!(outcome.fatal_error().is_none());
        assert!(outcome.field_errors().contains("profile_picture"));
        assert!(outcome.field_errors().contains("id_document"));
    }

    #[tokio::test]
    async fn test_insert_race_surfaces_conflict() {
        let mut repo = MockRepository::new();
        repo.expect_find_account_by_email().returning(|_| Ok(None));
        repo.expect_insert_account()
            .returning(|_| Err(IdentityError::EmailAlreadyExists));

        let err = service(repo).register_rider(request()).await.unwrap_err();
        assert_eq!(err.status(), Status::Conflict);
    }

    #[tokio::test]
    async fn test_storage_failure_is_internal() {
        let mut repo = MockRepository::new();
        repo.expect_find_account_by_email()
            .returning(|_| Err(IdentityError::Database("connection refused".into())));

        let err = service(repo).register_rider(request()).await.unwrap_err();
        let outcome = err.to_outcome();
        assert_eq!(outcome.status(), Some(Status::Internal));
        assert_eq!(outcome.fatal_error(), Some("Internal server error"));
    }
}
