/// Login, token refresh and authenticated password change
use crate::db::Repository;
use crate::error::{IdentityError, Result};
use crate::models::{ChangePasswordRequest, LoginRequest};
use crate::security::CredentialHasher;
use crate::validators::{normalize_email, ValidationAggregator};
use crypto_core::{AccessClaims, Clock, TokenIssuer, TokenPair};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const MSG_PASSWORD_UNCHANGED: &str = "New password must differ from the current password";

#[derive(Clone)]
pub struct SessionService {
    repo: Arc<dyn Repository>,
    hasher: CredentialHasher,
    tokens: TokenIssuer,
    clock: Arc<dyn Clock>,
    /// Verified against when the email is unknown so both failure paths cost one hash
    decoy_hash: Arc<str>,
}

impl SessionService {
    pub fn new(
        repo: Arc<dyn Repository>,
        hasher: CredentialHasher,
        tokens: TokenIssuer,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let decoy_hash = hasher.hash("decoy-password-for-timing")?;
        Ok(Self {
            repo,
            hasher,
            tokens,
            clock,
            decoy_hash: decoy_hash.into(),
        })
    }

    /// Unknown email and wrong password fail identically
    pub async fn login(&self, mut req: LoginRequest) -> Result<TokenPair> {
        req.email = normalize_email(&req.email);
        ValidationAggregator::new().check(&req).finish()?;

        let account = match self.repo.find_account_by_email(&req.email).await? {
            Some(account) => account,
            None => {
                let _ = self.hasher.verify(&req.password, &self.decoy_hash);
                info!("Login failed");
                return Err(IdentityError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(&req.password, &account.password_hash) {
            info!(user_id = %account.id, "Login failed");
            return Err(IdentityError::InvalidCredentials);
        }

        let tokens = self
            .tokens
            .issue_pair(account.id, &account.email, account.role.as_str())?;

        info!(user_id = %account.id, "User logged in successfully");
        Ok(tokens)
    }

    /// Decode an access token presented at the transport boundary
    pub fn authenticate(&self, access_token: &str) -> Result<AccessClaims> {
        Ok(self.tokens.verify_access(access_token)?)
    }

    /// Exchange a refresh token for a rotated token pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.tokens.verify_refresh(refresh_token)?;

        let account = self
            .repo
            .find_account_by_id(claims.subject_id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.subject_id, "Refresh token for missing account");
                IdentityError::InvalidToken
            })?;

        let tokens = self
            .tokens
            .issue_pair(account.id, &account.email, account.role.as_str())?;

        info!(user_id = %account.id, "Token pair refreshed");
        Ok(tokens)
    }

    /// `subject_id` must come from a verified access token
    pub async fn change_password(&self, subject_id: Uuid, req: ChangePasswordRequest) -> Result<()> {
        ValidationAggregator::new()
            .check(&req)
            .rule(
                "new_password",
                req.new_password != req.old_password,
                MSG_PASSWORD_UNCHANGED,
            )
            .finish()?;

        let account = self
            .repo
            .find_account_by_id(subject_id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %subject_id, "Password change for missing account");
                IdentityError::InvalidToken
            })?;

        if !self.hasher.verify(&req.old_password, &account.password_hash) {
            info!(user_id = %account.id, "Password change rejected: wrong current password");
            return Err(IdentityError::InvalidCurrentPassword);
        }

        let password_hash = self.hasher.hash(&req.new_password)?;
        let updated = self
            .repo
            .update_password_hash(account.id, &password_hash, self.clock.now())
            .await?;
        if !updated {
            return Err(IdentityError::InvalidToken);
        }

        info!(user_id = %account.id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HasherSettings;
    use crate::db::MockRepository;
    use crate::error::Status;
    use crate::models::Account;
    use crypto_core::{ManualClock, TokenConfig};

    const SECRET: &str = "session-unit-test-secret-0123456789abcdef";

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(&HasherSettings {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    fn service(repo: MockRepository) -> SessionService {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let tokens = TokenIssuer::new(TokenConfig::new(SECRET, "ridehail-identity"), clock.clone());
        SessionService::new(Arc::new(repo), hasher(), tokens, clock).unwrap()
    }

    fn account_with_password(password: &str) -> Account {
        Account::new_rider(
            "rider@example.com".into(),
            "Rider".into(),
            "+628123456789".into(),
            hasher().hash(password).unwrap(),
            chrono::Utc::now(),
        )
    }

    fn change(old: &str, new: &str) -> ChangePasswordRequest {
        ChangePasswordRequest {
            old_password: old.to_string(),
            new_password: new.to_string(),
        }
    }

    #[tokio::test]
    async fn test_wrong_old_password_is_distinct_from_login_failure() {
        let account = account_with_password("original-pass");
        let id = account.id;
        let mut repo = MockRepository::new();
        repo.expect_find_account_by_id()
            .returning(move |_| Ok(Some(account.clone())));
        repo.expect_update_password_hash().never();

        let err = service(repo)
            .change_password(id, change("not-the-pass", "brand-new-pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCurrentPassword));
        assert_eq!(err.status(), Status::Unauthorized);
        assert_eq!(err.public_message(), "Current password is incorrect");
        assert_ne!(
            err.public_message(),
            IdentityError::InvalidCredentials.public_message()
        );
    }

    #[tokio::test]
    async fn test_decoy_digest_is_ready_before_first_login() {
        let mut repo = MockRepository::new();
        repo.expect_find_account_by_email().returning(|_| Ok(None));

        let svc = service(repo);
        assert!(svc.decoy_hash.starts_with("$argon2id$"));

        let err = svc
            .login(LoginRequest {
                email: "  Ghost@Example.com ".into(),
                password: "whatever-pass".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_change_password_persists_new_hash() {
        let account = account_with_password("original-pass");
        let id = account.id;
        let mut repo = MockRepository::new();
        repo.expect_find_account_by_id()
            .returning(move |_| Ok(Some(account.clone())));
        repo.expect_update_password_hash()
            .withf(move |account_id, hash, _| {
                *account_id == id && hasher().verify("brand-new-pass", hash)
            })
            .times(1)
            .returning(|_, _, _| Ok(true));

        service(repo)
            .change_password(id, change("original-pass", "brand-new-pass"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unchanged_password_is_field_error() {
        let repo = MockRepository::new();
        let err = service(repo)
            .change_password(Uuid::new_v4(), change("same-password", "same-password"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_outcome().field_errors().get("new_password"),
            Some(MSG_PASSWORD_UNCHANGED)
        );
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let account = account_with_password("original-pass");
        let lookup = account.clone();
        let mut repo = MockRepository::new();
        repo.expect_find_account_by_email()
            .returning(move |_| Ok(Some(lookup.clone())));
        repo.expect_find_account_by_id().never();

        let svc = service(repo);
        let pair = svc
            .login(LoginRequest {
                email: "rider@example.com".into(),
                password: "original-pass".into(),
            })
            .await
            .unwrap();

        let err = svc.refresh(&pair.access_token).await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken));
        assert!(svc.authenticate(&pair.refresh_token).is_err());
        assert_eq!(svc.authenticate(&pair.access_token).unwrap().subject_id, account.id);
    }
}
