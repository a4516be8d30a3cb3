/// Self-service password reset: request -> deliver -> consume
///
/// Codes are single use. `consume` retires the code before the new password
/// is hashed and stored, so a failure after that point leaves the code spent
/// and the old password in place.
use super::email::Mailer;
use crate::config::ResetSettings;
use crate::db::Repository;
use crate::error::{IdentityError, Result};
use crate::models::{ForgotPasswordRequest, ResetPasswordRequest, ResetToken};
use crate::security::{digest_code, generate_code, CredentialHasher};
use crate::validators::{normalize_email, ValidationAggregator};
use crypto_core::Clock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Returned for every accepted request, whether or not the account exists
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for this email, a password reset link has been sent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetRequested {
    pub message: &'static str,
}

impl Default for ResetRequested {
    fn default() -> Self {
        Self {
            message: RESET_REQUESTED_MESSAGE,
        }
    }
}

#[derive(Clone)]
pub struct PasswordResetService {
    repo: Arc<dyn Repository>,
    mailer: Arc<dyn Mailer>,
    hasher: CredentialHasher,
    clock: Arc<dyn Clock>,
    settings: ResetSettings,
}

impl PasswordResetService {
    pub fn new(
        repo: Arc<dyn Repository>,
        mailer: Arc<dyn Mailer>,
        hasher: CredentialHasher,
        clock: Arc<dyn Clock>,
        settings: ResetSettings,
    ) -> Self {
        Self {
            repo,
            mailer,
            hasher,
            clock,
            settings,
        }
    }

    /// Issue a code and mail the link; never reveals whether the account exists
    pub async fn request(&self, mut req: ForgotPasswordRequest) -> Result<ResetRequested> {
        req.email = normalize_email(&req.email);
        ValidationAggregator::new().check(&req).finish()?;

        let Some(account) = self.repo.find_account_by_email(&req.email).await? else {
            info!("Password reset requested for unknown email");
            return Ok(ResetRequested::default());
        };

        let code = generate_code();
        let token = ResetToken::issue(
            account.id,
            digest_code(&code),
            self.clock.now(),
            self.settings.code_ttl(),
        );
        self.repo.insert_reset_token(&token).await?;

        if let Err(e) = self
            .mailer
            .send_reset_link(&account.email, &self.reset_link(&code))
            .await
        {
            error!(user_id = %account.id, error = %e, "Failed to send password reset email");
            return Err(e);
        }

        info!(
            user_id = %account.id,
            expires_at = %token.expires_at,
            "Password reset email sent"
        );
        Ok(ResetRequested::default())
    }

    /// Spend a code and set the new password
    pub async fn consume(&self, req: ResetPasswordRequest) -> Result<()> {
        ValidationAggregator::new().check(&req).finish()?;

        let code_hash = digest_code(req.code.trim());
        let now = self.clock.now();

        let token = self
            .repo
            .find_reset_token_by_code(&code_hash)
            .await?
            .ok_or(IdentityError::ResetCodeNotFound)?;

        if !token.is_usable_at(now) {
            info!(user_id = %token.account_id, "Rejected consumed or expired reset code");
            return Err(IdentityError::InvalidResetCode);
        }

        if !self.repo.try_consume_reset_token(&code_hash, now).await? {
            warn!(user_id = %token.account_id, "Reset code consumed concurrently");
            return Err(IdentityError::InvalidResetCode);
        }

        let password_hash = self.hasher.hash(&req.new_password)?;
        let updated = self
            .repo
            .update_password_hash(token.account_id, &password_hash, now)
            .await?;
        if !updated {
            warn!(user_id = %token.account_id, "Reset code owner no longer exists");
            return Err(IdentityError::AccountNotFound);
        }

        info!(user_id = %token.account_id, "Password reset successfully");
        Ok(())
    }

    fn reset_link(&self, code: &str) -> String {
        format!("{}/{}", self.settings.link_base_url.trim_end_matches('/'), code)
    }
}
