//! Service wiring
//!
//! [`IdentityApp`] owns one instance of each service, all sharing the same
//! repository, hasher, token issuer and clock.

use crate::config::Settings;
use crate::db::{PgRepository, Repository, MIGRATOR};
use crate::security::CredentialHasher;
use crate::services::{
    AccountService, Mailer, PasswordResetService, RegistrationService, SessionService, SmtpMailer,
};
use anyhow::Context;
use crypto_core::{Clock, SystemClock, TokenIssuer};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct IdentityApp {
    pub registration: RegistrationService,
    pub sessions: SessionService,
    pub password_reset: PasswordResetService,
    pub accounts: AccountService,
    pub tokens: TokenIssuer,
}

impl IdentityApp {
    /// Wire services over caller-supplied collaborators
    pub fn new(
        settings: &Settings,
        repo: Arc<dyn Repository>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> crate::Result<Self> {
        let hasher = CredentialHasher::new(&settings.hasher)?;
        let tokens = TokenIssuer::new(settings.jwt.token_config(), clock.clone());

        Ok(Self {
            registration: RegistrationService::new(repo.clone(), hasher.clone(), clock.clone()),
            sessions: SessionService::new(repo.clone(), hasher.clone(), tokens.clone(), clock.clone())?,
            password_reset: PasswordResetService::new(
                repo.clone(),
                mailer,
                hasher,
                clock,
                settings.reset.clone(),
            ),
            accounts: AccountService::new(repo),
            tokens,
        })
    }

    /// Production wiring: PostgreSQL (migrated), SMTP, system clock
    pub async fn connect(settings: &Settings) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.database.max_connections)
            .acquire_timeout(Duration::from_secs(settings.database.acquire_timeout_secs))
            .connect(&settings.database.url)
            .await
            .context("Failed to connect to PostgreSQL")?;
        info!(
            "Database pool initialized with {} max connections",
            settings.database.max_connections
        );

        MIGRATOR
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations completed");

        let mailer = SmtpMailer::new(&settings.email, settings.reset.code_ttl())
            .context("Failed to initialize mailer")?;
        if mailer.is_enabled() {
            info!("Mailer initialized with SMTP");
        } else {
            info!("Mailer running in no-op mode (SMTP not configured)");
        }

        let app = Self::new(
            settings,
            Arc::new(PgRepository::new(pool)),
            Arc::new(mailer),
            Arc::new(SystemClock),
        )
        .context("Failed to initialize identity services")?;
        Ok(app)
    }
}
