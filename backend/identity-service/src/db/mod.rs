//! Persistence for accounts and password reset codes
//!
//! Services depend on the [`Repository`] port only. [`PgRepository`] is the
//! production adapter; [`InMemoryRepository`] backs tests and local tooling.
//! Both uphold the same guarantees:
//!
//! - email uniqueness is case-insensitive and enforced atomically by the store
//! - inserting a reset code retires every other active code of that account
//! - consuming a reset code is a single compare-and-set; of two concurrent
//!   consumers of the same code exactly one observes `true`

use crate::error::Result;
use crate::models::{Account, ResetToken};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::{PgRepository, MIGRATOR};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    /// Lookup by normalized email
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Fails with `EmailAlreadyExists` when the email is taken
    async fn insert_account(&self, account: &Account) -> Result<()>;

    /// Returns `false` when the account does not exist
    async fn update_password_hash(
        &self,
        account_id: Uuid,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Store a new active code, consuming any other active code of the account
    async fn insert_reset_token(&self, token: &ResetToken) -> Result<()>;

    /// Lookup by code digest, in any state
    async fn find_reset_token_by_code(&self, code_hash: &str) -> Result<Option<ResetToken>>;

    /// Atomically move an active, unexpired code to consumed
    ///
    /// Returns `true` only for the caller that performed the transition.
    async fn try_consume_reset_token(&self, code_hash: &str, now: DateTime<Utc>) -> Result<bool>;

    /// Remove an account and its reset codes; `false` when it did not exist
    async fn delete_account(&self, account_id: Uuid) -> Result<bool>;
}
