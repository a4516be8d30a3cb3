/// Administrative account lookup and removal
use crate::db::Repository;
use crate::error::{IdentityError, Result};
use crate::models::Account;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn Repository>,
}

impl AccountService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn get_account(&self, account_id: Uuid) -> Result<Account> {
        self.repo
            .find_account_by_id(account_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)
    }

    /// Removes the account together with its reset codes
    pub async fn delete_account(&self, account_id: Uuid) -> Result<()> {
        if !self.repo.delete_account(account_id).await? {
            return Err(IdentityError::AccountNotFound);
        }
        info!(user_id = %account_id, "Account deleted");
        Ok(())
    }
}
