/// In-process adapter for the identity repository
///
/// Keeps the same atomicity guarantees as the PostgreSQL adapter by doing
/// every check-then-write under a single DashMap entry lock. Locks on two
/// maps are only ever nested in the order `emails -> accounts` and
/// `active_codes -> reset_tokens`.
use super::Repository;
use crate::error::{IdentityError, Result};
use crate::models::{Account, ResetToken, ResetTokenState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryRepository {
    accounts: Arc<DashMap<Uuid, Account>>,
    /// lowercase email -> account id
    emails: Arc<DashMap<String, Uuid>>,
    /// code digest -> reset token
    reset_tokens: Arc<DashMap<String, ResetToken>>,
    /// account id -> digest of its single active code
    active_codes: Arc<DashMap<Uuid, String>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Every stored reset token of an account, in any state
    pub fn reset_tokens_for(&self, account_id: Uuid) -> Vec<ResetToken> {
        self.reset_tokens
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let id = match self.emails.get(&email.to_lowercase()) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.accounts.get(&id).map(|account| account.clone()))
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.accounts.get(&id).map(|account| account.clone()))
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        match self.emails.entry(account.email.to_lowercase()) {
            Entry::Occupied(_) => Err(IdentityError::EmailAlreadyExists),
            Entry::Vacant(slot) => {
                self.accounts.insert(account.id, account.clone());
                slot.insert(account.id);
                Ok(())
            }
        }
    }

    async fn update_password_hash(
        &self,
        account_id: Uuid,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        match self.accounts.get_mut(&account_id) {
            Some(mut account) => {
                account.password_hash = password_hash.to_string();
                account.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_reset_token(&self, token: &ResetToken) -> Result<()> {
        // The account's slot stays locked while the old code is retired and
        // the new one stored, so concurrent requests serialize here
        let mut slot = self
            .active_codes
            .entry(token.account_id)
            .or_insert_with(String::new);

        if let Some(mut previous) = self.reset_tokens.get_mut(slot.as_str()) {
            if previous.state == ResetTokenState::Active {
                previous.state = ResetTokenState::Consumed;
                previous.consumed_at = Some(token.created_at);
            }
        }

        self.reset_tokens
            .insert(token.code_hash.clone(), token.clone());
        *slot = token.code_hash.clone();
        Ok(())
    }

    async fn find_reset_token_by_code(&self, code_hash: &str) -> Result<Option<ResetToken>> {
        Ok(self.reset_tokens.get(code_hash).map(|token| token.clone()))
    }

    async fn try_consume_reset_token(&self, code_hash: &str, now: DateTime<Utc>) -> Result<bool> {
        // The entry stays write-locked between the check and the transition
        match self.reset_tokens.get_mut(code_hash) {
            Some(mut token) if token.is_usable_at(now) => {
                token.state = ResetTokenState::Consumed;
                token.consumed_at = Some(now);
                let account_id = token.account_id;
                drop(token);
                self.active_codes
                    .remove_if(&account_id, |_, active| active == code_hash);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_account(&self, account_id: Uuid) -> Result<bool> {
        let Some((_, account)) = self.accounts.remove(&account_id) else {
            return Ok(false);
        };
        self.emails.remove(&account.email.to_lowercase());
        self.active_codes.remove(&account_id);
        self.reset_tokens
            .retain(|_, token| token.account_id != account_id);
        Ok(true)
    }
}
