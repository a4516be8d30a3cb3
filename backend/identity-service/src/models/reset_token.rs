use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

/// Lifecycle state of a reset code
///
/// `Active -> Consumed` is the only stored transition. Expiry is evaluated at
/// use time and never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "reset_token_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResetTokenState {
    Active,
    Consumed,
}

/// Single-use credential recovery grant
///
/// Only the SHA-256 digest of the code is kept; the raw code exists solely in
/// the delivered link.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ResetToken {
    pub code_hash: String,
    pub account_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: ResetTokenState,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl ResetToken {
    pub fn issue(account_id: Uuid, code_hash: String, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            code_hash,
            account_id,
            created_at: now,
            expires_at: now + ttl,
            state: ResetTokenState::Active,
            consumed_at: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Active and not yet expired
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.state == ResetTokenState::Active && !self.is_expired_at(now)
    }
}
