/// PostgreSQL adapter for the identity repository
use super::Repository;
use crate::error::{IdentityError, Result};
use crate::models::{Account, DriverDocuments, ResetToken, Role};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::PgPool;
use uuid::Uuid;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    full_name: String,
    phone_number: String,
    password_hash: String,
    role: Role,
    profile_picture: Option<Vec<u8>>,
    id_document: Option<Vec<u8>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = IdentityError;

    fn try_from(row: AccountRow) -> Result<Self> {
        let driver_documents = match (row.role, row.profile_picture, row.id_document) {
            (Role::Driver, Some(profile_picture), Some(id_document)) => Some(DriverDocuments {
                profile_picture,
                id_document,
            }),
            (Role::Driver, _, _) => {
                return Err(IdentityError::Internal(format!(
                    "driver account {} is missing documents",
                    row.id
                )))
            }
            (Role::Rider, _, _) => None,
        };

        Ok(Account {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            phone_number: row.phone_number,
            password_hash: row.password_hash,
            role: row.role,
            driver_documents,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

const ACCOUNT_COLUMNS: &str = "id, email, full_name, phone_number, password_hash, role, \
     profile_picture, id_document, created_at, updated_at";

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE lower(email) = lower($1)",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        let (profile_picture, id_document) = match &account.driver_documents {
            Some(docs) => (Some(&docs.profile_picture), Some(&docs.id_document)),
            None => (None, None),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO accounts (id, email, full_name, phone_number, password_hash, role,
                                  profile_picture, id_document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.full_name)
        .bind(&account.phone_number)
        .bind(&account.password_hash)
        .bind(account.role)
        .bind(profile_picture)
        .bind(id_document)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(IdentityError::EmailAlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_password_hash(
        &self,
        account_id: Uuid,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(password_hash)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_reset_token(&self, token: &ResetToken) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the account serializes concurrent requests for it
        sqlx::query("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(token.account_id)
            .fetch_optional(&mut *tx)
            .await?;

        // Invalidate existing active codes for this account
        sqlx::query(
            r#"
            UPDATE password_reset_tokens
            SET state = 'consumed', consumed_at = $2
            WHERE account_id = $1 AND state = 'active'
            "#,
        )
        .bind(token.account_id)
        .bind(token.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (code_hash, account_id, created_at, expires_at,
                                               state, consumed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&token.code_hash)
        .bind(token.account_id)
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(token.state)
        .bind(token.consumed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_reset_token_by_code(&self, code_hash: &str) -> Result<Option<ResetToken>> {
        let token = sqlx::query_as::<_, ResetToken>(
            r#"
            SELECT code_hash, account_id, created_at, expires_at, state, consumed_at
            FROM password_reset_tokens
            WHERE code_hash = $1
            "#,
        )
        .bind(code_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn try_consume_reset_token(&self, code_hash: &str, now: DateTime<Utc>) -> Result<bool> {
        // Conditional update: only one concurrent caller can match the predicate
        let result = sqlx::query(
            r#"
            UPDATE password_reset_tokens
            SET state = 'consumed', consumed_at = $2
            WHERE code_hash = $1
              AND state = 'active'
              AND expires_at > $2
            "#,
        )
        .bind(code_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_account(&self, account_id: Uuid) -> Result<bool> {
        // Reset codes go with the account via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
