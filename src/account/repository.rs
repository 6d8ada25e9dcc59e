//! Repository layer for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use super::models::Account;
use super::store::{AccountStore, StoreError};
use super::validation::AccountId;
use crate::money::Money;

const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id          BIGSERIAL PRIMARY KEY,
    account_id  TEXT        NOT NULL UNIQUE,
    balance     BIGINT      NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#;

/// PostgreSQL account store.
///
/// Balances are stored as `BIGINT` minor units.
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `accounts` table if missing. Safe to run repeatedly.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_ACCOUNTS_TABLE)
            .execute(&self.pool)
            .await?;
        info!("accounts schema ready");
        Ok(())
    }

    fn row_to_account(row: &PgRow) -> Result<Account, StoreError> {
        let raw_id: String = row.try_get("account_id")?;
        let account_id = AccountId::new(&raw_id).map_err(|e| {
            StoreError::Database(format!("corrupt account_id '{}': {}", raw_id, e))
        })?;
        let balance: i64 = row.try_get("balance")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        Ok(Account {
            account_id,
            balance: Money::from_minor_units(balance),
            created_at,
            updated_at,
        })
    }
}

#[async_trait]
impl AccountStore for PgAccountRepository {
    async fn read(&self, account_id: &AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            r#"SELECT account_id, balance, created_at, updated_at
               FROM accounts WHERE account_id = $1"#,
        )
        .bind(account_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    async fn write_single(&self, account: &Account) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"UPDATE accounts SET balance = $2, updated_at = NOW()
               WHERE account_id = $1"#,
        )
        .bind(account.account_id.as_str())
        .bind(account.balance.minor_units())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(account.account_id.to_string()));
        }
        Ok(())
    }

    async fn write_pair(&self, first: &Account, second: &Account) -> Result<(), StoreError> {
        // Dropping `tx` without commit rolls back.
        let mut tx = self.pool.begin().await?;

        for account in [first, second] {
            let result = sqlx::query(
                r#"UPDATE accounts SET balance = $2, updated_at = NOW()
                   WHERE account_id = $1"#,
            )
            .bind(account.account_id.as_str())
            .bind(account.balance.minor_units())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() != 1 {
                tx.rollback().await?;
                return Err(StoreError::NotFound(account.account_id.to_string()));
            }
        }

        tx.commit().await?;
        debug!(
            first = %first.account_id,
            second = %second.account_id,
            "pair write committed"
        );
        Ok(())
    }

    async fn create(&self, account: &Account) -> Result<(), StoreError> {
        // The unique constraint settles concurrent creates of the same id.
        let result = sqlx::query(
            r#"INSERT INTO accounts (account_id, balance, created_at, updated_at)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (account_id) DO NOTHING"#,
        )
        .bind(account.account_id.as_str())
        .bind(account.balance.minor_units())
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(account.account_id.to_string()));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
