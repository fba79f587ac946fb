use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::accounts::account::{Account, AccountPatch, NewAccount};

/// Persistence seam for account records. Handlers only ever see this
/// trait; the concrete store is picked at startup.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account and return it with id and timestamps assigned.
    async fn create(&self, account: NewAccount) -> anyhow::Result<Account>;

    /// Find an account by (normalized) email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>>;

    /// Find an account by id.
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>>;

    /// Apply a partial update. Returns `None` if the id is unknown.
    async fn update(&self, id: Uuid, patch: AccountPatch) -> anyhow::Result<Option<Account>>;

    /// Remove an account permanently. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;

    /// Release underlying connections. Default is a no-op.
    async fn close(&self) {}
}

/// PostgreSQL-backed store.
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Connect to the database and bring the schema up to date.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            warn!(error = %e, "migration failed; continuing with existing schema");
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create(&self, account: NewAccount) -> anyhow::Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn update(&self, id: Uuid, patch: AccountPatch) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                updated_at = now()
            WHERE id = $1
            RETURNING id, username, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.username)
        .bind(patch.email)
        .bind(patch.password_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// In-memory store; backs the test suite and database-less demo runs.
/// Data does not survive a restart.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Account>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create(&self, account: NewAccount) -> anyhow::Result<Account> {
        let mut accounts = self.lock();
        if accounts.values().any(|a| a.email == account.email) {
            // Mirrors the unique index the Postgres store relies on.
            anyhow::bail!("email already registered: {}", account.email);
        }
        let now = OffsetDateTime::now_utc();
        let account = Account {
            id: Uuid::new_v4(),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        Ok(self.lock().values().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn update(&self, id: Uuid, patch: AccountPatch) -> anyhow::Result<Option<Account>> {
        let mut accounts = self.lock();
        if let Some(email) = &patch.email {
            if accounts.values().any(|a| a.id != id && &a.email == email) {
                anyhow::bail!("email already registered: {email}");
            }
        }
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = patch.username {
            account.username = username;
        }
        if let Some(email) = patch.email {
            account.email = email;
        }
        if let Some(password_hash) = patch.password_hash {
            account.password_hash = password_hash;
        }
        account.updated_at = OffsetDateTime::now_utc();
        Ok(Some(account.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.lock().remove(&id).is_some())
    }
}
