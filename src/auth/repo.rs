use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::User;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Persistence of user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Inserts an inactive user; a taken email is `StoreError::DuplicateEmail`.
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;
    /// Sets `is_active`. Returns `None` when no user has that email.
    async fn activate(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn set_avatar_url(&self, id: Uuid, url: &str) -> anyhow::Result<Option<User>>;
}

const USER_COLUMNS: &str = "id, email, password_hash, is_active, avatar_url, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let res = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, is_active) \
             VALUES ($1, $2, FALSE) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateEmail)
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert user").into()),
        }
    }

    async fn activate(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = TRUE WHERE email = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("activate user")?;
        Ok(user)
    }

    async fn set_avatar_url(&self, id: Uuid, url: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET avatar_url = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(&self.db)
        .await
        .context("set avatar url")?;
        Ok(user)
    }
}
