use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, SessionRecord, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    EmailTaken,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Accessor for the `users` table.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Insert a new user. A duplicate email surfaces as [`StoreError::EmailTaken`].
    async fn create(&self, new_user: NewUser<'_>) -> Result<User, StoreError>;
    /// Stamp `email_verified_at` and drop the pending token.
    async fn mark_verified(&self, id: Uuid) -> Result<(), StoreError>;
    async fn set_verification_token(&self, id: Uuid, token: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, user_id: Uuid, expires_at: OffsetDateTime) -> Result<Uuid, StoreError>;
    async fn is_active(&self, session_id: Uuid) -> Result<bool, StoreError>;
    async fn revoke(&self, session_id: Uuid) -> Result<(), StoreError>;
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, email_verif_token, email_verified_at, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::EmailTaken,
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    /// Find a user by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    /// Create a new user with hashed password and pending token.
    async fn create(&self, new_user: NewUser<'_>) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, email_verif_token)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(new_user.name)
            .bind(new_user.email)
            .bind(new_user.password_hash)
            .bind(new_user.email_verif_token)
            .fetch_one(&self.db)
            .await
            .map_err(map_insert_error)?;
        Ok(user)
    }

    async fn mark_verified(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
               SET email_verified_at = now(),
                   email_verif_token = NULL
             WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn set_verification_token(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET email_verif_token = $2 WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, user_id: Uuid, expires_at: OffsetDateTime) -> Result<Uuid, StoreError> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO sessions (user_id, expires_at)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.db)
        .await?;
        Ok(id)
    }

    async fn is_active(&self, session_id: Uuid) -> Result<bool, StoreError> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT id, user_id, created_at, expires_at, revoked_at
              FROM sessions
             WHERE id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(record.is_some_and(|r| r.is_active_at(OffsetDateTime::now_utc())))
    }

    async fn revoke(&self, session_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE sessions SET revoked_at = now() WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(session_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_unique_insert_failure_stays_a_database_error() {
        assert!(matches!(
            map_insert_error(sqlx::Error::PoolTimedOut),
            StoreError::Database(sqlx::Error::PoolTimedOut)
        ));
        assert!(matches!(
            map_insert_error(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }
}
