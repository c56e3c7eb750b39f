//! Database repository for email verification tokens.
//!
//! Rows are never deleted; redemption only flips `is_used`, which keeps an
//! audit trail of every token ever issued.

#[cfg(test)]
use crate::database::models::VerificationToken;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

pub struct VerificationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> VerificationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Stores a freshly generated token for `user_id`.
    pub async fn create_token(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO verification_tokens (id, user_id, token, expires_at, is_used, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Retrieves a token row by its exact text, regardless of state.
    #[cfg(test)]
    pub async fn get_by_token(&self, token: &str) -> Result<Option<VerificationToken>> {
        let record = sqlx::query_as::<_, VerificationToken>(
            r#"
            SELECT id, user_id, token, expires_at, is_used, created_at
            FROM verification_tokens WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Lists every token issued to a user, oldest first.
    #[cfg(test)]
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<VerificationToken>> {
        let records = sqlx::query_as::<_, VerificationToken>(
            r#"
            SELECT id, user_id, token, expires_at, is_used, created_at
            FROM verification_tokens WHERE user_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    /// Marks a token used if it is still unused and unexpired at `now`.
    ///
    /// The check and the write are one statement, so two concurrent callers
    /// with the same token cannot both succeed.
    ///
    /// # Returns
    /// The owning user id when the token was consumed, `None` otherwise
    pub async fn consume(
        tx: &mut Transaction<'_, Sqlite>,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let user_id = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE verification_tokens
            SET is_used = 1
            WHERE token = ?
              AND is_used = 0
              AND expires_at > ?
            RETURNING user_id
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(user_id)
    }
}
