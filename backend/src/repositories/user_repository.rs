//! Database repository for user management operations.
//!
//! Provides lookup, creation and profile updates for user records. Lookups are
//! exact and case-sensitive.

use crate::database::models::{CreateUser, User, UserPatch};
use anyhow::Result;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

const USER_COLUMNS: &str = r#"
    id, username, email, password_hash, first_name, last_name, avatar_url,
    is_active, is_verified, created_at, updated_at
"#;

/// Repository for user database operations.
pub struct UserRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Creates a new UserRepository instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a new user in the database.
    ///
    /// The unique indexes on `email` and `username` reject concurrent
    /// duplicates that slipped past the service-level existence checks.
    ///
    /// # Arguments
    /// * `user` - CreateUser DTO containing user details
    ///
    /// # Returns
    /// The newly created User with all fields populated
    pub async fn create_user(&self, user: CreateUser) -> Result<User> {
        let now = Utc::now();
        let query = format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, first_name, last_name,
                               is_active, is_verified, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 1, 0, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(Uuid::now_v7().to_string())
            .bind(user.username)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.first_name)
            .bind(user.last_name)
            .bind(now)
            .bind(now)
            .fetch_one(self.pool)
            .await?;

        Ok(user)
    }

    /// Retrieves a user by their username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Retrieves a user by their email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Applies a profile patch in one statement.
    ///
    /// Each column is written only when its field is present in the patch, so
    /// concurrent updates of different fields do not overwrite each other.
    ///
    /// # Returns
    /// The stored record, or `None` if the user disappeared meanwhile
    pub async fn apply_profile_patch(&self, user_id: &str, patch: &UserPatch) -> Result<Option<User>> {
        let query = format!(
            r#"
            UPDATE users
            SET first_name = CASE WHEN ? THEN ? ELSE first_name END,
                last_name = CASE WHEN ? THEN ? ELSE last_name END,
                avatar_url = CASE WHEN ? THEN ? ELSE avatar_url END,
                updated_at = ?
            WHERE id = ?
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(!patch.first_name.is_unchanged())
            .bind(patch.first_name.as_set())
            .bind(!patch.last_name.is_unchanged())
            .bind(patch.last_name.as_set())
            .bind(!patch.avatar_url.is_unchanged())
            .bind(patch.avatar_url.as_set())
            .bind(Utc::now())
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Flags a user as verified inside the caller's transaction.
    pub async fn mark_verified(tx: &mut Transaction<'_, Sqlite>, user_id: &str) -> Result<Option<User>> {
        let query = format!(
            r#"
            UPDATE users
            SET is_verified = 1, updated_at = ?
            WHERE id = ?
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(Utc::now())
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(user)
    }
}
