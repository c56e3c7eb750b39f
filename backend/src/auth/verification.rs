//! Single-use email verification tokens.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::database::models::User;
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::user_repository::UserRepository;
use crate::repositories::verification_repository::VerificationRepository;
use crate::utils::random_token::{TOKEN_BYTES, generate_url_safe_token};

/// Issues and redeems verification tokens.
///
/// Issuing a new token does not invalidate older unredeemed ones; each stays
/// redeemable until it is used or expires.
pub struct VerificationTokenManager<'a> {
    pool: &'a SqlitePool,
    ttl: Duration,
}

impl<'a> VerificationTokenManager<'a> {
    pub fn new(pool: &'a SqlitePool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    /// Creates and stores a fresh token for `user_id` and returns its text.
    pub async fn issue(&self, user_id: &str) -> ServiceResult<String> {
        let token = generate_url_safe_token(TOKEN_BYTES);
        let expires_at = Utc::now() + self.ttl;

        VerificationRepository::new(self.pool)
            .create_token(user_id, &token, expires_at)
            .await?;

        Ok(token)
    }

    /// Redeems a token and marks its owner verified, atomically.
    ///
    /// Wrong, used and expired tokens all yield
    /// `ServiceError::InvalidVerificationToken`.
    pub async fn redeem(&self, token: &str) -> ServiceResult<User> {
        if token.is_empty() {
            return Err(ServiceError::InvalidVerificationToken);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ServiceError::Database { source: e.into() })?;

        let Some(user_id) = VerificationRepository::consume(&mut tx, token, Utc::now()).await? else {
            return Err(ServiceError::InvalidVerificationToken);
        };

        let Some(user) = UserRepository::mark_verified(&mut tx, &user_id).await? else {
            // Dropping the transaction rolls the token back to unused.
            return Err(ServiceError::InvalidVerificationToken);
        };

        tx.commit()
            .await
            .map_err(|e| ServiceError::Database { source: e.into() })?;

        tracing::info!("User {} verified their email", user.id);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::CreateUser;
    use crate::test_support::{file_test_db, test_pool};

    async fn user(pool: &SqlitePool) -> User {
        UserRepository::new(pool)
            .create_user(CreateUser {
                username: "alice".to_string(),
                email: "alice@x.com".to_string(),
                password_hash: "hash".to_string(),
                first_name: None,
                last_name: None,
            })
            .await
            .unwrap()
    }

    fn assert_invalid(result: ServiceResult<User>) {
        assert!(matches!(result, Err(ServiceError::InvalidVerificationToken)));
    }

    #[tokio::test]
    async fn issued_token_is_stored_with_ttl() {
        let pool = test_pool().await;
        let user = user(&pool).await;
        let manager = VerificationTokenManager::new(&pool, Duration::hours(24));

        let token = manager.issue(&user.id).await.unwrap();
        assert_eq!(token.len(), 43);

        let row = VerificationRepository::new(&pool)
            .get_by_token(&token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.token, token);
        assert_eq!(row.user_id, user.id);
        assert_ne!(row.id, user.id);
        assert!(!row.is_used);
        let ttl = row.expires_at - row.created_at;
        assert!(ttl > Duration::hours(23) && ttl <= Duration::hours(24));
    }

    #[tokio::test]
    async fn redeem_marks_user_verified_once() {
        let pool = test_pool().await;
        let user = user(&pool).await;
        let manager = VerificationTokenManager::new(&pool, Duration::hours(24));
        let token = manager.issue(&user.id).await.unwrap();

        let verified = manager.redeem(&token).await.unwrap();
        assert_eq!(verified.id, user.id);
        assert!(verified.is_verified);

        let row = VerificationRepository::new(&pool)
            .get_by_token(&token)
            .await
            .unwrap()
            .unwrap();
        assert!(row.is_used);

        assert_invalid(manager.redeem(&token).await);
    }

    #[tokio::test]
    async fn expired_token_cannot_be_redeemed() {
        let pool = test_pool().await;
        let user = user(&pool).await;
        let manager = VerificationTokenManager::new(&pool, Duration::hours(-1));
        let token = manager.issue(&user.id).await.unwrap();

        assert_invalid(manager.redeem(&token).await);

        let stored = UserRepository::new(&pool)
            .get_user_by_email(&user.email)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.is_verified);
    }

    #[tokio::test]
    async fn unknown_and_empty_tokens_are_invalid() {
        let pool = test_pool().await;
        let manager = VerificationTokenManager::new(&pool, Duration::hours(24));
        assert_invalid(manager.redeem("does-not-exist").await);
        assert_invalid(manager.redeem("").await);
    }

    #[tokio::test]
    async fn earlier_tokens_stay_valid_after_reissue() {
        let pool = test_pool().await;
        let user = user(&pool).await;
        let manager = VerificationTokenManager::new(&pool, Duration::hours(24));

        let first = manager.issue(&user.id).await.unwrap();
        let second = manager.issue(&user.id).await.unwrap();
        assert_ne!(first, second);

        let tokens = VerificationRepository::new(&pool)
            .list_for_user(&user.id)
            .await
            .unwrap();
        assert_eq!(tokens.len(), 2);

        manager.redeem(&first).await.unwrap();
        manager.redeem(&second).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_redemptions_succeed_once() {
        let db = file_test_db(4).await;
        let user = user(&db.pool).await;
        let manager = VerificationTokenManager::new(&db.pool, Duration::hours(24));

        for _ in 0..5 {
            let token = manager.issue(&user.id).await.unwrap();

            let (first, second) = tokio::join!(manager.redeem(&token), manager.redeem(&token));

            let outcomes = [first, second];
            let redeemed = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
            assert_eq!(redeemed, 1);
            assert!(outcomes.iter().any(|outcome| matches!(
                outcome,
                Err(ServiceError::InvalidVerificationToken)
            )));

            let row = VerificationRepository::new(&db.pool)
                .get_by_token(&token)
                .await
                .unwrap()
                .unwrap();
            assert!(row.is_used);
        }
    }
}
