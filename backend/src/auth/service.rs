//! Core business logic for the authentication system.

use crate::auth::models::*;
use crate::auth::verification::VerificationTokenManager;
use crate::database::models::{CreateUser, Patch, User, UserPatch};
use crate::errors::{ServiceError, ServiceResult, is_unique_violation, validate_request};
use crate::repositories::user_repository::UserRepository;
use crate::services::avatar_service::validate_avatar;
use crate::state::AppState;
use axum::body::Bytes;

/// Registration, login and email verification workflows.
pub struct AuthService<'a> {
    state: &'a AppState,
    user_repo: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService instance
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            user_repo: UserRepository::new(&state.pool),
        }
    }

    fn verification_tokens(&self) -> VerificationTokenManager<'a> {
        VerificationTokenManager::new(&self.state.pool, self.state.config.verification_token_ttl())
    }

    /// Creates an unverified account and mails its first verification token.
    ///
    /// Mail delivery is best effort: the account exists even if sending fails.
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<User> {
        validate_request(&request)?;

        if self.user_repo.get_user_by_email(&request.email).await?.is_some() {
            return Err(ServiceError::already_exists("User", &request.email));
        }
        if self.user_repo.get_user_by_username(&request.username).await?.is_some() {
            return Err(ServiceError::already_exists("User", &request.username));
        }

        let password_hash = self.state.hasher.hash_blocking(request.password).await?;

        // The pre-checks race with concurrent registrations; the unique
        // indexes have the final say.
        let user = self
            .user_repo
            .create_user(CreateUser {
                username: request.username,
                email: request.email,
                password_hash,
                first_name: request.first_name,
                last_name: request.last_name,
            })
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::already_exists("User", "email or username")
                } else {
                    ServiceError::Database { source: e }
                }
            })?;

        tracing::info!("Registered user {}", user.id);

        match self.verification_tokens().issue(&user.id).await {
            Ok(token) => self.try_send_verification_email(&user.email, &token).await,
            Err(e) => tracing::error!("Failed to issue verification token for {}: {}", user.id, e),
        }

        Ok(user)
    }

    /// Exchanges email and password for a bearer token.
    ///
    /// An unknown email, a wrong password and a deactivated account all fail
    /// with the same error after the same amount of hashing work.
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<TokenResponse> {
        validate_request(&request)?;

        let user = self.user_repo.get_user_by_email(&request.email).await?;
        let digest = user.as_ref().map(|user| user.password_hash.clone());

        let password_ok = self
            .state
            .hasher
            .verify_blocking(request.password, digest)
            .await;

        let user = match user {
            Some(user) if password_ok && user.is_active => user,
            _ => {
                tracing::debug!("Rejected login attempt");
                return Err(ServiceError::invalid_credential());
            }
        };

        let access_token = self.state.tokens.issue_default(&user.email)?;
        let expires_in = self.state.tokens.default_ttl().num_seconds();

        tracing::info!("User {} logged in", user.id);
        Ok(TokenResponse::bearer(access_token, expires_in))
    }

    /// Redeems a verification token.
    pub async fn verify_email(&self, token: &str) -> ServiceResult<User> {
        self.verification_tokens().redeem(token).await
    }

    /// Issues a fresh verification token for an unverified account and mails it.
    ///
    /// Unlike registration, a delivery failure is reported to the caller.
    pub async fn resend_verification(&self, request: EmailRequest) -> ServiceResult<()> {
        validate_request(&request)?;

        let user = self
            .user_repo
            .get_user_by_email(&request.email)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", &request.email))?;

        if user.is_verified {
            return Err(ServiceError::AlreadyVerified);
        }

        let notifier = self
            .state
            .notifier
            .as_ref()
            .ok_or_else(|| ServiceError::unavailable("Email service is not configured"))?;

        let token = self.verification_tokens().issue(&user.id).await?;
        notifier.send_verification_email(&user.email, &token).await?;

        tracing::info!("Verification email resent to user {}", user.id);
        Ok(())
    }

    /// Applies a partial profile update to the caller's own record.
    pub async fn update_profile(&self, user: User, request: UpdateProfileRequest) -> ServiceResult<User> {
        let patch = request.into_patch()?;
        self.apply_patch(user, patch).await
    }

    /// Stores a new avatar image and points the profile at it.
    pub async fn upload_avatar(
        &self,
        user: User,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> ServiceResult<User> {
        let content_type = validate_avatar(content_type, bytes.len())?;

        let store = self
            .state
            .avatar_store
            .as_ref()
            .ok_or_else(|| ServiceError::unavailable("Avatar storage is not configured"))?;

        let avatar_url = store.upload(&user.id, content_type, bytes).await?;

        let patch = UserPatch {
            avatar_url: Patch::Set(avatar_url),
            ..UserPatch::default()
        };
        self.apply_patch(user, patch).await
    }

    /// Writes only the fields present in `patch`; the rest of `user` may be stale.
    async fn apply_patch(&self, user: User, patch: UserPatch) -> ServiceResult<User> {
        if patch.is_empty() {
            return Ok(user);
        }

        self.user_repo
            .apply_profile_patch(&user.id, &patch)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", &user.id))
    }

    async fn try_send_verification_email(&self, recipient: &str, token: &str) {
        let Some(notifier) = &self.state.notifier else {
            tracing::warn!("Email service not configured; verification email not sent");
            return;
        };

        match notifier.send_verification_email(recipient, token).await {
            Ok(()) => tracing::info!("Verification email sent"),
            Err(e) => tracing::warn!("Failed to send verification email: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingNotifier, test_config, test_context, test_context_with};

    fn alice() -> RegisterRequest {
        RegisterRequest {
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            password: "secret123".to_string(),
            first_name: Some("Alice".to_string()),
            last_name: None,
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_creates_unverified_user_and_mails_token() {
        let ctx = test_context().await;
        let service = AuthService::new(&ctx.state);

        let user = service.register(alice()).await.unwrap();
        assert!(!user.is_verified);
        assert!(user.is_active);
        assert_ne!(user.password_hash, "secret123");

        let token = ctx.notifier.last_token_for("alice@x.com").unwrap();
        assert_eq!(token.len(), 43);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_without_second_row() {
        let ctx = test_context().await;
        let service = AuthService::new(&ctx.state);
        service.register(alice()).await.unwrap();

        let mut same_email = alice();
        same_email.username = "alice2".to_string();
        assert!(matches!(
            service.register(same_email).await,
            Err(ServiceError::AlreadyExists { .. })
        ));

        let mut same_username = alice();
        same_username.email = "other@x.com".to_string();
        assert!(matches!(
            service.register(same_username).await,
            Err(ServiceError::AlreadyExists { .. })
        ));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&ctx.state.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn register_rejects_invalid_input_before_storage() {
        let ctx = test_context().await;
        let service = AuthService::new(&ctx.state);

        let mut request = alice();
        request.password = "short".to_string();
        assert!(matches!(
            service.register(request).await,
            Err(ServiceError::Validation { .. })
        ));
        assert!(ctx.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn register_survives_mail_failure() {
        let ctx = test_context_with(test_config(), RecordingNotifier::failing()).await;
        let service = AuthService::new(&ctx.state);

        let user = service.register(alice()).await.unwrap();
        assert!(
            UserRepository::new(&ctx.state.pool)
                .get_user_by_email(&user.email)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn login_failures_are_uniform() {
        let ctx = test_context().await;
        let service = AuthService::new(&ctx.state);
        service.register(alice()).await.unwrap();

        let wrong_password = service.login(login("alice@x.com", "wrong-pass")).await.unwrap_err();
        let unknown_email = service.login(login("bob@x.com", "secret123")).await.unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, ServiceError::Unauthenticated(_)));
        assert!(matches!(unknown_email, ServiceError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn login_issues_token_for_email_subject() {
        let ctx = test_context().await;
        let service = AuthService::new(&ctx.state);
        service.register(alice()).await.unwrap();

        let response = service.login(login("alice@x.com", "secret123")).await.unwrap();
        assert_eq!(response.token_type, "bearer");
        assert_eq!(response.expires_in, 30 * 60);
        assert_eq!(
            ctx.state.tokens.verify(&response.access_token).unwrap(),
            "alice@x.com"
        );
    }

    #[tokio::test]
    async fn verify_email_flips_flag_once() {
        let ctx = test_context().await;
        let service = AuthService::new(&ctx.state);
        service.register(alice()).await.unwrap();
        let token = ctx.notifier.last_token_for("alice@x.com").unwrap();

        let user = service.verify_email(&token).await.unwrap();
        assert!(user.is_verified);
        assert!(matches!(
            service.verify_email(&token).await,
            Err(ServiceError::InvalidVerificationToken)
        ));
    }

    #[tokio::test]
    async fn resend_outcomes() {
        let ctx = test_context().await;
        let service = AuthService::new(&ctx.state);
        let email = |email: &str| EmailRequest {
            email: email.to_string(),
        };

        assert!(matches!(
            service.resend_verification(email("nobody@x.com")).await,
            Err(ServiceError::NotFound { .. })
        ));

        service.register(alice()).await.unwrap();
        let first = ctx.notifier.last_token_for("alice@x.com").unwrap();
        service.resend_verification(email("alice@x.com")).await.unwrap();
        let second = ctx.notifier.last_token_for("alice@x.com").unwrap();
        assert_ne!(first, second);

        service.verify_email(&second).await.unwrap();
        assert!(matches!(
            service.resend_verification(email("alice@x.com")).await,
            Err(ServiceError::AlreadyVerified)
        ));
    }

    #[tokio::test]
    async fn resend_reports_mail_failure() {
        let ctx = test_context_with(test_config(), RecordingNotifier::failing()).await;
        let service = AuthService::new(&ctx.state);
        service.register(alice()).await.unwrap();

        let result = service
            .resend_verification(EmailRequest {
                email: "alice@x.com".to_string(),
            })
            .await;
        assert!(matches!(result, Err(ServiceError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn profile_update_touches_only_present_fields() {
        let ctx = test_context().await;
        let service = AuthService::new(&ctx.state);
        let user = service.register(alice()).await.unwrap();

        let request: UpdateProfileRequest =
            serde_json::from_value(serde_json::json!({ "last_name": "Liddell" })).unwrap();
        let user = service.update_profile(user, request).await.unwrap();
        assert_eq!(user.first_name.as_deref(), Some("Alice"));
        assert_eq!(user.last_name.as_deref(), Some("Liddell"));

        let request: UpdateProfileRequest =
            serde_json::from_value(serde_json::json!({ "first_name": null })).unwrap();
        let user = service.update_profile(user, request).await.unwrap();
        assert_eq!(user.first_name, None);
        assert_eq!(user.last_name.as_deref(), Some("Liddell"));
    }

    #[tokio::test]
    async fn updates_from_stale_copies_keep_each_others_fields() {
        let ctx = test_context().await;
        let service = AuthService::new(&ctx.state);
        let mut registration = alice();
        registration.first_name = None;
        let user = service.register(registration).await.unwrap();

        let first_copy = user.clone();
        let second_copy = user;

        let request: UpdateProfileRequest =
            serde_json::from_value(serde_json::json!({ "last_name": "Liddell" })).unwrap();
        service.update_profile(first_copy, request).await.unwrap();

        let request: UpdateProfileRequest =
            serde_json::from_value(serde_json::json!({ "first_name": "Alice" })).unwrap();
        let user = service.update_profile(second_copy, request).await.unwrap();

        assert_eq!(user.first_name.as_deref(), Some("Alice"));
        assert_eq!(user.last_name.as_deref(), Some("Liddell"));
    }

    #[tokio::test]
    async fn avatar_upload_keeps_concurrent_name_change() {
        let ctx = test_context().await;
        let service = AuthService::new(&ctx.state);
        let user = service.register(alice()).await.unwrap();
        let stale = user.clone();

        let request: UpdateProfileRequest =
            serde_json::from_value(serde_json::json!({ "last_name": "Liddell" })).unwrap();
        service.update_profile(user, request).await.unwrap();

        let user = service
            .upload_avatar(stale, Some("image/png"), Bytes::from_static(b"\x89PNG"))
            .await
            .unwrap();
        assert_eq!(user.last_name.as_deref(), Some("Liddell"));
        assert!(user.avatar_url.is_some());
    }

    #[tokio::test]
    async fn avatar_upload_sets_url() {
        let ctx = test_context().await;
        let service = AuthService::new(&ctx.state);
        let user = service.register(alice()).await.unwrap();
        let user_id = user.id.clone();

        let rejected = service
            .upload_avatar(user.clone(), Some("text/plain"), Bytes::from_static(b"hi"))
            .await;
        assert!(matches!(rejected, Err(ServiceError::Validation { .. })));

        let user = service
            .upload_avatar(user, Some("image/png"), Bytes::from_static(b"\x89PNG"))
            .await
            .unwrap();
        assert_eq!(
            user.avatar_url,
            Some(format!("https://cdn.test/avatars/user_{user_id}"))
        );
        assert_eq!(ctx.avatars.uploads().len(), 1);
    }
}
