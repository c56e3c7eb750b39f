//! Shared application state handed to every handler and middleware.

use crate::api::throttle::RequestThrottle;
use crate::auth::password::PasswordHasher;
use crate::auth::token::TokenService;
use crate::config::Config;
use crate::errors::ServiceResult;
use crate::services::avatar_service::{AvatarStore, HttpAvatarStore};
use crate::services::email_service::{EmailService, NotificationSink};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub tokens: TokenService,
    pub hasher: PasswordHasher,
    pub notifier: Option<Arc<dyn NotificationSink>>,
    pub avatar_store: Option<Arc<dyn AvatarStore>>,
    pub throttle: Arc<RequestThrottle>,
}

impl AppState {
    /// Wires the production collaborators from configuration.
    ///
    /// Email and avatar storage are optional; when unconfigured the related
    /// features degrade instead of failing startup.
    pub fn new(pool: SqlitePool, config: Config) -> ServiceResult<Self> {
        let notifier: Option<Arc<dyn NotificationSink>> = match config.email_config() {
            Some(email_config) => match EmailService::new(email_config) {
                Ok(service) => {
                    tracing::info!("Email service initialized successfully");
                    Some(Arc::new(service))
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to initialize email service: {}. Email notifications will be disabled.",
                        e
                    );
                    None
                }
            },
            None => {
                tracing::warn!("Email configuration not found. Email notifications will be disabled.");
                None
            }
        };

        let avatar_store: Option<Arc<dyn AvatarStore>> = config
            .avatar_storage_config()
            .map(|storage| Arc::new(HttpAvatarStore::new(storage)) as Arc<dyn AvatarStore>);
        if avatar_store.is_none() {
            tracing::warn!("Avatar storage not configured. Avatar uploads will be rejected.");
        }

        Self::with_collaborators(pool, config, notifier, avatar_store)
    }

    /// Builds state around explicitly supplied collaborators.
    pub fn with_collaborators(
        pool: SqlitePool,
        config: Config,
        notifier: Option<Arc<dyn NotificationSink>>,
        avatar_store: Option<Arc<dyn AvatarStore>>,
    ) -> ServiceResult<Self> {
        let tokens = TokenService::new(&config);
        let hasher = PasswordHasher::new(config.bcrypt_cost)?;
        let throttle = Arc::new(RequestThrottle::new(config.rate_limit));

        Ok(Self {
            pool,
            config: Arc::new(config),
            tokens,
            hasher,
            notifier,
            avatar_store,
            throttle,
        })
    }
}
