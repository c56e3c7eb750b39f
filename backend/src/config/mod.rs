//! Central module for application-wide configuration settings.
//!
//! Configuration is read from the environment exactly once at startup and then
//! shared as an immutable value. Nothing below `main` touches `std::env`.

use anyhow::{Context, Result};
use chrono::Duration;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub verification_token_expire_hours: i64,
    pub bcrypt_cost: u32,
    pub server_host: String,
    pub server_port: u16,
    pub allowed_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
    pub email: Option<EmailConfig>,
    pub avatar_storage: Option<AvatarStorageConfig>,
}

/// SMTP settings for outbound verification mail.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
    /// Public origin used to build links sent by email.
    pub base_url: String,
    /// Lifetime of a verification link, quoted in the message body.
    pub verification_ttl_hours: i64,
}

/// Remote blob storage used for user avatars.
#[derive(Debug, Clone)]
pub struct AvatarStorageConfig {
    pub upload_url: String,
    pub api_key: String,
    pub public_url: String,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_seconds: 60,
        }
    }
}

/// One year, in the unit of each setting.
const MAX_ACCESS_TOKEN_MINUTES: i64 = 60 * 24 * 365;
const MAX_VERIFICATION_TOKEN_HOURS: i64 = 24 * 365;

/// Parses a token lifetime, which must be positive and at most `max`.
fn parse_lifetime(name: &str, value: &str, max: i64) -> Result<i64> {
    let parsed = value
        .trim()
        .parse::<i64>()
        .with_context(|| format!("{name} must be a valid number"))?;
    if !(1..=max).contains(&parsed) {
        anyhow::bail!("{name} must be between 1 and {max}, got {parsed}");
    }
    Ok(parsed)
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://contacts.db?mode=rwc".to_string());

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid number")?;

        let acquire_timeout_seconds = env::var("DB_ACQUIRE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u64>()
            .context("DB_ACQUIRE_TIMEOUT_SECONDS must be a valid number")?;

        let jwt_secret = env::var("SECRET_KEY").context("SECRET_KEY not set")?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("SECRET_KEY must not be empty");
        }

        let access_token_expire_minutes = parse_lifetime(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            &env::var("ACCESS_TOKEN_EXPIRE_MINUTES").unwrap_or_else(|_| "30".to_string()),
            MAX_ACCESS_TOKEN_MINUTES,
        )?;

        let verification_token_expire_hours = parse_lifetime(
            "VERIFICATION_TOKEN_EXPIRE_HOURS",
            &env::var("VERIFICATION_TOKEN_EXPIRE_HOURS").unwrap_or_else(|_| "24".to_string()),
            MAX_VERIFICATION_TOKEN_HOURS,
        )?;

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(value) => value
                .parse::<u32>()
                .context("BCRYPT_COST must be a valid number")?,
            Err(_) => bcrypt::DEFAULT_COST,
        };

        let server_host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{server_port}"))
            .trim_end_matches('/')
            .to_string();

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let rate_limit = RateLimitConfig {
            max_requests: env::var("RATE_LIMIT_MAX_REQUESTS")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u32>()
                .context("RATE_LIMIT_MAX_REQUESTS must be a valid number")?,
            window_seconds: env::var("RATE_LIMIT_WINDOW_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .context("RATE_LIMIT_WINDOW_SECONDS must be a valid number")?,
        };

        let email = Self::email_from_env(&public_base_url, verification_token_expire_hours)?;
        let avatar_storage = Self::avatar_storage_from_env();

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            jwt_secret,
            access_token_expire_minutes,
            verification_token_expire_hours,
            bcrypt_cost,
            server_host,
            server_port,
            allowed_origins,
            rate_limit,
            email,
            avatar_storage,
        })
    }

    fn email_from_env(
        public_base_url: &str,
        verification_ttl_hours: i64,
    ) -> Result<Option<EmailConfig>> {
        let (Ok(smtp_host), Ok(smtp_username), Ok(smtp_password)) = (
            env::var("MAIL_SERVER"),
            env::var("MAIL_USERNAME"),
            env::var("MAIL_PASSWORD"),
        ) else {
            return Ok(None);
        };

        let smtp_port = env::var("MAIL_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .context("MAIL_PORT must be a valid number")?;

        Ok(Some(EmailConfig {
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            from_email: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "noreply@contacts-api.com".to_string()),
            from_name: env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "Contacts API".to_string()),
            base_url: public_base_url.to_string(),
            verification_ttl_hours,
        }))
    }

    fn avatar_storage_from_env() -> Option<AvatarStorageConfig> {
        let upload_url = env::var("AVATAR_STORAGE_URL").ok()?;
        let api_key = env::var("AVATAR_STORAGE_API_KEY").ok()?;
        let upload_url = upload_url.trim_end_matches('/').to_string();
        let public_url = env::var("AVATAR_PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| upload_url.clone());

        Some(AvatarStorageConfig {
            upload_url,
            api_key,
            public_url,
        })
    }

    /// Email settings, when SMTP is configured.
    pub fn email_config(&self) -> Option<EmailConfig> {
        self.email.clone()
    }

    /// Avatar storage settings, when an upload endpoint is configured.
    pub fn avatar_storage_config(&self) -> Option<AvatarStorageConfig> {
        self.avatar_storage.clone()
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_expire_minutes)
    }

    pub fn verification_token_ttl(&self) -> Duration {
        Duration::hours(self.verification_token_expire_hours)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
