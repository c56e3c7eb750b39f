//! Shared fixtures for unit and router tests.

use crate::config::{Config, RateLimitConfig};
use crate::errors::{ServiceError, ServiceResult};
use crate::services::avatar_service::AvatarStore;
use crate::services::email_service::NotificationSink;
use crate::state::AppState;
use async_trait::async_trait;
use axum::body::Bytes;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Fresh in-memory database with the schema applied.
///
/// A single connection keeps every query on the same in-memory database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

/// Migrated database in a temporary file, reachable from several connections
/// at once. The files are removed on drop.
pub struct FileTestDb {
    pub pool: SqlitePool,
    path: PathBuf,
}

impl Drop for FileTestDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

pub async fn file_test_db(max_connections: u32) -> FileTestDb {
    let path = std::env::temp_dir().join(format!("contacts-test-{}.db", Uuid::now_v7()));
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(10));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .expect("file sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    FileTestDb { pool, path }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        max_connections: 1,
        acquire_timeout_seconds: 3,
        jwt_secret: "test-secret-key-for-unit-tests".to_string(),
        access_token_expire_minutes: 30,
        verification_token_expire_hours: 24,
        bcrypt_cost: 4,
        server_host: "127.0.0.1".to_string(),
        server_port: 8000,
        allowed_origins: vec!["*".to_string()],
        rate_limit: RateLimitConfig::default(),
        email: None,
        avatar_storage: None,
    }
}

/// Captures verification mail instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Most recent token mailed to `recipient`.
    pub fn last_token_for(&self, recipient: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|(email, _)| email == recipient)
            .map(|(_, token)| token)
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn send_verification_email(&self, recipient: &str, token: &str) -> ServiceResult<()> {
        if self.fail {
            return Err(ServiceError::unavailable("SMTP relay unreachable"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), token.to_string()));
        Ok(())
    }
}

/// In-memory avatar store returning a predictable URL.
#[derive(Default)]
pub struct MemoryAvatarStore {
    uploads: Mutex<Vec<(String, String, usize)>>,
}

impl MemoryAvatarStore {
    pub fn uploads(&self) -> Vec<(String, String, usize)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl AvatarStore for MemoryAvatarStore {
    async fn upload(&self, user_id: &str, content_type: &str, bytes: Bytes) -> ServiceResult<String> {
        self.uploads
            .lock()
            .unwrap()
            .push((user_id.to_string(), content_type.to_string(), bytes.len()));
        Ok(format!("https://cdn.test/avatars/user_{user_id}"))
    }
}

pub struct TestContext {
    pub state: AppState,
    pub notifier: Arc<RecordingNotifier>,
    pub avatars: Arc<MemoryAvatarStore>,
}

pub async fn test_context() -> TestContext {
    test_context_with(test_config(), RecordingNotifier::default()).await
}

pub async fn test_context_with(config: Config, notifier: RecordingNotifier) -> TestContext {
    let pool = test_pool().await;
    let notifier = Arc::new(notifier);
    let avatars = Arc::new(MemoryAvatarStore::default());
    let state = AppState::with_collaborators(
        pool,
        config,
        Some(notifier.clone() as Arc<dyn NotificationSink>),
        Some(avatars.clone() as Arc<dyn AvatarStore>),
    )
    .expect("app state");

    TestContext {
        state,
        notifier,
        avatars,
    }
}
