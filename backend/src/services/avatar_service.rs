//! Avatar image storage.
//!
//! Images are pushed to an external blob store over HTTP; the service only
//! keeps the public URL it gets back.

use crate::config::AvatarStorageConfig;
use crate::errors::{ServiceError, ServiceResult};
use async_trait::async_trait;
use axum::body::Bytes;

/// Largest accepted avatar upload.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

#[async_trait]
pub trait AvatarStore: Send + Sync {
    /// Stores the image for `user_id`, replacing any previous one, and
    /// returns the public URL.
    async fn upload(&self, user_id: &str, content_type: &str, bytes: Bytes) -> ServiceResult<String>;
}

/// Rejects uploads that are not images or exceed the size limit.
pub fn validate_avatar(content_type: Option<&str>, len: usize) -> ServiceResult<&str> {
    let content_type = content_type
        .filter(|value| value.starts_with("image/"))
        .ok_or_else(|| ServiceError::validation("File must be an image"))?;

    if len == 0 {
        return Err(ServiceError::validation("File is empty"));
    }
    if len > MAX_AVATAR_BYTES {
        return Err(ServiceError::validation("File is too large (max 5MB)"));
    }

    Ok(content_type)
}

pub struct HttpAvatarStore {
    client: reqwest::Client,
    config: AvatarStorageConfig,
}

impl HttpAvatarStore {
    pub fn new(config: AvatarStorageConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn object_path(user_id: &str) -> String {
        format!("avatars/user_{user_id}")
    }
}

#[async_trait]
impl AvatarStore for HttpAvatarStore {
    async fn upload(&self, user_id: &str, content_type: &str, bytes: Bytes) -> ServiceResult<String> {
        let path = Self::object_path(user_id);
        let upload_url = format!("{}/{}", self.config.upload_url, path);

        let response = self
            .client
            .put(&upload_url)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| ServiceError::unavailable(format!("Avatar upload failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ServiceError::unavailable(format!(
                "Avatar storage responded with {}",
                response.status()
            )));
        }

        Ok(format!("{}/{}", self.config.public_url, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_images_within_limit() {
        assert_eq!(validate_avatar(Some("image/png"), 10).unwrap(), "image/png");
        assert!(validate_avatar(Some("image/jpeg"), MAX_AVATAR_BYTES).is_ok());
    }

    #[test]
    fn rejects_non_images_empty_and_oversized() {
        assert!(validate_avatar(Some("text/plain"), 10).is_err());
        assert!(validate_avatar(None, 10).is_err());
        assert!(validate_avatar(Some("image/png"), 0).is_err());
        assert!(validate_avatar(Some("image/png"), MAX_AVATAR_BYTES + 1).is_err());
    }

    #[test]
    fn objects_are_keyed_by_user() {
        assert_eq!(HttpAvatarStore::object_path("42"), "avatars/user_42");
    }
}
