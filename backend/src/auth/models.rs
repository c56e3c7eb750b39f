//! Request and response payloads for the authentication endpoints.

use crate::database::models::{Patch, User, UserPatch};
use crate::errors::{FieldError, ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration request payload
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3-50 characters"))]
    pub username: String,

    #[validate(email(message = "Must be a valid email"))]
    pub email: String,

    #[validate(length(min = 6, max = 128, message = "Password must be between 6-128 characters"))]
    pub password: String,

    #[validate(length(max = 50, message = "First name must be at most 50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 50, message = "Last name must be at most 50 characters"))]
    pub last_name: Option<String>,
}

/// Login request payload
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Must be a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Bearer token issued on successful login
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64, // Token expiration in seconds
}

impl TokenResponse {
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            expires_in,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "Must be a valid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Public view of a user; the password hash never leaves the service.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            avatar_url: user.avatar_url,
            is_active: user.is_active,
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

/// Self-profile update. Absent fields stay as they are, `null` clears them.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub first_name: Patch<String>,
    #[serde(default)]
    pub last_name: Patch<String>,
    #[serde(default)]
    pub avatar_url: Patch<String>,
}

impl UpdateProfileRequest {
    /// Checks field limits and converts into a `UserPatch`.
    pub fn into_patch(self) -> ServiceResult<UserPatch> {
        let mut fields = Vec::new();
        check_max_len(&mut fields, "first_name", &self.first_name, 50);
        check_max_len(&mut fields, "last_name", &self.last_name, 50);
        check_max_len(&mut fields, "avatar_url", &self.avatar_url, 255);

        if !fields.is_empty() {
            return Err(ServiceError::invalid_fields(fields));
        }

        Ok(UserPatch {
            first_name: self.first_name,
            last_name: self.last_name,
            avatar_url: self.avatar_url,
        })
    }
}

fn check_max_len(fields: &mut Vec<FieldError>, field: &str, value: &Patch<String>, max: usize) {
    if let Some(value) = value.as_set() {
        if value.chars().count() > max {
            fields.push(FieldError {
                field: field.to_string(),
                message: format!("Must be at most {max} characters"),
            });
        }
    }
}
