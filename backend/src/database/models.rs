//! Rust structs that represent database table mappings.
//!
//! These models define the structure of data as it is stored in and retrieved
//! from the database. API-facing shapes live next to their handlers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row data for a new user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Stored verification token row, read back in tests.
#[cfg(test)]
#[derive(Debug, Clone, FromRow)]
pub struct VerificationToken {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub id: String,
    pub owner_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub birthday: NaiveDate,
    pub additional_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateContact {
    pub owner_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub birthday: NaiveDate,
    pub additional_info: Option<String>,
}

/// Presence-aware field for partial updates.
///
/// A field missing from the payload deserializes to `Unchanged` (via
/// `#[serde(default)]`), an explicit `null` to `Clear`, anything else to `Set`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Unchanged,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Patch::Unchanged)
    }

    /// The value being set, if any.
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            _ => None,
        }
    }

    /// Applies the patch to a nullable field.
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Patch::Unchanged => {}
            Patch::Clear => *target = None,
            Patch::Set(value) => *target = Some(value),
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        })
    }
}

/// Self-service profile changes. Only fields present in the payload are touched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub first_name: Patch<String>,
    pub last_name: Patch<String>,
    pub avatar_url: Patch<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_unchanged()
            && self.last_name.is_unchanged()
            && self.avatar_url.is_unchanged()
    }
}

/// Partial contact update. Required columns can be replaced but not cleared.
#[derive(Debug, Clone, Default)]
pub struct ContactPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub additional_info: Patch<String>,
}

impl ContactPatch {
    pub fn merge_into(self, contact: &mut Contact) {
        if let Some(first_name) = self.first_name {
            contact.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            contact.last_name = last_name;
        }
        if let Some(email) = self.email {
            contact.email = email;
        }
        if let Some(phone) = self.phone {
            contact.phone = phone;
        }
        if let Some(birthday) = self.birthday {
            contact.birthday = birthday;
        }
        self.additional_info.apply_to(&mut contact.additional_info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[serde(default)]
        first_name: Patch<String>,
        #[serde(default)]
        last_name: Patch<String>,
    }

    #[test]
    fn patch_distinguishes_absent_null_and_value() {
        let payload: Payload =
            serde_json::from_value(json!({ "first_name": null })).unwrap();
        assert_eq!(payload.first_name, Patch::Clear);
        assert_eq!(payload.last_name, Patch::Unchanged);

        let payload: Payload = serde_json::from_value(json!({ "last_name": "L" })).unwrap();
        assert_eq!(payload.first_name, Patch::Unchanged);
        assert_eq!(payload.last_name, Patch::Set("L".to_string()));
    }

    #[test]
    fn user_patch_emptiness() {
        assert!(UserPatch::default().is_empty());
        let patch = UserPatch {
            avatar_url: Patch::Clear,
            ..UserPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn contact_patch_only_touches_present_fields() {
        let now = Utc::now();
        let mut contact = Contact {
            id: "c1".to_string(),
            owner_id: "u1".to_string(),
            first_name: "Carl".to_string(),
            last_name: "Smith".to_string(),
            email: "carl@x.com".to_string(),
            phone: "5550001111".to_string(),
            birthday: NaiveDate::from_ymd_opt(1985, 2, 28).unwrap(),
            additional_info: Some("met at conference".to_string()),
            created_at: now,
            updated_at: now,
        };
        let patch = ContactPatch {
            last_name: Some("Jones".to_string()),
            additional_info: Patch::Clear,
            ..ContactPatch::default()
        };

        patch.merge_into(&mut contact);

        assert_eq!(contact.first_name, "Carl");
        assert_eq!(contact.last_name, "Jones");
        assert_eq!(contact.additional_info, None);
        assert_eq!(contact.email, "carl@x.com");
    }
}
