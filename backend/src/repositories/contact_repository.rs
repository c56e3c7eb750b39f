//! Database repository for contact management operations.
//!
//! Every query takes the owner id and filters on it; a contact that belongs to
//! someone else is indistinguishable from one that does not exist.

use crate::{
    api::common::PaginationFilter,
    database::models::{Contact, CreateContact},
};
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

const CONTACT_COLUMNS: &str = r#"
    id, owner_id, first_name, last_name, email, phone, birthday, additional_info,
    created_at, updated_at
"#;

/// Repository for contact database operations.
pub struct ContactRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> ContactRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_contact(&self, contact: CreateContact) -> Result<Contact> {
        let now = Utc::now();
        let query = format!(
            r#"
            INSERT INTO contacts (id, owner_id, first_name, last_name, email, phone, birthday,
                                  additional_info, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {CONTACT_COLUMNS}
            "#
        );

        let contact = sqlx::query_as::<_, Contact>(&query)
            .bind(Uuid::now_v7().to_string())
            .bind(contact.owner_id)
            .bind(contact.first_name)
            .bind(contact.last_name)
            .bind(contact.email)
            .bind(contact.phone)
            .bind(contact.birthday)
            .bind(contact.additional_info)
            .bind(now)
            .bind(now)
            .fetch_one(self.pool)
            .await?;

        Ok(contact)
    }

    /// Retrieves one contact owned by `owner_id`.
    pub async fn get_contact(&self, owner_id: &str, id: &str) -> Result<Option<Contact>> {
        let query = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ? AND owner_id = ?");
        let contact = sqlx::query_as::<_, Contact>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(contact)
    }

    /// Lists a page of the owner's contacts, optionally filtered by a
    /// case-insensitive substring of first name, last name or email.
    pub async fn list_contacts(
        &self,
        owner_id: &str,
        search: Option<&str>,
        pagination: &PaginationFilter,
    ) -> Result<Vec<Contact>> {
        let pattern = search_pattern(search);
        let query = format!(
            r#"
            SELECT {CONTACT_COLUMNS}
            FROM contacts
            WHERE owner_id = ?
              AND (? IS NULL
                   OR first_name LIKE ? ESCAPE '\'
                   OR last_name LIKE ? ESCAPE '\'
                   OR email LIKE ? ESCAPE '\')
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        );

        let contacts = sqlx::query_as::<_, Contact>(&query)
            .bind(owner_id)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(pagination.limit() as i64)
            .bind(pagination.offset() as i64)
            .fetch_all(self.pool)
            .await?;

        Ok(contacts)
    }

    /// Counts the owner's contacts matching the same filter as `list_contacts`.
    pub async fn count_contacts(&self, owner_id: &str, search: Option<&str>) -> Result<u64> {
        let pattern = search_pattern(search);
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM contacts
            WHERE owner_id = ?
              AND (? IS NULL
                   OR first_name LIKE ? ESCAPE '\'
                   OR last_name LIKE ? ESCAPE '\'
                   OR email LIKE ? ESCAPE '\')
            "#,
        )
        .bind(owner_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(self.pool)
        .await?;

        Ok(count as u64)
    }

    /// Checks whether the owner already has a contact with this email,
    /// ignoring `exclude_id` when given.
    pub async fn email_exists_for_owner(
        &self,
        owner_id: &str,
        email: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contacts WHERE owner_id = ? AND email = ? AND (? IS NULL OR id != ?)",
        )
        .bind(owner_id)
        .bind(email)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Persists an already-merged contact.
    pub async fn update_contact(&self, contact: &Contact) -> Result<Option<Contact>> {
        let query = format!(
            r#"
            UPDATE contacts
            SET first_name = ?, last_name = ?, email = ?, phone = ?, birthday = ?,
                additional_info = ?, updated_at = ?
            WHERE id = ? AND owner_id = ?
            RETURNING {CONTACT_COLUMNS}
            "#
        );

        let contact = sqlx::query_as::<_, Contact>(&query)
            .bind(&contact.first_name)
            .bind(&contact.last_name)
            .bind(&contact.email)
            .bind(&contact.phone)
            .bind(contact.birthday)
            .bind(&contact.additional_info)
            .bind(Utc::now())
            .bind(&contact.id)
            .bind(&contact.owner_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(contact)
    }

    /// Deletes one contact owned by `owner_id`.
    ///
    /// # Returns
    /// `true` if a row was removed
    pub async fn delete_contact(&self, owner_id: &str, id: &str) -> Result<bool> {
        let rows_affected = sqlx::query("DELETE FROM contacts WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}

/// Builds a LIKE pattern with wildcards in the input escaped.
fn search_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|term| !term.is_empty())?;
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}
