//! Contact business logic service.
//!
//! Every operation is scoped by the owner resolved from the identity gate.
//! Contacts of other users are reported as not found.

use crate::api::contact::models::{ContactQuery, CreateContactRequest, UpdateContactRequest};
use crate::database::models::{Contact, CreateContact, User};
use crate::errors::{ServiceError, ServiceResult, is_unique_violation, validate_request};
use crate::repositories::contact_repository::ContactRepository;
use sqlx::SqlitePool;

pub struct ContactService<'a> {
    /// Shared database connection pool
    pool: &'a SqlitePool,
}

impl<'a> ContactService<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> ContactRepository<'a> {
        ContactRepository::new(self.pool)
    }

    pub async fn create_contact(
        &self,
        owner: &User,
        request: CreateContactRequest,
    ) -> ServiceResult<Contact> {
        validate_request(&request)?;

        let repo = self.repo();
        if repo
            .email_exists_for_owner(&owner.id, &request.email, None)
            .await?
        {
            return Err(ServiceError::already_exists("Contact", &request.email));
        }

        let contact = repo
            .create_contact(CreateContact {
                owner_id: owner.id.clone(),
                first_name: request.first_name,
                last_name: request.last_name,
                email: request.email,
                phone: request.phone,
                birthday: request.birthday,
                additional_info: request.additional_info,
            })
            .await
            .map_err(|e| map_write_error(e, "email"))?;

        tracing::info!("User {} created contact {}", owner.id, contact.id);
        Ok(contact)
    }

    /// Returns one page of the owner's contacts and the total matching count.
    pub async fn list_contacts(
        &self,
        owner: &User,
        query: &ContactQuery,
    ) -> ServiceResult<(Vec<Contact>, u64)> {
        let repo = self.repo();
        let pagination = query.pagination();
        let search = query.search.as_deref();

        let contacts = repo.list_contacts(&owner.id, search, &pagination).await?;
        let total = repo.count_contacts(&owner.id, search).await?;

        Ok((contacts, total))
    }

    pub async fn get_contact_required(&self, owner: &User, id: &str) -> ServiceResult<Contact> {
        self.repo()
            .get_contact(&owner.id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Contact", id))
    }

    pub async fn update_contact(
        &self,
        owner: &User,
        id: &str,
        request: UpdateContactRequest,
    ) -> ServiceResult<Contact> {
        let patch = request.into_patch()?;
        let mut contact = self.get_contact_required(owner, id).await?;

        let repo = self.repo();
        if let Some(email) = patch.email.as_deref() {
            if email != contact.email
                && repo.email_exists_for_owner(&owner.id, email, Some(id)).await?
            {
                return Err(ServiceError::already_exists("Contact", email));
            }
        }

        patch.merge_into(&mut contact);

        repo.update_contact(&contact)
            .await
            .map_err(|e| map_write_error(e, &contact.email))?
            .ok_or_else(|| ServiceError::not_found("Contact", id))
    }

    pub async fn delete_contact(&self, owner: &User, id: &str) -> ServiceResult<()> {
        if !self.repo().delete_contact(&owner.id, id).await? {
            return Err(ServiceError::not_found("Contact", id));
        }

        tracing::info!("User {} deleted contact {}", owner.id, id);
        Ok(())
    }
}

fn map_write_error(error: anyhow::Error, identifier: &str) -> ServiceError {
    if is_unique_violation(&error) {
        ServiceError::already_exists("Contact", identifier)
    } else {
        ServiceError::Database { source: error }
    }
}
