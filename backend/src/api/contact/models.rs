use crate::api::common::PaginationFilter;
use crate::database::models::{ContactPatch, Patch};
use crate::errors::{FieldError, ServiceError, ServiceResult, validate_request};
use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContactRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be between 1-50 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50, message = "Last name must be between 1-50 characters"))]
    pub last_name: String,

    #[validate(email(message = "Must be a valid email"))]
    pub email: String,

    #[validate(length(min = 10, max = 20, message = "Phone must be between 10-20 characters"))]
    pub phone: String,

    pub birthday: NaiveDate,

    #[validate(length(max = 500, message = "Additional info must be at most 500 characters"))]
    pub additional_info: Option<String>,
}

/// Partial contact update; only fields present in the payload change.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateContactRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be between 1-50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Last name must be between 1-50 characters"))]
    pub last_name: Option<String>,

    #[validate(email(message = "Must be a valid email"))]
    pub email: Option<String>,

    #[validate(length(min = 10, max = 20, message = "Phone must be between 10-20 characters"))]
    pub phone: Option<String>,

    pub birthday: Option<NaiveDate>,

    #[serde(default)]
    pub additional_info: Patch<String>,
}

impl UpdateContactRequest {
    pub fn into_patch(self) -> ServiceResult<ContactPatch> {
        validate_request(&self)?;

        if let Some(info) = self.additional_info.as_set() {
            if info.chars().count() > 500 {
                return Err(ServiceError::invalid_fields(vec![FieldError {
                    field: "additional_info".to_string(),
                    message: "Additional info must be at most 500 characters".to_string(),
                }]));
            }
        }

        Ok(ContactPatch {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            birthday: self.birthday,
            additional_info: self.additional_info,
        })
    }
}

/// Query string for the contact list.
#[derive(Debug, Default, Deserialize)]
pub struct ContactQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

impl ContactQuery {
    pub fn pagination(&self) -> PaginationFilter {
        PaginationFilter {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_limits() {
        let valid: CreateContactRequest = serde_json::from_value(json!({
            "first_name": "Bob",
            "last_name": "Builder",
            "email": "bob@x.com",
            "phone": "+15550001111",
            "birthday": "1990-05-17"
        }))
        .unwrap();
        assert!(validate_request(&valid).is_ok());

        let short_phone: CreateContactRequest = serde_json::from_value(json!({
            "first_name": "Bob",
            "last_name": "Builder",
            "email": "bob@x.com",
            "phone": "123",
            "birthday": "1990-05-17"
        }))
        .unwrap();
        assert!(validate_request(&short_phone).is_err());
    }

    #[test]
    fn update_request_validates_present_fields_only() {
        let request: UpdateContactRequest =
            serde_json::from_value(json!({ "phone": "1234567890" })).unwrap();
        let patch = request.into_patch().unwrap();
        assert_eq!(patch.phone.as_deref(), Some("1234567890"));
        assert!(patch.first_name.is_none());
        assert!(patch.additional_info.is_unchanged());

        let request: UpdateContactRequest =
            serde_json::from_value(json!({ "email": "nope" })).unwrap();
        assert!(request.into_patch().is_err());

        let request: UpdateContactRequest =
            serde_json::from_value(json!({ "additional_info": "x".repeat(501) })).unwrap();
        assert!(request.into_patch().is_err());
    }

    #[test]
    fn query_maps_to_clamped_pagination() {
        let query = ContactQuery {
            page: Some(0),
            per_page: Some(1000),
            search: None,
        };
        let pagination = query.pagination();
        assert_eq!(pagination.page(), 1);
        assert_eq!(pagination.per_page(), 100);
    }
}
