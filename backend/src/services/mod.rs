//! Business logic services and external collaborators.

pub mod avatar_service;
pub mod contact_service;
pub mod email_service;
