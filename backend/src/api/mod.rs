//! Central module for organizing the application's API endpoints.
//!
//! Authentication routes live in `crate::auth`; this module holds the shared
//! response envelope, request extractors, request throttling and the contact
//! endpoints.

pub mod common;
pub mod contact;
pub mod extract;
pub mod throttle;
