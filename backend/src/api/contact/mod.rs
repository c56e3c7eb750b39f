//! Module for contact management API endpoints.
//!
//! Contacts are private to their owner; every route sits behind the verified
//! identity gate.

pub mod handlers;
pub mod models;
pub mod routes;
