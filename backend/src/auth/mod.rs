//! Authentication module for managing user accounts, sessions, and access control.
//!
//! Password hashing, session tokens, email verification, the identity gate
//! middleware and the register/login/verify workflows live here.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod routes;
pub mod service;
pub mod token;
pub mod verification;
