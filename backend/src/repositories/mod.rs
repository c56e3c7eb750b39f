//! Data access layer. Each repository borrows the pool and returns `anyhow::Result`.

pub mod contact_repository;
pub mod user_repository;
pub mod verification_repository;
