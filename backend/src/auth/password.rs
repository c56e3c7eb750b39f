//! One-way password hashing.
//!
//! bcrypt embeds a fresh random salt in every digest, so hashing the same
//! password twice yields two different strings that both verify.

use crate::errors::{ServiceError, ServiceResult};
use bcrypt::{hash, verify};

/// Plaintext used to build the decoy digest for unknown login emails.
const DECOY_PASSWORD: &str = "decoy-password-for-unknown-accounts";

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    decoy_hash: String,
}

impl PasswordHasher {
    /// Creates a hasher with the given bcrypt cost.
    ///
    /// # Errors
    /// Returns `ServiceError::InternalError` if the cost is outside bcrypt's range.
    pub fn new(cost: u32) -> ServiceResult<Self> {
        let decoy_hash = hash(DECOY_PASSWORD, cost)
            .map_err(|e| ServiceError::internal_error(format!("Invalid bcrypt cost: {e}")))?;
        Ok(Self { cost, decoy_hash })
    }

    /// Hashes a plaintext password.
    pub fn hash(&self, plaintext: &str) -> ServiceResult<String> {
        hash(plaintext, self.cost)
            .map_err(|e| ServiceError::internal_error(format!("Password hashing failed: {e}")))
    }

    /// Checks a plaintext password against a stored digest.
    ///
    /// A malformed digest is treated as a mismatch.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        verify(plaintext, digest).unwrap_or(false)
    }

    /// Hashes on the blocking pool so request workers are not stalled.
    pub async fn hash_blocking(&self, plaintext: String) -> ServiceResult<String> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| ServiceError::internal_error(format!("Hashing task failed: {e}")))?
    }

    /// Verifies on the blocking pool. `None` checks against the decoy digest
    /// and always fails, at the same cost as a real check.
    pub async fn verify_blocking(&self, plaintext: String, digest: Option<String>) -> bool {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || match digest {
            Some(digest) => hasher.verify(&plaintext, &digest),
            None => {
                hasher.verify(&plaintext, &hasher.decoy_hash);
                false
            }
        })
        .await
        .unwrap_or(false)
    }
}
