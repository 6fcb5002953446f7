//! Credential Hasher
//! Mission: One-way, salted, adaptive-cost password hashing

use anyhow::{bail, Context, Result};

/// Lowest cost accepted from configuration
pub const MIN_PRODUCTION_COST: u32 = 10;

/// bcrypt only reads this many bytes; anything longer is refused, not truncated
pub const MAX_PASSWORD_BYTES: usize = 72;

/// bcrypt hasher with a configurable cost factor
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password with a fresh salt
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            bail!("Password longer than {} bytes", MAX_PASSWORD_BYTES);
        }
        bcrypt::hash(plaintext, self.cost).context("Failed to hash password")
    }

    /// Check a plaintext against a stored digest.
    ///
    /// Comparison is bcrypt's own constant-time check. A digest that is not a
    /// bcrypt hash is an error, not a mismatch. An overlong plaintext never
    /// matches, since no stored digest could have come from it.
    pub fn verify(&self, plaintext: &str, digest: &str) -> Result<bool> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        bcrypt::verify(plaintext, digest).context("Failed to verify password")
    }

    /// Spend one hash's worth of work and report a mismatch.
    ///
    /// Used when there is no account to check against, so a missing account
    /// costs the same time as a wrong password.
    pub fn decoy_verify(&self, plaintext: &str) -> bool {
        let bytes = plaintext.as_bytes();
        let _ = bcrypt::hash(&bytes[..bytes.len().min(MAX_PASSWORD_BYTES)], self.cost);
        false
    }
}
