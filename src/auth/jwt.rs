//! JWT Token Handler
//! Mission: Issue and verify signed, time-limited identity tokens
//!
//! Tokens are stateless: there is no revocation list, so a token stays valid
//! until `exp` even after the holder logs out.

use crate::auth::models::Claims;
use crate::directory::models::Identity;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use std::fmt;
use tracing::debug;

/// Shortest signing secret accepted, in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Default token lifetime
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// Why a token was rejected. Callers report all of these the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    BadSignature,
    Expired,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "malformed token"),
            TokenError::BadSignature => write!(f, "token signature mismatch"),
            TokenError::Expired => write!(f, "token expired"),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed,
        }
    }
}

/// JWT Handler for token operations
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtHandler {
    /// Create a handler from an externally supplied secret
    pub fn new(secret: &str, ttl_secs: i64) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            bail!(
                "JWT secret must be at least {} bytes (got {})",
                MIN_SECRET_LEN,
                secret.len()
            );
        }
        if ttl_secs <= 0 {
            bail!("Token TTL must be positive (got {})", ttl_secs);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::seconds(ttl_secs),
        })
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Generate a token for an identity, returning it with its lifetime in seconds
    pub fn generate_token(&self, identity: &Identity) -> Result<(String, i64)> {
        let token = self.issue_at(identity, Utc::now())?;
        Ok((token, self.ttl_secs()))
    }

    /// Issue a token as of `issued_at`
    pub fn issue_at(&self, identity: &Identity, issued_at: DateTime<Utc>) -> Result<String> {
        let expiration = issued_at
            .checked_add_signed(self.ttl)
            .context("Invalid timestamp")?;

        let claims = Claims {
            sub: identity.core.id.to_string(),
            name: identity.core.display_name(),
            role: identity.role(),
            iat: issued_at.timestamp(),
            exp: expiration.timestamp(),
        };

        debug!(
            "Generating JWT for {} ({}), expires in {}s",
            identity.core.id,
            identity.role().as_str(),
            self.ttl_secs()
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to generate JWT")
    }

    /// Validate a token and extract claims
    pub fn validate_token(&self, token: &str) -> std::result::Result<Claims, TokenError> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(decoded.claims)
    }
}
