//! Authentication Models
//! Mission: Define identity roles, token claims and the login/signup payloads

use crate::directory::models::Identity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity roles. Immutable after signup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    #[serde(rename = "doctor")]
    Doctor,
    #[serde(rename = "patient")]
    Patient,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "doctor" => Some(Role::Doctor),
            "patient" => Some(Role::Patient),
            _ => None,
        }
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // identity id
    pub name: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// The verified caller, derived from token claims by the auth middleware.
///
/// Handlers authorize against this and nothing else; role fields in request
/// bodies are never consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

impl Principal {
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        let id = Uuid::parse_str(&claims.sub).ok()?;
        Some(Self {
            id,
            name: claims.name.clone(),
            role: claims.role,
        })
    }

    pub fn is_doctor(&self) -> bool {
        self.role == Role::Doctor
    }
}

/// Signup request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Narrows the directory lookup only.
    pub role: Option<String>,
}

/// Login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64, // seconds until expiration
    pub user: UserResponse,
}

/// User response (sanitized)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}

impl UserResponse {
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            id: identity.core.id.to_string(),
            first_name: identity.core.first_name.clone(),
            last_name: identity.core.last_name.clone(),
            email: identity.core.email.clone(),
            role: identity.role(),
        }
    }
}

/// Token-derived view returned by `GET /api/user`
#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl From<&Principal> for CurrentUserResponse {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id.to_string(),
            name: principal.name.clone(),
            role: principal.role,
        }
    }
}
