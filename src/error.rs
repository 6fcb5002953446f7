//! API Errors
//! Mission: Map every failure to a status code and a `{"error": ...}` body

use crate::auth::jwt::TokenError;
use crate::auth::policy::{Forbidden, VitalsError};
use crate::directory::DirectoryError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

#[derive(Debug)]
pub enum ApiError {
    /// Malformed input
    Validation(String),
    /// No token in header or cookie
    MissingToken,
    /// Token failed verification (malformed, bad signature or expired)
    InvalidToken,
    /// Role or ownership mismatch
    Forbidden(String),
    NotFound(String),
    /// Unexpected failure; details stay in the server log
    Internal,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingToken => StatusCode::UNAUTHORIZED,
            ApiError::InvalidToken | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::Validation(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message) => message,
            ApiError::MissingToken => "Access token missing",
            ApiError::InvalidToken => "Invalid token",
            ApiError::Internal => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<DirectoryError> for ApiError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::DuplicateEmail => {
                ApiError::validation("An account with this email already exists")
            }
            DirectoryError::Storage(e) => {
                error!("Directory failure: {:#}", e);
                ApiError::Internal
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!("Unexpected failure: {:#}", e);
        ApiError::Internal
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        // Which check failed is logged, never returned
        debug!("Rejected token: {}", e);
        ApiError::InvalidToken
    }
}

impl From<Forbidden> for ApiError {
    fn from(e: Forbidden) -> Self {
        ApiError::Forbidden(e.to_string())
    }
}

impl From<VitalsError> for ApiError {
    fn from(e: VitalsError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected request body: {}", rejection.body_text());
        ApiError::validation("Invalid request body")
    }
}
