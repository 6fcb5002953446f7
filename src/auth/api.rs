//! Authentication API Endpoints
//! Mission: Signup, login, logout and the current-user lookup

use crate::app::AppState;
use crate::auth::{
    middleware::extract_principal,
    models::{CurrentUserResponse, LoginRequest, LoginResponse, Role, SignupRequest, UserResponse},
    password::{PasswordHasher, MAX_PASSWORD_BYTES},
    session,
};
use crate::directory::models::NewIdentity;
use crate::error::ApiError;
use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Shortest password accepted at signup
pub const MIN_PASSWORD_LEN: usize = 8;

/// bcrypt is deliberately slow; keep it off the async workers
async fn hash_password(hasher: PasswordHasher, password: String) -> Result<String, ApiError> {
    let digest = tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .context("Password hashing task failed")??;
    Ok(digest)
}

/// Same work as a real check, for logins with no matching account
async fn decoy_verify(hasher: PasswordHasher, password: String) -> Result<(), ApiError> {
    tokio::task::spawn_blocking(move || hasher.decoy_verify(&password))
        .await
        .context("Password verification task failed")?;
    Ok(())
}

async fn verify_password(
    hasher: PasswordHasher,
    password: String,
    digest: String,
) -> Result<bool, ApiError> {
    let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
        .await
        .context("Password verification task failed")??;
    Ok(matches)
}

/// Validated signup fields
struct SignupForm {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    role: Role,
}

impl TryFrom<SignupRequest> for SignupForm {
    type Error = ApiError;

    fn try_from(req: SignupRequest) -> Result<Self, ApiError> {
        let first_name = req.first_name.trim().to_string();
        let last_name = req.last_name.trim().to_string();
        let email = req.email.trim().to_string();

        if first_name.is_empty() || last_name.is_empty() || email.is_empty() || req.password.is_empty() {
            return Err(ApiError::validation("All fields are required"));
        }
        if !email.contains('@') {
            return Err(ApiError::validation("Invalid email address"));
        }
        if req.password.len() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if req.password.len() > MAX_PASSWORD_BYTES {
            return Err(ApiError::validation(format!(
                "Password must be at most {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }
        let role = Role::from_str(&req.role)
            .ok_or_else(|| ApiError::validation("Role must be 'doctor' or 'patient'"))?;

        Ok(Self {
            first_name,
            last_name,
            email,
            password: req.password,
            role,
        })
    }
}

/// Signup endpoint - POST /api/signup
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(payload) = payload?;
    let form = SignupForm::try_from(payload)?;

    let password_hash = hash_password(state.hasher, form.password).await?;

    let identity = state.directory.create_identity(NewIdentity {
        first_name: form.first_name,
        last_name: form.last_name,
        email: form.email,
        password_hash,
        role: form.role,
    })?;

    info!(
        "✅ Registered {} {}",
        identity.role().as_str(),
        identity.core.id
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    ))
}

/// Login endpoint - POST /api/login
///
/// The optional `role` in the body only narrows the lookup; the token's role
/// always comes from the stored identity.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let Json(payload) = payload?;

    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    let wanted_role = match payload.role.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            Role::from_str(raw)
                .ok_or_else(|| ApiError::validation("Role must be 'doctor' or 'patient'"))?,
        ),
    };

    info!("🔐 Login attempt");

    let found = state
        .directory
        .find_by_email(email)?
        .filter(|identity| wanted_role.map_or(true, |role| identity.role() == role));

    let Some(identity) = found else {
        decoy_verify(state.hasher, payload.password).await?;
        warn!("❌ Login failed: no matching account");
        return Err(ApiError::not_found("User not found"));
    };

    let valid = verify_password(
        state.hasher,
        payload.password,
        identity.core.password_hash.clone(),
    )
    .await?;

    if !valid {
        warn!("❌ Login failed: bad password for {}", identity.core.id);
        return Err(ApiError::validation("Invalid credentials"));
    }

    let (token, expires_in) = state.jwt.generate_token(&identity)?;

    info!(
        "✅ Login successful: {} ({})",
        identity.core.id,
        identity.role().as_str()
    );

    let jar = session::attach(jar, token.clone(), &state.session);
    Ok((
        jar,
        Json(LoginResponse {
            token,
            expires_in,
            user: UserResponse::from_identity(&identity),
        }),
    ))
}

/// Logout endpoint - POST /api/logout
///
/// Clears the cookie only. The token itself stays valid until it expires.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    (
        session::clear(jar, &state.session),
        Json(json!({ "message": "Logged out successfully" })),
    )
}

/// Get current user info - GET /api/user
/// Built from the verified token (no database lookup needed)
pub async fn get_current_user(req: Request) -> Result<Json<CurrentUserResponse>, ApiError> {
    let principal = extract_principal(&req).ok_or(ApiError::MissingToken)?;
    Ok(Json(CurrentUserResponse::from(principal)))
}
