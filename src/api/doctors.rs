//! Doctor API
//! Mission: Doctor profile lookup and self-service profile edits

use crate::app::AppState;
use crate::auth::{
    models::Principal,
    policy::{require_doctor, Action, Resource},
};
use crate::directory::models::{DoctorPatch, DoctorRecord};
use crate::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

fn doctor_not_found() -> ApiError {
    ApiError::not_found("Doctor not found")
}

/// Doctor profile - GET /api/doctors/:id (any authenticated caller)
pub async fn get_doctor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DoctorRecord>, ApiError> {
    let doctor_id = Uuid::parse_str(&id).map_err(|_| ApiError::validation("Invalid doctor ID"))?;

    let doctor = state
        .directory
        .get_doctor(&doctor_id)?
        .ok_or_else(doctor_not_found)?;

    Ok(Json(doctor))
}

/// Update own profile - PUT /api/doctors/profile (doctors only)
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<DoctorPatch>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    require_doctor(&principal, Action::Update, Resource::DoctorProfile)?;

    let Json(patch) = payload?;
    let patch = tidy(patch);

    let doctor = state
        .directory
        .update_doctor(&principal.id, patch)?
        .ok_or_else(doctor_not_found)?;

    info!("📝 Doctor {} updated their profile", principal.id);

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "doctor": doctor,
    })))
}

/// Trim text fields; blanks count as absent
fn tidy(patch: DoctorPatch) -> DoctorPatch {
    let text = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    DoctorPatch {
        specialty: text(patch.specialty),
        qualifications: patch.qualifications.map(|list| {
            list.into_iter()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect()
        }),
        experience: patch.experience,
        avatar: text(patch.avatar),
    }
}
