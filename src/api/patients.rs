//! Patient API
//! Mission: Serve patient profiles and their clinical sub-resources
//!
//! Every handler checks in the same order: identifiers (400), policy (403),
//! body (400), then storage (404).

use crate::api::payloads::NewEntry;
use crate::app::AppState;
use crate::auth::{
    models::Principal,
    policy::{
        authorize, filter_profile_update, require_doctor, Action, ProfileUpdateRequest, Resource,
        VitalsInput,
    },
};
use crate::directory::{
    models::{SubResource, SubResourceKind, VitalsEntry},
    RemoveOutcome,
};
use crate::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;

fn parse_patient_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation("Invalid patient ID"))
}

fn patient_not_found() -> ApiError {
    ApiError::not_found("Patient not found")
}

/// `{ key: value }` with a key chosen at runtime
fn keyed<T: Serialize>(body: &mut Map<String, Value>, key: &str, value: &T) -> Result<(), ApiError> {
    let value = serde_json::to_value(value).map_err(anyhow::Error::from)?;
    body.insert(key.to_string(), value);
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

/// Search patients - GET /api/patients/search?query= (doctors only)
pub async fn search_patients(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    require_doctor(&principal, Action::Read, Resource::PatientDirectory)?;

    let query = params.query.trim();
    if query.is_empty() {
        return Err(ApiError::validation("Search query is required"));
    }

    let patients = state.directory.search_patients(query)?;
    Ok(Json(json!({ "patients": patients })))
}

/// Patient profile - GET /api/patients/:id
pub async fn get_patient(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let patient_id = parse_patient_id(&id)?;
    authorize(&principal, Action::Read, Resource::Profile, &patient_id)?;

    let patient = state
        .directory
        .get_patient(&patient_id)?
        .ok_or_else(patient_not_found)?;

    Ok(Json(json!({ "patient": patient })))
}

/// Update patient profile - PUT /api/patients/:id
///
/// The body is reduced to what the caller's role may change before it is
/// applied. An update that reduces to nothing returns the record unchanged.
pub async fn update_patient(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<ProfileUpdateRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let patient_id = parse_patient_id(&id)?;
    authorize(&principal, Action::Update, Resource::Profile, &patient_id)?;

    let Json(request) = payload?;
    let patch = filter_profile_update(principal.role, request)?;

    let patient = if patch.is_empty() {
        state.directory.get_patient(&patient_id)?
    } else {
        state.directory.update_patient(&patient_id, &patch)?
    }
    .ok_or_else(patient_not_found)?;

    if !patch.is_empty() {
        info!(
            "📝 Patient {} updated by {} {}",
            patient_id,
            principal.role.as_str(),
            principal.id
        );
    }

    Ok(Json(json!({
        "message": "Patient details updated successfully",
        "patient": patient,
    })))
}

fn load_entries<T: SubResource>(
    state: &AppState,
    principal: &Principal,
    raw_id: &str,
) -> Result<Vec<T>, ApiError> {
    let patient_id = parse_patient_id(raw_id)?;
    authorize(principal, Action::Read, Resource::Collection(T::KIND), &patient_id)?;

    state
        .directory
        .list::<T>(&patient_id)?
        .ok_or_else(patient_not_found)
}

fn collection_body<T: SubResource>(entries: &[T]) -> Result<Json<Value>, ApiError> {
    let mut body = Map::new();
    keyed(&mut body, T::KIND.as_str(), &entries)?;
    Ok(Json(Value::Object(body)))
}

/// List a collection, oldest first - GET /api/patients/:id/{kind}
pub async fn list_entries<T: SubResource>(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let entries = load_entries::<T>(&state, &principal, &id)?;
    collection_body(&entries)
}

/// Vitals history, newest first - GET /api/patients/:id/vitals
pub async fn list_vitals(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let mut entries = load_entries::<VitalsEntry>(&state, &principal, &id)?;
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    collection_body(&entries)
}

fn created<T: SubResource>(entry: &T) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut body = Map::new();
    body.insert(
        "message".to_string(),
        Value::String(format!("{} added successfully", T::KIND.label())),
    );
    keyed(&mut body, T::KIND.entry_key(), entry)?;
    Ok((StatusCode::CREATED, Json(Value::Object(body))))
}

/// Append an entry - POST /api/patients/:id/{kind}
pub async fn add_entry<N: NewEntry>(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<N>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let kind = <N::Entry as SubResource>::KIND;
    let patient_id = parse_patient_id(&id)?;
    authorize(&principal, Action::Create, Resource::Collection(kind), &patient_id)?;

    let Json(payload) = payload?;
    let entry = payload.into_entry(Utc::now())?;

    if !state.directory.append(&patient_id, &entry)? {
        return Err(patient_not_found());
    }

    info!(
        "✅ {} {} added to patient {} by {}",
        kind.label(),
        entry.id(),
        patient_id,
        principal.id
    );
    created(&entry)
}

/// Record a vitals reading - POST /api/patients/:id/vitals
///
/// Also refreshes the patient's current vitals.
pub async fn add_vitals(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<VitalsInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let patient_id = parse_patient_id(&id)?;
    authorize(
        &principal,
        Action::Create,
        Resource::Collection(SubResourceKind::Vitals),
        &patient_id,
    )?;

    let Json(input) = payload?;
    let reading = input.into_reading()?;

    let entry = state
        .directory
        .record_vitals(&patient_id, reading)?
        .ok_or_else(patient_not_found)?;

    info!("✅ Vitals {} recorded for patient {}", entry.id, patient_id);
    created(&entry)
}

/// Remove an entry by id - DELETE /api/patients/:id/{kind}/:sub_id
pub async fn remove_entry<T: SubResource>(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, sub_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let (Ok(patient_id), Ok(entry_id)) = (Uuid::parse_str(&id), Uuid::parse_str(&sub_id)) else {
        return Err(ApiError::validation("Invalid ID(s)"));
    };
    authorize(&principal, Action::Delete, Resource::Collection(T::KIND), &patient_id)?;

    match state.directory.remove::<T>(&patient_id, &entry_id)? {
        RemoveOutcome::Removed => {
            info!(
                "🗑️  {} {} removed from patient {} by {}",
                T::KIND.label(),
                entry_id,
                patient_id,
                principal.id
            );
            Ok(Json(json!({
                "message": format!("{} deleted successfully", T::KIND.label())
            })))
        }
        RemoveOutcome::PatientMissing => Err(patient_not_found()),
        RemoveOutcome::EntryMissing => Err(ApiError::not_found(format!(
            "{} not found",
            T::KIND.label()
        ))),
    }
}
