//! Application Wiring
//! Mission: Assemble shared state and the HTTP router

use crate::api::{
    doctors,
    patients::{self, add_entry, list_entries, remove_entry},
    payloads::{NewAllergy, NewHistory, NewPrescription},
};
use crate::auth::{api as auth_api, auth_middleware, JwtHandler, PasswordHasher, SessionConfig};
use crate::config::Config;
use crate::directory::{
    models::{Allergy, HistoryEntry, Prescription, VitalsEntry},
    Directory,
};
use crate::middleware::request_logging;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<Directory>,
    pub jwt: Arc<JwtHandler>,
    pub hasher: PasswordHasher,
    pub session: SessionConfig,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let directory = Directory::open(&config.database_path)
            .with_context(|| format!("Failed to open database at {}", config.database_path))?;
        let jwt = JwtHandler::new(&config.jwt_secret, config.token_ttl_secs)?;

        Ok(Self {
            directory: Arc::new(directory),
            jwt: Arc::new(jwt),
            hasher: PasswordHasher::new(config.bcrypt_cost),
            session: config.session(),
        })
    }
}

/// Build the full router: `/health` plus everything under `/api`
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    // Public auth routes
    let public_routes = Router::new()
        .route("/signup", post(auth_api::signup))
        .route("/login", post(auth_api::login))
        .route("/logout", post(auth_api::logout));

    // Everything else needs a verified token
    let protected_routes = Router::new()
        .route("/user", get(auth_api::get_current_user))
        .route("/patients/search", get(patients::search_patients))
        .route(
            "/patients/:id",
            get(patients::get_patient).put(patients::update_patient),
        )
        .route(
            "/patients/:id/vitals",
            get(patients::list_vitals).post(patients::add_vitals),
        )
        .route(
            "/patients/:id/vitals/:sub_id",
            delete(remove_entry::<VitalsEntry>),
        )
        .route(
            "/patients/:id/prescriptions",
            get(list_entries::<Prescription>).post(add_entry::<NewPrescription>),
        )
        .route(
            "/patients/:id/prescriptions/:sub_id",
            delete(remove_entry::<Prescription>),
        )
        .route(
            "/patients/:id/histories",
            get(list_entries::<HistoryEntry>).post(add_entry::<NewHistory>),
        )
        .route(
            "/patients/:id/histories/:sub_id",
            delete(remove_entry::<HistoryEntry>),
        )
        .route(
            "/patients/:id/allergies",
            get(list_entries::<Allergy>).post(add_entry::<NewAllergy>),
        )
        .route(
            "/patients/:id/allergies/:sub_id",
            delete(remove_entry::<Allergy>),
        )
        .route("/doctors/profile", put(doctors::update_profile))
        .route("/doctors/:id", get(doctors::get_doctor))
        .route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", public_routes.merge(protected_routes))
        .layer(middleware::from_fn(request_logging))
        .layer(cors)
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let database = if state.directory.ping() {
        "connected"
    } else {
        "unavailable"
    };

    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "database": database,
    }))
}
