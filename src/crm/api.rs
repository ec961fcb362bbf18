use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::board::partition;
use super::contact::{ContactEmail, Mailer};
use super::models::*;
use super::stages::list_stages;
use super::store::LeadStore;
use crate::config::MailConfig;
use crate::errors::StoreError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub store: Arc<dyn LeadStore>,
    pub mailer: Arc<dyn Mailer>,
    pub mail: MailConfig,
}

pub type SharedState = Arc<AppState>;

// ── Request / response payload types ──────────────────────────────────

#[derive(Deserialize)]
pub struct AddNoteRequest {
    pub note: String,
}

#[derive(Serialize)]
pub struct LeadsResponse {
    pub leads: Vec<Lead>,
}

#[derive(Serialize)]
pub struct LeadResponse {
    pub lead: Lead,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub success: bool,
    pub lead_id: String,
    pub notified: bool,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation { .. } => ApiError::BadRequest(err.to_string()),
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::Persistence(ref msg) => {
                tracing::error!(error = %msg, "store failure");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/stages", get(list_stage_defs))
        .route("/api/leads", get(list_leads).post(create_lead))
        .route(
            "/api/leads/{id}",
            get(get_lead).put(update_lead).delete(delete_lead),
        )
        .route("/api/leads/{id}/notes", post(add_note))
        .route("/api/board", get(get_board))
        .route("/api/db/check", get(check_db))
        .route("/api/db/init", post(init_db))
        .route("/api/contact", post(submit_contact))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_stage_defs() -> impl IntoResponse {
    Json(list_stages())
}

async fn list_leads(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let leads = state.store.fetch_leads().await?;
    Ok(Json(LeadsResponse { leads }))
}

async fn create_lead(
    State(state): State<SharedState>,
    payload: Result<Json<LeadInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload?;
    let new = input.validate()?;
    let lead = state.store.create_lead(new).await?;
    Ok((StatusCode::CREATED, Json(LeadResponse { lead })))
}

async fn get_lead(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.store.get_lead(&id).await? {
        Some(lead) => Ok(Json(LeadResponse { lead })),
        None => Err(StoreError::not_found(id).into()),
    }
}

async fn update_lead(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<LeadPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(patch) = payload?;
    let update = patch.validate()?;
    let lead = state.store.update_lead(&id, update).await?;
    tracing::info!(lead_id = %lead.id, stage = %lead.stage, "lead updated");
    Ok(Json(LeadResponse { lead }))
}

async fn delete_lead(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.store.delete_lead(&id).await? {
        return Err(StoreError::not_found(id).into());
    }
    tracing::info!(lead_id = %id, "lead deleted");
    Ok(Json(serde_json::json!({"success": true})))
}

async fn add_note(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<AddNoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let lead = state.store.append_note(&id, req.note).await?;
    Ok(Json(LeadResponse { lead }))
}

async fn get_board(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let leads = state.store.fetch_leads().await?;
    Ok(Json(partition(&leads)))
}

async fn check_db(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let status = state.store.check().await?;
    Ok(Json(status))
}

/// Idempotent: existing leads are kept.
async fn init_db(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    state.store.ensure_schema().await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Base de datos inicializada correctamente"
    })))
}

/// Landing-page quote request: store it as an intake lead, then notify sales.
/// A failed notification does not undo the lead.
async fn submit_contact(
    State(state): State<SharedState>,
    payload: Result<Json<LeadInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload?;
    let new = input.validate()?;
    let lead = state.store.create_lead(new).await?;

    let email = ContactEmail::for_lead(&lead, &state.mail);
    let notified = match state.mailer.send(&email).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(lead_id = %lead.id, error = %e, "contact notification failed");
            false
        }
    };

    Ok(Json(ContactResponse {
        success: true,
        lead_id: lead.id,
        notified,
    }))
}
