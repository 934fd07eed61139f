/**
 * Admin Routes
 * Login, session check and lead management
 */
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use super::{parse_id, MessageResponse, ValidatedJson};
use crate::db::models::{Lead, LeadStatus, UpdateLead};
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: Option<String>,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub authenticated: bool,
}

/// Request body for PATCH /api/admin/leads/:id
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLeadRequest {
    #[validate(custom(function = "validate_lead_status"))]
    pub status: Option<String>,
    #[validate(length(max = 5000, message = "Notes must be at most 5000 characters"))]
    pub notes: Option<String>,
}

/// Request body for PATCH /api/admin/leads/:id/status
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLeadStatusRequest {
    #[validate(
        required(message = "status is required"),
        custom(function = "validate_lead_status")
    )]
    pub status: Option<String>,
}

fn validate_lead_status(value: &str) -> Result<(), ValidationError> {
    value.parse::<LeadStatus>().map(|_| ()).map_err(|_| {
        ValidationError::new("lead_status").with_message(Cow::Borrowed(
            "status must be one of: new, contacted, qualified, converted, closed, rejected",
        ))
    })
}

fn parse_status(value: Option<String>) -> Result<Option<LeadStatus>, ApiError> {
    value
        .map(|v| v.parse::<LeadStatus>())
        .transpose()
        .map_err(|e| ApiError::invalid("status", &e.to_string()))
}

// ============================================================================
// Session
// ============================================================================

/// POST /api/admin/login
///
/// Exchanges the admin password for a signed token. A missing or unreadable
/// body is treated as a wrong password.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LoginResponse>), ApiError> {
    let password = payload.ok().and_then(|Json(body)| body.password);

    if !password.is_some_and(|p| state.guard.check_password(&p)) {
        tracing::warn!("admin login failed");
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                success: false,
                message: "Invalid password".to_string(),
                token: None,
            }),
        ));
    }

    let token = state
        .guard
        .issue_token()
        .map_err(|e| ApiError::Internal(format!("failed to sign admin token: {e}")))?;

    tracing::info!("admin logged in");
    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            success: true,
            message: "Login successful".to_string(),
            token: Some(token),
        }),
    ))
}

/// POST /api/admin/check - only reachable with valid credentials
pub async fn check() -> Json<CheckResponse> {
    Json(CheckResponse {
        authenticated: true,
    })
}

// ============================================================================
// Leads
// ============================================================================

/// GET /api/admin/leads
pub async fn list_leads(State(state): State<AppState>) -> Result<Json<Vec<Lead>>, ApiError> {
    Ok(Json(state.store.list_leads().await?))
}

/// GET /api/admin/leads/:id
pub async fn get_lead(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Lead>, ApiError> {
    let id = parse_id(&raw_id, "Lead")?;
    state
        .store
        .get_lead(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Lead"))
}

/// PATCH /api/admin/leads/:id
pub async fn update_lead(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateLeadRequest>,
) -> Result<Json<Lead>, ApiError> {
    let id = parse_id(&raw_id, "Lead")?;
    let changes = UpdateLead {
        status: parse_status(payload.status)?,
        notes: payload.notes,
    };

    let lead = state
        .store
        .update_lead(id, changes)
        .await?
        .ok_or(ApiError::NotFound("Lead"))?;

    tracing::info!(lead_id = lead.id, status = %lead.status, "updated lead");
    Ok(Json(lead))
}

/// PATCH /api/admin/leads/:id/status
pub async fn update_lead_status(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateLeadStatusRequest>,
) -> Result<Json<Lead>, ApiError> {
    let id = parse_id(&raw_id, "Lead")?;
    let status = parse_status(payload.status)?
        .ok_or_else(|| ApiError::invalid("status", "status is required"))?;

    let lead = state
        .store
        .update_lead_status(id, status)
        .await?
        .ok_or(ApiError::NotFound("Lead"))?;

    tracing::info!(lead_id = lead.id, status = %lead.status, "changed lead status");
    Ok(Json(lead))
}

/// DELETE /api/admin/leads/:id
pub async fn delete_lead(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&raw_id, "Lead")?;
    if !state.store.delete_lead(id).await? {
        return Err(ApiError::NotFound("Lead"));
    }
    tracing::info!(lead_id = id, "deleted lead");
    Ok(Json(MessageResponse::new("Lead deleted successfully")))
}
