/**
 * Contact Route
 * Public form that turns a visitor into a lead
 */
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use super::{not_blank, ValidatedJson};
use crate::db::models::NewLead;
use crate::error::ApiError;
use crate::notify::LeadNotification;
use crate::state::AppState;

/// Upper bound on how long the response waits for the lead email.
#[cfg(not(test))]
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(test)]
const NOTIFY_TIMEOUT: Duration = Duration::from_millis(50);

/// Request body for POST /api/contact
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    #[validate(
        required(message = "Name is required"),
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom(function = "not_blank", message = "Name is required")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "Email is required"),
        email(message = "Invalid email address")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "Business needs are required"),
        length(min = 1, max = 2000, message = "Business needs must be 1-2000 characters"),
        custom(function = "not_blank", message = "Business needs are required")
    )]
    pub business_needs: Option<String>,
    #[validate(length(max = 5000, message = "Message must be at most 5000 characters"))]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/contact
///
/// The lead is stored before the notification is attempted. A failed or
/// slow email is logged and does not change the response.
pub async fn submit_contact(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ContactRequest>,
) -> Result<Json<ContactResponse>, ApiError> {
    let lead = state
        .store
        .create_lead(NewLead {
            name: payload.name.unwrap_or_default().trim().to_string(),
            email: payload.email.unwrap_or_default().trim().to_string(),
            business_needs: payload.business_needs.unwrap_or_default(),
            message: payload.message.filter(|m| !m.trim().is_empty()),
        })
        .await?;

    tracing::info!(lead_id = lead.id, "new lead captured from contact form");

    let notification = LeadNotification::from(&lead);
    match tokio::time::timeout(NOTIFY_TIMEOUT, state.notifier.notify_new_lead(&notification)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(lead_id = lead.id, error = %e, "failed to send lead notification");
        }
        Err(_) => {
            tracing::error!(
                lead_id = lead.id,
                timeout_ms = NOTIFY_TIMEOUT.as_millis() as u64,
                "lead notification timed out"
            );
        }
    }

    Ok(Json(ContactResponse {
        success: true,
        message: "Thank you for reaching out! We'll get back to you shortly.".to_string(),
    }))
}
