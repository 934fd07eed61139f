//! HTTP-facing error type. Every handler returns `Result<_, ApiError>`, so
//! this is the single place that decides status codes and error bodies.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use crate::routes::ErrorResponse;
use crate::storage::StoreError;

/// One violated field in a rejected request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldIssue>),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid(field: &str, message: &str) -> Self {
        ApiError::Validation(vec![FieldIssue::new(field, message)])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::Validation(details) => ErrorResponse {
                error: "Validation failed".to_string(),
                message: None,
                details: Some(details),
            },
            ApiError::NotFound(entity) => ErrorResponse::new(format!("{} not found", entity)),
            ApiError::Unauthorized => ErrorResponse::new("Unauthorized: Admin access required"),
            ApiError::Internal(cause) => {
                // Never expose the cause to clients
                tracing::error!(error = %cause, "request failed with internal error");
                ErrorResponse::new("Internal server error")
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { field } => {
                ApiError::Validation(vec![FieldIssue::new(field, format!("{field} is already in use"))])
            }
            StoreError::InvalidReference { field } => ApiError::Validation(vec![FieldIssue::new(
                field,
                format!("{field} does not reference an existing record"),
            )]),
            StoreError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

/// JSON key a client sent for a request struct field. Request types are
/// `camelCase` on the wire; `media_type` is the one field renamed outright.
fn wire_field_name(field: &str) -> String {
    if field == "media_type" {
        return "type".to_string();
    }

    let mut name = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            name.extend(c.to_uppercase());
            upper_next = false;
        } else {
            name.push(c);
        }
    }
    name
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details: Vec<FieldIssue> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = wire_field_name(&field);
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid ({})", e.code));
                    FieldIssue::new(field.clone(), message)
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::Validation(details)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid("body", &rejection.body_text())
    }
}
