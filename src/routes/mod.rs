/**
 * Routes Module
 * API route handlers and the request/response plumbing they share
 */
pub mod admin;
pub mod blog;
pub mod categories;
pub mod contact;
pub mod health;
pub mod media;
pub mod rss;

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::error::{ApiError, FieldIssue};

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldIssue>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
            details: None,
        }
    }
}

/// `{ "message": ... }` body returned by deletes
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// JSON body extractor that runs `validator` rules before the handler sees
/// the payload. Malformed JSON and rule violations both become a 400.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Numeric id from a path segment. Anything that is not an `i32` cannot
/// name a stored row, so it is reported the same way as a missing one.
pub(crate) fn parse_id(raw: &str, entity: &'static str) -> Result<i32, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound(entity))
}

/// Rejects strings that are empty once surrounding whitespace is removed.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(Cow::Borrowed("must not be blank")));
    }
    Ok(())
}

/// Boolean query flag: only the literal `"true"` is true; any other present value is false.
pub fn parse_flag(raw: Option<&str>) -> Option<bool> {
    raw.map(|value| value == "true")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag_only_accepts_literal_true() {
        assert_eq!(parse_flag(None), None);
        assert_eq!(parse_flag(Some("true")), Some(true));
        assert_eq!(parse_flag(Some("TRUE")), Some(false));
        assert_eq!(parse_flag(Some("1")), Some(false));
        assert_eq!(parse_flag(Some("")), Some(false));
    }

    #[test]
    fn test_parse_id_rejects_non_integers_as_not_found() {
        assert_eq!(parse_id("42", "Lead").unwrap(), 42);
        for raw in ["abc", "99999999999", "1.5", ""] {
            let err = parse_id(raw, "Lead").unwrap_err();
            assert!(matches!(err, ApiError::NotFound("Lead")), "{raw}");
        }
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank("Ada").is_ok());
        assert!(not_blank("  Ada  ").is_ok());
        assert!(not_blank("").is_err());
        assert!(not_blank(" \t\n ").is_err());
    }

    #[test]
    fn test_error_response_omits_empty_fields() {
        let json = serde_json::to_value(ErrorResponse::new("Blog post not found")).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Blog post not found" }));
    }
}
