/**
 * Admin Guard
 * Shared-secret gate in front of the admin routes
 */
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::{config::AdminConfig, error::ApiError, state::AppState};

pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

/// Claims of a token minted by the login route.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Holds the global admin secrets. Every check is a pure function of the
/// request headers; nothing is remembered between requests.
pub struct AdminGuard {
    admin_token: Option<String>,
    admin_password: Option<String>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
}

impl AdminGuard {
    pub fn new(config: &AdminConfig) -> Self {
        let secret = config.jwt_secret.clone().unwrap_or_else(|| {
            tracing::warn!(
                "JWT_SECRET not set; using a random per-process secret. \
                 Issued admin tokens will not survive a restart."
            );
            Alphanumeric.sample_string(&mut rand::rng(), 64)
        });

        Self {
            admin_token: config.token.clone(),
            admin_password: config.password.clone(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl: Duration::hours(config.token_ttl_hours.max(1)),
        }
    }

    /// True if the headers carry any accepted admin credential, checked in order:
    /// static bearer token, issued bearer token, password header.
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        if let Some(token) = extract_bearer_token(headers) {
            if secret_matches(self.admin_token.as_deref(), token) {
                return true;
            }
            if self.verify_token(token).is_ok() {
                return true;
            }
        }

        headers
            .get(ADMIN_PASSWORD_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|password| self.check_password(password))
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        secret_matches(self.admin_password.as_deref(), candidate)
    }

    /// Mint a signed admin token valid for the configured lifetime.
    pub fn issue_token(&self) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = AdminClaims {
            sub: "admin".to_string(),
            jti: Alphanumeric.sample_string(&mut rand::rng(), 24),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
    }

    pub fn verify_token(&self, token: &str) -> Result<AdminClaims, jsonwebtoken::errors::Error> {
        let data = decode::<AdminClaims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}

/// Constant-time equality against a configured secret. An unset or empty
/// secret matches nothing.
fn secret_matches(expected: Option<&str>, candidate: &str) -> bool {
    match expected {
        Some(expected) if !expected.is_empty() => {
            bool::from(expected.as_bytes().ct_eq(candidate.as_bytes()))
        }
        _ => false,
    }
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Route middleware: rejects with 401 before the handler runs.
pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.guard.authorize(request.headers()) {
        tracing::warn!(
            method = %request.method(),
            uri = %request.uri(),
            "rejected admin request without valid credentials"
        );
        return ApiError::Unauthorized.into_response();
    }

    next.run(request).await
}
