//! Application configuration loaded from environment variables.

use std::{fmt::Display, str::FromStr};

use crate::db::DbConfig;

/// Top-level settings assembled once at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    /// Presence selects the Postgres gateway; absence selects the in-memory one.
    pub database: Option<DbConfig>,
    pub admin: AdminConfig,
    pub mail: MailConfig,
    pub site: SiteConfig,
    pub allowed_origins: Vec<String>,
}

/// Shared secrets for the admin gate.
#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    pub token: Option<String>,
    pub password: Option<String>,
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
}

/// Outbound lead notification settings.
#[derive(Debug, Clone, Default)]
pub struct MailConfig {
    pub resend_api_key: Option<String>,
    pub from_email: Option<String>,
    pub notification_email: String,
}

/// Public site metadata used by the RSS feed.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub url: String,
    pub title: String,
    pub description: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            title: "Insights Blog".to_string(),
            description: "Articles on applied AI, automation and data strategy".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database = non_empty_var("DATABASE_URL").map(|_| DbConfig::default());

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", 3001),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            database,
            admin: AdminConfig {
                token: non_empty_var("ADMIN_TOKEN"),
                password: non_empty_var("ADMIN_PASSWORD"),
                jwt_secret: non_empty_var("JWT_SECRET"),
                token_ttl_hours: parse_var("ADMIN_TOKEN_TTL_HOURS", 24),
            },
            mail: MailConfig {
                resend_api_key: non_empty_var("RESEND_API_KEY"),
                from_email: non_empty_var("RESEND_FROM_EMAIL"),
                notification_email: std::env::var("LEAD_NOTIFICATION_EMAIL")
                    .unwrap_or_else(|_| "hello@example.com".to_string()),
            },
            site: SiteConfig {
                url: std::env::var("SITE_URL")
                    .unwrap_or_else(|_| SiteConfig::default().url),
                title: std::env::var("SITE_TITLE")
                    .unwrap_or_else(|_| SiteConfig::default().title),
                description: std::env::var("SITE_DESCRIPTION")
                    .unwrap_or_else(|_| SiteConfig::default().description),
            },
            allowed_origins: allowed_origins(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Reads ALLOWED_ORIGINS (comma-separated), then FRONTEND_ORIGIN, then the local dev defaults.
fn allowed_origins() -> Vec<String> {
    let from_list = std::env::var("ALLOWED_ORIGINS").ok().map(|s| split_origins(&s));
    match from_list {
        Some(origins) if !origins.is_empty() => origins,
        _ => non_empty_var("FRONTEND_ORIGIN")
            .map(|origin| vec![origin])
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            }),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn parse_var<T: FromStr>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!("Invalid {key} value {raw:?}: {e}; using default");
            default
        }),
        Err(_) => default,
    }
}
