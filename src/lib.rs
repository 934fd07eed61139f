//! Consultancy API - blog, lead capture and admin backend as a library for
//! app logic and testing.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod notify;
pub mod routes;
pub mod slug;
pub mod state;
pub mod storage;

use anyhow::Context;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use rand::distr::{Alphanumeric, SampleString};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::{
    auth::{AdminGuard, ADMIN_PASSWORD_HEADER},
    config::AppConfig,
    routes::{admin, blog, categories, contact, health, media, rss},
    state::AppState,
    storage::{MemStorage, PgStorage, Storage},
};

/// Global request body cap.
const BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Build the CORS layer from the configured origin list. Unparseable
/// origins are skipped.
pub fn configure_cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(ADMIN_PASSWORD_HEADER),
        ])
        .allow_credentials(true)
}

/// Routes reachable without credentials.
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/blog/categories", get(categories::list_categories))
        .route("/api/blog/categories/{id}", get(categories::get_category))
        .route("/api/blog/posts", get(blog::list_posts))
        .route("/api/blog/posts/{key}", get(blog::get_post_by_slug))
        .route("/api/blog/posts/id/{id}", get(blog::get_post_by_id))
        .route(
            "/api/blog/media/by-post/{post_id}",
            get(media::list_media_for_post),
        )
        .route("/api/blog/media/{id}", get(media::get_media))
        .route("/api/blog/rss.xml", get(rss::rss_feed))
        .route("/api/contact", post(contact::submit_contact))
        .route("/api/admin/login", post(admin::login))
        .route("/health", get(health::health_ping))
        .route("/health/database", get(health::health_database))
        .route("/health/ready", get(health::health_ready))
}

/// Routes behind the admin guard. The guard runs as a route layer so
/// unmatched paths still 404 instead of 401.
fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/blog/categories", post(categories::create_category))
        .route(
            "/api/blog/categories/{id}",
            patch(categories::update_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/api/blog/posts", post(blog::create_post))
        .route(
            "/api/blog/posts/{key}",
            put(blog::update_post).delete(blog::delete_post),
        )
        .route("/api/blog/media", post(media::create_media))
        .route(
            "/api/blog/media/{id}",
            patch(media::update_media).delete(media::delete_media),
        )
        .route("/api/admin/check", post(admin::check))
        .route("/api/admin/leads", get(admin::list_leads))
        .route(
            "/api/admin/leads/{id}",
            get(admin::get_lead)
                .patch(admin::update_lead)
                .delete(admin::delete_lead),
        )
        .route(
            "/api/admin/leads/{id}/status",
            patch(admin::update_lead_status),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ))
}

/// Create and configure the application router.
pub fn create_app(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = configure_cors(allowed_origins);

    public_routes()
        .merge(admin_routes(&state))
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(cors)
}

/// Connect to Postgres when configured, otherwise fall back to memory.
/// A configured database that cannot be reached is a start-up error.
async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Storage>> {
    match &config.database {
        Some(db_config) => {
            let pool = db::init_pool(db_config)
                .await
                .context("failed to connect to DATABASE_URL")?;
            db::run_migrations(&pool)
                .await
                .context("failed to run database migrations")?;
            Ok(Arc::new(PgStorage::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set. Using in-memory storage; data is lost on restart.");
            Ok(Arc::new(MemStorage::new()))
        }
    }
}

/// Seed the admin user row that posts default to as author.
async fn seed_admin(store: &dyn Storage, config: &AppConfig) -> anyhow::Result<()> {
    let password = config
        .admin
        .password
        .clone()
        .unwrap_or_else(|| Alphanumeric.sample_string(&mut rand::rng(), 32));
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .context("password hashing task failed")?
        .context("failed to hash admin password")?;

    storage::seed_admin_user(store, hash)
        .await
        .context("failed to seed admin user")
}

/// Run the server (used by main).
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let _log_guards = logging::init();
    health::init_start_time();

    let config = AppConfig::from_env();

    if config.is_production() && config.admin.jwt_secret.is_none() {
        anyhow::bail!("JWT_SECRET must be set in production; refusing to start");
    }
    if config.admin.token.is_none() && config.admin.password.is_none() {
        tracing::warn!(
            "SECURITY: neither ADMIN_TOKEN nor ADMIN_PASSWORD is set. \
             Admin routes will reject every request."
        );
    }

    let store = build_store(&config).await?;
    tracing::info!(backend = store.backend_tag(), "Storage ready");

    if let Err(e) = seed_admin(store.as_ref(), &config).await {
        tracing::error!(error = %format!("{e:#}"), "Admin user seeding failed");
    }

    let state = AppState::new(
        store,
        AdminGuard::new(&config.admin),
        notify::from_config(&config.mail),
        config.site.clone(),
    );
    let app = create_app(state, &config.allowed_origins);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid HOST/PORT: {}:{}", config.host, config.port))?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")
}
