/**
 * Blog Category Routes
 * Public reads, admin writes
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use super::{not_blank, parse_id, MessageResponse, ValidatedJson};
use crate::db::models::{BlogCategory, NewBlogCategory, UpdateBlogCategory};
use crate::error::ApiError;
use crate::slug::is_valid_slug;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Request body for POST /api/blog/categories
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[validate(
        required(message = "Name is required"),
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom(function = "not_blank", message = "Name is required")
    )]
    pub name: Option<String>,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    #[validate(length(max = 32, message = "Color must be at most 32 characters"))]
    pub color: Option<String>,
}

/// Request body for PATCH/PUT /api/blog/categories/:id
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    #[validate(length(max = 32, message = "Color must be at most 32 characters"))]
    pub color: Option<String>,
}

pub(crate) fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if is_valid_slug(slug) {
        Ok(())
    } else {
        Err(ValidationError::new("slug").with_message(Cow::Borrowed(
            "Slug must contain only lowercase letters, numbers, and hyphens",
        )))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/blog/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<BlogCategory>>, ApiError> {
    Ok(Json(state.store.list_categories().await?))
}

/// GET /api/blog/categories/:id
pub async fn get_category(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<BlogCategory>, ApiError> {
    let id = parse_id(&raw_id, "Category")?;
    state
        .store
        .get_category(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Category"))
}

/// POST /api/blog/categories (admin)
pub async fn create_category(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<BlogCategory>), ApiError> {
    let category = state
        .store
        .create_category(NewBlogCategory {
            name: payload.name.unwrap_or_default(),
            slug: payload.slug,
            description: payload.description,
            color: payload.color,
        })
        .await?;

    tracing::info!(category_id = category.id, slug = %category.slug, "created blog category");
    Ok((StatusCode::CREATED, Json(category)))
}

/// PATCH|PUT /api/blog/categories/:id (admin)
pub async fn update_category(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateCategoryRequest>,
) -> Result<Json<BlogCategory>, ApiError> {
    let id = parse_id(&raw_id, "Category")?;
    state
        .store
        .update_category(
            id,
            UpdateBlogCategory {
                name: payload.name,
                slug: payload.slug,
                description: payload.description,
                color: payload.color,
            },
        )
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Category"))
}

/// DELETE /api/blog/categories/:id (admin)
pub async fn delete_category(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&raw_id, "Category")?;
    if !state.store.delete_category(id).await? {
        return Err(ApiError::NotFound("Category"));
    }
    tracing::info!(category_id = id, "deleted blog category");
    Ok(Json(MessageResponse::new("Category deleted successfully")))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_category_crud_round_trip() {
        let app = test_app().await;

        let (status, created) = admin(
            &app,
            "POST",
            "/api/blog/categories",
            Some(json!({ "name": "Generative AI", "color": "#7c3aed" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["slug"], "generative-ai");
        let id = created["id"].as_i64().unwrap();

        let (status, fetched) = public(&app, "GET", &format!("/api/blog/categories/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Generative AI");

        let (status, updated) = admin(
            &app,
            "PATCH",
            &format!("/api/blog/categories/{id}"),
            Some(json!({ "description": "LLMs and diffusion models" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["description"], "LLMs and diffusion models");
        assert_eq!(updated["color"], "#7c3aed");

        let (status, _) = admin(
            &app,
            "PUT",
            &format!("/api/blog/categories/{id}"),
            Some(json!({ "name": "GenAI" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, list) = public(&app, "GET", "/api/blog/categories", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, body) = admin(&app, "DELETE", &format!("/api/blog/categories/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());

        let (status, _) = public(&app, "GET", &format!("/api/blog/categories/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_category_requires_name() {
        let app = test_app().await;
        let (status, body) = admin(
            &app,
            "POST",
            "/api/blog/categories",
            Some(json!({ "slug": "no-name" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "name");
    }

    #[tokio::test]
    async fn test_duplicate_category_name_is_bad_request() {
        let app = test_app().await;
        let payload = json!({ "name": "Automation" });
        admin(&app, "POST", "/api/blog/categories", Some(payload.clone())).await;
        let (status, body) = admin(&app, "POST", "/api/blog/categories", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "name");
    }

    #[tokio::test]
    async fn test_update_missing_category_is_not_found() {
        let app = test_app().await;
        let (status, _) = admin(
            &app,
            "PATCH",
            "/api/blog/categories/999",
            Some(json!({ "name": "Ghost" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_category_without_credentials_is_unauthorized() {
        let app = test_app().await;
        let (status, body) = public(
            &app,
            "POST",
            "/api/blog/categories",
            Some(json!({ "name": "Sneaky" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized: Admin access required");

        let (_, list) = public(&app, "GET", "/api/blog/categories", None).await;
        assert!(list.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_integer_category_id_is_json_not_found() {
        let app = test_app().await;
        let (status, body) = public(&app, "GET", "/api/blog/categories/abc", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Category not found");

        let (status, body) = admin(&app, "DELETE", "/api/blog/categories/1.5", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Category not found");
    }

    #[tokio::test]
    async fn test_blank_category_name_is_rejected() {
        let app = test_app().await;
        let (status, body) = admin(
            &app,
            "POST",
            "/api/blog/categories",
            Some(json!({ "name": " \t " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "name");
    }
}
