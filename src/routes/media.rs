/**
 * Blog Media Routes
 * Images, videos and documents attached to a post
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use super::{parse_id, MessageResponse, ValidatedJson};
use crate::db::models::{BlogMedia, MediaType, NewBlogMedia, UpdateBlogMedia};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /api/blog/media
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMediaRequest {
    #[validate(required(message = "blogPostId is required"))]
    pub blog_post_id: Option<i32>,
    #[serde(rename = "type")]
    #[validate(
        required(message = "type is required"),
        custom(function = "validate_media_type")
    )]
    pub media_type: Option<String>,
    #[validate(
        required(message = "url is required"),
        length(min = 1, max = 2048, message = "url must be 1-2048 characters")
    )]
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub alt_text: Option<String>,
    #[validate(range(min = 0, message = "fileSize must not be negative"))]
    pub file_size: Option<i32>,
    pub mime_type: Option<String>,
    #[validate(range(min = 0, message = "width must not be negative"))]
    pub width: Option<i32>,
    #[validate(range(min = 0, message = "height must not be negative"))]
    pub height: Option<i32>,
}

/// Request body for PATCH /api/blog/media/:id
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMediaRequest {
    #[serde(rename = "type")]
    #[validate(custom(function = "validate_media_type"))]
    pub media_type: Option<String>,
    #[validate(length(min = 1, max = 2048, message = "url must be 1-2048 characters"))]
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub alt_text: Option<String>,
    #[validate(range(min = 0, message = "fileSize must not be negative"))]
    pub file_size: Option<i32>,
    pub mime_type: Option<String>,
    #[validate(range(min = 0, message = "width must not be negative"))]
    pub width: Option<i32>,
    #[validate(range(min = 0, message = "height must not be negative"))]
    pub height: Option<i32>,
}

fn validate_media_type(value: &str) -> Result<(), ValidationError> {
    value.parse::<MediaType>().map(|_| ()).map_err(|_| {
        ValidationError::new("media_type")
            .with_message(Cow::Borrowed("type must be one of: image, video, document"))
    })
}

fn parse_media_type(value: Option<String>) -> Result<Option<MediaType>, ApiError> {
    value
        .map(|v| v.parse::<MediaType>())
        .transpose()
        .map_err(|e| ApiError::invalid("type", &e.to_string()))
}

/// GET /api/blog/media/by-post/:postId
pub async fn list_media_for_post(
    State(state): State<AppState>,
    Path(raw_post_id): Path<String>,
) -> Result<Json<Vec<BlogMedia>>, ApiError> {
    let post_id = parse_id(&raw_post_id, "Blog post")?;
    Ok(Json(state.store.list_media_for_post(post_id).await?))
}

/// GET /api/blog/media/:id
pub async fn get_media(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<BlogMedia>, ApiError> {
    let id = parse_id(&raw_id, "Media")?;
    state
        .store
        .get_media(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Media"))
}

/// POST /api/blog/media (admin)
pub async fn create_media(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateMediaRequest>,
) -> Result<(StatusCode, Json<BlogMedia>), ApiError> {
    let media_type = parse_media_type(payload.media_type)?
        .ok_or_else(|| ApiError::invalid("type", "type is required"))?;
    let blog_post_id = payload
        .blog_post_id
        .ok_or_else(|| ApiError::invalid("blogPostId", "blogPostId is required"))?;

    let media = state
        .store
        .create_media(NewBlogMedia {
            blog_post_id,
            media_type,
            url: payload.url.unwrap_or_default(),
            title: payload.title,
            description: payload.description,
            alt_text: payload.alt_text,
            file_size: payload.file_size,
            mime_type: payload.mime_type,
            width: payload.width,
            height: payload.height,
        })
        .await?;

    tracing::info!(media_id = media.id, post_id = blog_post_id, kind = %media.media_type, "attached media");
    Ok((StatusCode::CREATED, Json(media)))
}

/// PATCH /api/blog/media/:id (admin)
pub async fn update_media(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateMediaRequest>,
) -> Result<Json<BlogMedia>, ApiError> {
    let id = parse_id(&raw_id, "Media")?;
    let changes = UpdateBlogMedia {
        media_type: parse_media_type(payload.media_type)?,
        url: payload.url,
        title: payload.title,
        description: payload.description,
        alt_text: payload.alt_text,
        file_size: payload.file_size,
        mime_type: payload.mime_type,
        width: payload.width,
        height: payload.height,
    };

    state
        .store
        .update_media(id, changes)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Media"))
}

/// DELETE /api/blog/media/:id (admin)
pub async fn delete_media(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&raw_id, "Media")?;
    if !state.store.delete_media(id).await? {
        return Err(ApiError::NotFound("Media"));
    }
    Ok(Json(MessageResponse::new("Media deleted successfully")))
}
