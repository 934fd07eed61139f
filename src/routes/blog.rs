/**
 * Blog Routes
 * CRUD API endpoints for blog posts
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use super::categories::validate_slug;
use super::{not_blank, parse_flag, parse_id, MessageResponse, ValidatedJson};
use crate::db::models::{BlogPost, BlogPostWithMedia, NewBlogPost, PostFilters, UpdateBlogPost};
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::ADMIN_USERNAME;

const DEFAULT_READ_TIME: i32 = 5;

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for GET /api/blog/posts. Kept as raw strings so that
/// odd values filter instead of failing the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListQuery {
    pub published: Option<String>,
    pub category_id: Option<String>,
    pub featured: Option<String>,
}

/// Request body for POST /api/blog/posts
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(
        required(message = "Title is required"),
        length(min = 1, max = 200, message = "Title must be 1-200 characters"),
        custom(function = "not_blank", message = "Title is required")
    )]
    pub title: Option<String>,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[validate(
        required(message = "Excerpt is required"),
        length(min = 1, max = 1000, message = "Excerpt must be 1-1000 characters")
    )]
    pub excerpt: Option<String>,
    #[validate(
        required(message = "Content is required"),
        length(min = 1, message = "Content must not be empty")
    )]
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub category_id: Option<i32>,
    pub author_id: Option<i32>,
    pub published: Option<bool>,
    pub featured_post: Option<bool>,
    #[validate(range(min = 1, max = 600, message = "Read time must be between 1 and 600 minutes"))]
    pub read_time: Option<i32>,
    #[validate(length(max = 20, message = "At most 20 tags are allowed"))]
    pub tags: Option<Vec<String>>,
    #[validate(length(max = 200, message = "Meta title must be at most 200 characters"))]
    pub meta_title: Option<String>,
    #[validate(length(max = 500, message = "Meta description must be at most 500 characters"))]
    pub meta_description: Option<String>,
    pub social_image: Option<String>,
}

/// Request body for PUT /api/blog/posts/:id. Absent fields stay unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[validate(
        length(min = 1, max = 200, message = "Title must be 1-200 characters"),
        custom(function = "not_blank", message = "Title is required")
    )]
    pub title: Option<String>,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[validate(length(min = 1, max = 1000, message = "Excerpt must be 1-1000 characters"))]
    pub excerpt: Option<String>,
    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub category_id: Option<i32>,
    pub author_id: Option<i32>,
    pub published: Option<bool>,
    pub featured_post: Option<bool>,
    #[validate(range(min = 1, max = 600, message = "Read time must be between 1 and 600 minutes"))]
    pub read_time: Option<i32>,
    #[validate(length(max = 20, message = "At most 20 tags are allowed"))]
    pub tags: Option<Vec<String>>,
    #[validate(length(max = 200, message = "Meta title must be at most 200 characters"))]
    pub meta_title: Option<String>,
    #[validate(length(max = 500, message = "Meta description must be at most 500 characters"))]
    pub meta_description: Option<String>,
    pub social_image: Option<String>,
}

impl From<UpdatePostRequest> for UpdateBlogPost {
    fn from(req: UpdatePostRequest) -> Self {
        Self {
            title: req.title,
            slug: req.slug,
            excerpt: req.excerpt,
            content: req.content,
            cover_image: req.cover_image,
            category_id: req.category_id,
            author_id: req.author_id,
            published: req.published,
            featured_post: req.featured_post,
            read_time: req.read_time,
            tags: req.tags,
            meta_title: req.meta_title,
            meta_description: req.meta_description,
            social_image: req.social_image,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn filters_from_query(query: &PostListQuery) -> Option<PostFilters> {
    let category_id = match query.category_id.as_deref() {
        None => None,
        Some(raw) => Some(raw.trim().parse::<i32>().ok()?),
    };

    Some(PostFilters {
        published: parse_flag(query.published.as_deref()),
        category_id,
        featured: parse_flag(query.featured.as_deref()),
    })
}

async fn with_media(state: &AppState, post: BlogPost) -> Result<BlogPostWithMedia, ApiError> {
    let media = state.store.list_media_for_post(post.id).await?;
    Ok(BlogPostWithMedia { post, media })
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/blog/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    let Some(filters) = filters_from_query(&query) else {
        tracing::debug!(category_id = ?query.category_id, "unparseable categoryId, no post matches");
        return Ok(Json(Vec::new()));
    };

    Ok(Json(state.store.list_posts(filters).await?))
}

/// GET /api/blog/posts/:slug - counts as a view
pub async fn get_post_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPostWithMedia>, ApiError> {
    let post = state
        .store
        .get_post_by_slug(&slug)
        .await?
        .ok_or(ApiError::NotFound("Blog post"))?;

    if let Err(e) = state.store.increment_view_count(post.id).await {
        tracing::warn!(post_id = post.id, error = %e, "failed to increment view count");
    }

    Ok(Json(with_media(&state, post).await?))
}

/// GET /api/blog/posts/id/:id - admin editor lookup, no view counted
pub async fn get_post_by_id(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<BlogPostWithMedia>, ApiError> {
    let id = parse_id(&raw_id, "Blog post")?;
    let post = state
        .store
        .get_post(id)
        .await?
        .ok_or(ApiError::NotFound("Blog post"))?;

    Ok(Json(with_media(&state, post).await?))
}

/// POST /api/blog/posts (admin)
pub async fn create_post(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<BlogPost>), ApiError> {
    let author_id = match payload.author_id {
        Some(id) => id,
        None => {
            state
                .store
                .get_user_by_username(ADMIN_USERNAME)
                .await?
                .ok_or_else(|| ApiError::invalid("authorId", "authorId is required"))?
                .id
        }
    };

    let post = state
        .store
        .create_post(NewBlogPost {
            title: payload.title.unwrap_or_default(),
            slug: payload.slug,
            excerpt: payload.excerpt.unwrap_or_default(),
            content: payload.content.unwrap_or_default(),
            cover_image: payload.cover_image,
            category_id: payload.category_id,
            author_id,
            published: payload.published.unwrap_or(false),
            featured_post: payload.featured_post.unwrap_or(false),
            read_time: payload.read_time.unwrap_or(DEFAULT_READ_TIME),
            tags: payload.tags.unwrap_or_default(),
            meta_title: payload.meta_title,
            meta_description: payload.meta_description,
            social_image: payload.social_image,
        })
        .await?;

    tracing::info!(post_id = post.id, slug = %post.slug, published = post.published, "created blog post");
    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/blog/posts/:id (admin)
pub async fn update_post(
    State(state): State<AppState>,
    Path(key): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdatePostRequest>,
) -> Result<Json<BlogPost>, ApiError> {
    let id = parse_id(&key, "Blog post")?;
    let post = state
        .store
        .update_post(id, payload.into())
        .await?
        .ok_or(ApiError::NotFound("Blog post"))?;

    tracing::info!(post_id = post.id, slug = %post.slug, "updated blog post");
    Ok(Json(post))
}

/// DELETE /api/blog/posts/:id (admin) - media goes with it
pub async fn delete_post(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&key, "Blog post")?;
    if !state.store.delete_post(id).await? {
        return Err(ApiError::NotFound("Blog post"));
    }

    tracing::info!(post_id = id, "deleted blog post");
    Ok(Json(MessageResponse::new("Blog post deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::*;
    use serde_json::{json, Value};

    fn post_body(title: &str) -> Value {
        json!({
            "title": title,
            "excerpt": "Short summary",
            "content": "Long form body",
        })
    }

    async fn create(app: &axum::Router, body: Value) -> Value {
        let (status, post) = admin(app, "POST", "/api/blog/posts", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "unexpected body: {post}");
        post
    }

    #[test]
    fn test_filters_from_query() {
        let query = PostListQuery {
            published: Some("true".to_string()),
            category_id: Some("7".to_string()),
            featured: Some("yes".to_string()),
        };
        assert_eq!(
            filters_from_query(&query),
            Some(PostFilters {
                published: Some(true),
                category_id: Some(7),
                featured: Some(false),
            })
        );

        let bad = PostListQuery {
            category_id: Some("seven".to_string()),
            ..Default::default()
        };
        assert_eq!(filters_from_query(&bad), None);
        assert_eq!(filters_from_query(&PostListQuery::default()), Some(PostFilters::default()));
    }

    #[tokio::test]
    async fn test_create_post_applies_defaults() {
        let app = test_app().await;
        let post = create(&app, post_body("Hello World")).await;

        assert_eq!(post["slug"], "hello-world");
        assert_eq!(post["published"], false);
        assert_eq!(post["featuredPost"], false);
        assert_eq!(post["readTime"], 5);
        assert_eq!(post["viewCount"], 0);
        assert_eq!(post["tags"], json!([]));
        assert!(post["publishedAt"].is_null());
        assert!(post["authorId"].is_number());
    }

    #[tokio::test]
    async fn test_duplicate_title_gets_distinct_slug() {
        let app = test_app().await;
        let first = create(&app, post_body("Hello World")).await;
        let second = create(&app, post_body("Hello World")).await;

        assert_eq!(first["slug"], "hello-world");
        let second_slug = second["slug"].as_str().unwrap();
        assert_ne!(second_slug, "hello-world");
        assert!(second_slug.starts_with("hello-world-"));
    }

    #[tokio::test]
    async fn test_create_post_reports_missing_fields() {
        let app = test_app().await;
        let (status, body) = admin(&app, "POST", "/api/blog/posts", Some(json!({ "title": "Only a title" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation failed");
        let fields: Vec<&str> = body["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["content", "excerpt"]);

        let (_, list) = public(&app, "GET", "/api/blog/posts", None).await;
        assert!(list.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_post_rejects_bad_slug_and_unknown_category() {
        let app = test_app().await;

        let mut body = post_body("Bad slug");
        body["slug"] = json!("Not A Slug");
        let (status, res) = admin(&app, "POST", "/api/blog/posts", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(res["details"][0]["field"], "slug");

        let mut body = post_body("Orphan");
        body["categoryId"] = json!(4242);
        let (status, res) = admin(&app, "POST", "/api/blog/posts", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(res["details"][0]["field"], "categoryId");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = test_app().await;
        let (status, body) = admin(&app, "POST", "/api/blog/posts", Some(json!(["not", "an", "object"]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "body");
    }

    #[tokio::test]
    async fn test_publish_transition_sets_published_at_once() {
        let app = test_app().await;
        let post = create(&app, post_body("Draft")).await;
        let id = post["id"].as_i64().unwrap();

        let (status, published) = admin(
            &app,
            "PUT",
            &format!("/api/blog/posts/{id}"),
            Some(json!({ "published": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let first_published_at = published["publishedAt"].clone();
        assert!(first_published_at.is_string());

        let (_, edited) = admin(
            &app,
            "PUT",
            &format!("/api/blog/posts/{id}"),
            Some(json!({ "title": "Draft, revised" })),
        )
        .await;
        assert_eq!(edited["publishedAt"], first_published_at);
        assert_eq!(edited["title"], "Draft, revised");
        assert_eq!(edited["slug"], "draft");

        let (_, unpublished) = admin(
            &app,
            "PUT",
            &format!("/api/blog/posts/{id}"),
            Some(json!({ "published": false })),
        )
        .await;
        assert_eq!(unpublished["published"], false);
        assert_eq!(unpublished["publishedAt"], first_published_at);

        let (_, republished) = admin(
            &app,
            "PUT",
            &format!("/api/blog/posts/{id}"),
            Some(json!({ "published": true })),
        )
        .await;
        assert_eq!(republished["publishedAt"], first_published_at);
    }

    #[tokio::test]
    async fn test_slug_route_counts_views_and_id_route_does_not() {
        let app = test_app().await;
        let mut body = post_body("Counted");
        body["published"] = json!(true);
        let post = create(&app, body).await;
        let id = post["id"].as_i64().unwrap();

        for _ in 0..3 {
            let (status, fetched) = public(&app, "GET", "/api/blog/posts/counted", None).await;
            assert_eq!(status, StatusCode::OK);
            assert!(fetched["media"].is_array());
        }

        for _ in 0..2 {
            let (status, fetched) = public(&app, "GET", &format!("/api/blog/posts/id/{id}"), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(fetched["viewCount"], 3);
        }
    }

    #[tokio::test]
    async fn test_unknown_post_is_not_found() {
        let app = test_app().await;
        let (status, body) = public(&app, "GET", "/api/blog/posts/does-not-exist", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Blog post not found");

        let (status, _) = public(&app, "GET", "/api/blog/posts/id/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = admin(&app, "PUT", "/api/blog/posts/999", Some(json!({ "title": "x" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = admin(&app, "DELETE", "/api/blog/posts/not-a-number", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_filters_compose() {
        let app = test_app().await;
        let (_, category) = admin(
            &app,
            "POST",
            "/api/blog/categories",
            Some(json!({ "name": "Automation" })),
        )
        .await;
        let category_id = category["id"].as_i64().unwrap();

        let mut a = post_body("Published featured in category");
        a["published"] = json!(true);
        a["featuredPost"] = json!(true);
        a["categoryId"] = json!(category_id);
        create(&app, a).await;

        let mut b = post_body("Published plain");
        b["published"] = json!(true);
        create(&app, b).await;

        create(&app, post_body("Draft")).await;

        let count = |value: &Value| value.as_array().unwrap().len();

        let (_, all) = public(&app, "GET", "/api/blog/posts", None).await;
        assert_eq!(count(&all), 3);
        assert_eq!(all[0]["title"], "Draft");

        let (_, published) = public(&app, "GET", "/api/blog/posts?published=true", None).await;
        assert_eq!(count(&published), 2);

        let (_, drafts) = public(&app, "GET", "/api/blog/posts?published=nope", None).await;
        assert_eq!(count(&drafts), 1);

        let (_, combined) = public(
            &app,
            "GET",
            &format!("/api/blog/posts?published=true&featured=true&categoryId={category_id}"),
            None,
        )
        .await;
        assert_eq!(count(&combined), 1);

        let (status, none) = public(&app, "GET", "/api/blog/posts?categoryId=abc", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(count(&none), 0);
    }

    #[tokio::test]
    async fn test_unauthenticated_delete_leaves_post_intact() {
        let app = test_app().await;
        let post = create(&app, post_body("Keep me")).await;
        let id = post["id"].as_i64().unwrap();

        let (status, _) = send(&app, "DELETE", &format!("/api/blog/posts/{id}"), Cred::Password("wrong"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = public(&app, "GET", &format!("/api/blog/posts/id/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_delete_post_cascades_media() {
        let app = test_app().await;
        let post = create(&app, post_body("With media")).await;
        let id = post["id"].as_i64().unwrap();

        let (status, media) = admin(
            &app,
            "POST",
            "/api/blog/media",
            Some(json!({ "blogPostId": id, "type": "image", "url": "https://cdn.example.com/a.png" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let media_id = media["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "DELETE",
            &format!("/api/blog/posts/{id}"),
            Cred::Password(ADMIN_PASSWORD),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Blog post deleted successfully");

        let (status, _) = public(&app, "GET", &format!("/api/blog/media/{media_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, listed) = public(&app, "GET", &format!("/api/blog/media/by-post/{id}"), None).await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn test_id_lookup_with_non_integer_id_is_json_not_found() {
        let app = test_app().await;
        for uri in ["/api/blog/posts/id/abc", "/api/blog/posts/id/99999999999"] {
            let (status, body) = public(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["error"], "Blog post not found", "{uri}");
        }
    }

    #[tokio::test]
    async fn test_create_post_rejects_blank_title() {
        let app = test_app().await;
        let (status, body) = admin(&app, "POST", "/api/blog/posts", Some(post_body("   "))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "title");
        assert_eq!(body["details"][0]["message"], "Title is required");
    }
}
