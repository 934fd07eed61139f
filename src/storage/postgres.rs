//! Postgres storage backed by a sqlx connection pool.

use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;

use super::{Storage, StoreError};
use crate::db::{
    self,
    models::{
        BlogCategory, BlogMedia, BlogPost, Lead, LeadStatus, MediaType, NewBlogCategory,
        NewBlogMedia, NewBlogPost, NewLead, NewUser, PostFilters, UpdateBlogCategory,
        UpdateBlogMedia, UpdateBlogPost, UpdateLead, User,
    },
};
use crate::slug;

const USER_COLUMNS: &str = "id, username, password, is_admin";

const CATEGORY_COLUMNS: &str = "id, name, slug, description, color, created_at";

const POST_COLUMNS: &str = "id, title, slug, excerpt, content, cover_image, category_id, \
    author_id, published, featured_post, read_time, view_count, tags, meta_title, \
    meta_description, social_image, published_at, created_at, updated_at";

const MEDIA_COLUMNS: &str = "id, blog_post_id, type, url, title, description, alt_text, \
    file_size, mime_type, width, height, created_at";

const LEAD_COLUMNS: &str =
    "id, name, email, business_needs, message, status, notes, created_at, updated_at";

/// Translates named constraint violations into domain errors; everything else
/// stays an infrastructure failure.
fn map_db_error(e: sqlx::Error) -> StoreError {
    let constraint = e.as_database_error().and_then(|db| db.constraint());
    match constraint {
        Some("users_username_key") => StoreError::Conflict { field: "username" },
        Some("blog_categories_name_key") => StoreError::Conflict { field: "name" },
        Some("blog_categories_slug_key") | Some("blog_posts_slug_key") => {
            StoreError::Conflict { field: "slug" }
        }
        Some("blog_posts_category_id_fkey") => StoreError::InvalidReference {
            field: "categoryId",
        },
        Some("blog_posts_author_id_fkey") => StoreError::InvalidReference { field: "authorId" },
        Some("blog_media_blog_post_id_fkey") => StoreError::InvalidReference {
            field: "blogPostId",
        },
        _ => StoreError::Database(e),
    }
}

pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn post_slug_exists(&self, slug: &str) -> Result<bool, StoreError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM blog_posts WHERE slug = $1)")
                .bind(slug)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert_post(&self, post: &NewBlogPost, slug: &str) -> Result<BlogPost, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO blog_posts (
                title, slug, excerpt, content, cover_image, category_id, author_id,
                published, featured_post, read_time, tags, meta_title, meta_description,
                social_image, published_at, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                CASE WHEN $8 THEN now() ELSE NULL END, now(), now()
            )
            RETURNING {POST_COLUMNS}
            "#
        );

        sqlx::query_as::<_, BlogPost>(&sql)
            .bind(&post.title)
            .bind(slug)
            .bind(&post.excerpt)
            .bind(&post.content)
            .bind(&post.cover_image)
            .bind(post.category_id)
            .bind(post.author_id)
            .bind(post.published)
            .bind(post.featured_post)
            .bind(post.read_time)
            .bind(&post.tags)
            .bind(&post.meta_title)
            .bind(&post.meta_description)
            .bind(&post.social_image)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }
}

#[async_trait]
impl Storage for PgStorage {
    fn backend_tag(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> Result<Duration, StoreError> {
        Ok(db::health_check(&self.pool).await?)
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    async fn get_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (username, password, is_admin) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.password)
            .bind(user.is_admin)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    // ------------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------------

    async fn list_categories(&self) -> Result<Vec<BlogCategory>, StoreError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM blog_categories ORDER BY name ASC");
        Ok(sqlx::query_as::<_, BlogCategory>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_category(&self, id: i32) -> Result<Option<BlogCategory>, StoreError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM blog_categories WHERE id = $1");
        Ok(sqlx::query_as::<_, BlogCategory>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<BlogCategory>, StoreError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM blog_categories WHERE slug = $1");
        Ok(sqlx::query_as::<_, BlogCategory>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_category(&self, category: NewBlogCategory) -> Result<BlogCategory, StoreError> {
        let slug = slug::base_slug(category.slug.as_deref(), &category.name, "category");
        let sql = format!(
            r#"
            INSERT INTO blog_categories (name, slug, description, color, created_at)
            VALUES ($1, $2, $3, $4, now())
            RETURNING {CATEGORY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, BlogCategory>(&sql)
            .bind(&category.name)
            .bind(&slug)
            .bind(&category.description)
            .bind(&category.color)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update_category(
        &self,
        id: i32,
        changes: UpdateBlogCategory,
    ) -> Result<Option<BlogCategory>, StoreError> {
        let sql = format!(
            r#"
            UPDATE blog_categories
            SET name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                color = COALESCE($5, color)
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, BlogCategory>(&sql)
            .bind(id)
            .bind(&changes.name)
            .bind(&changes.slug)
            .bind(&changes.description)
            .bind(&changes.color)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn delete_category(&self, id: i32) -> Result<bool, StoreError> {
        // blog_posts.category_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM blog_categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------------

    async fn list_posts(&self, filters: PostFilters) -> Result<Vec<BlogPost>, StoreError> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM blog_posts
            WHERE ($1::bool IS NULL OR published = $1)
              AND ($2::int IS NULL OR category_id = $2)
              AND ($3::bool IS NULL OR featured_post = $3)
            ORDER BY created_at DESC, id DESC
            "#
        );
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(filters.published)
            .bind(filters.category_id)
            .bind(filters.featured)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_post(&self, id: i32) -> Result<Option<BlogPost>, StoreError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE id = $1");
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, StoreError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE slug = $1");
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_post(&self, post: NewBlogPost) -> Result<BlogPost, StoreError> {
        let base = slug::base_slug(post.slug.as_deref(), &post.title, "post");
        let slug = if self.post_slug_exists(&base).await? {
            slug::with_timestamp_suffix(&base)
        } else {
            base.clone()
        };

        // The pre-check races with concurrent inserts; the unique constraint
        // is the real guard, so a clash gets one retry with a fresh suffix.
        match self.insert_post(&post, &slug).await {
            Err(StoreError::Conflict { field: "slug" }) => {
                let retry = slug::unique_slug(&base, |candidate| {
                    candidate == base || candidate == slug
                });
                tracing::debug!(slug = %slug, retry = %retry, "post slug taken during insert");
                self.insert_post(&post, &retry).await
            }
            other => other,
        }
    }

    async fn update_post(
        &self,
        id: i32,
        changes: UpdateBlogPost,
    ) -> Result<Option<BlogPost>, StoreError> {
        let sql = format!(
            r#"
            UPDATE blog_posts
            SET title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                excerpt = COALESCE($4, excerpt),
                content = COALESCE($5, content),
                cover_image = COALESCE($6, cover_image),
                category_id = COALESCE($7, category_id),
                author_id = COALESCE($8, author_id),
                published = COALESCE($9, published),
                featured_post = COALESCE($10, featured_post),
                read_time = COALESCE($11, read_time),
                tags = COALESCE($12, tags),
                meta_title = COALESCE($13, meta_title),
                meta_description = COALESCE($14, meta_description),
                social_image = COALESCE($15, social_image),
                published_at = CASE
                    WHEN COALESCE($9, published) AND published_at IS NULL THEN now()
                    ELSE published_at
                END,
                updated_at = now()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        );

        sqlx::query_as::<_, BlogPost>(&sql)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.slug)
            .bind(&changes.excerpt)
            .bind(&changes.content)
            .bind(&changes.cover_image)
            .bind(changes.category_id)
            .bind(changes.author_id)
            .bind(changes.published)
            .bind(changes.featured_post)
            .bind(changes.read_time)
            .bind(&changes.tags)
            .bind(&changes.meta_title)
            .bind(&changes.meta_description)
            .bind(&changes.social_image)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn delete_post(&self, id: i32) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let removed_media = sqlx::query("DELETE FROM blog_media WHERE blog_post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let removed_post = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            post_id = id,
            media_rows = removed_media.rows_affected(),
            "deleted blog post"
        );
        Ok(removed_post.rows_affected() > 0)
    }

    async fn increment_view_count(&self, id: i32) -> Result<(), StoreError> {
        sqlx::query("UPDATE blog_posts SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Media
    // ------------------------------------------------------------------------

    async fn list_media_for_post(&self, post_id: i32) -> Result<Vec<BlogMedia>, StoreError> {
        let sql = format!(
            "SELECT {MEDIA_COLUMNS} FROM blog_media WHERE blog_post_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        Ok(sqlx::query_as::<_, BlogMedia>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_media(&self, id: i32) -> Result<Option<BlogMedia>, StoreError> {
        let sql = format!("SELECT {MEDIA_COLUMNS} FROM blog_media WHERE id = $1");
        Ok(sqlx::query_as::<_, BlogMedia>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_media(&self, media: NewBlogMedia) -> Result<BlogMedia, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO blog_media (
                blog_post_id, type, url, title, description, alt_text,
                file_size, mime_type, width, height, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now())
            RETURNING {MEDIA_COLUMNS}
            "#
        );
        sqlx::query_as::<_, BlogMedia>(&sql)
            .bind(media.blog_post_id)
            .bind(media.media_type.as_str())
            .bind(&media.url)
            .bind(&media.title)
            .bind(&media.description)
            .bind(&media.alt_text)
            .bind(media.file_size)
            .bind(&media.mime_type)
            .bind(media.width)
            .bind(media.height)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update_media(
        &self,
        id: i32,
        changes: UpdateBlogMedia,
    ) -> Result<Option<BlogMedia>, StoreError> {
        let sql = format!(
            r#"
            UPDATE blog_media
            SET type = COALESCE($2, type),
                url = COALESCE($3, url),
                title = COALESCE($4, title),
                description = COALESCE($5, description),
                alt_text = COALESCE($6, alt_text),
                file_size = COALESCE($7, file_size),
                mime_type = COALESCE($8, mime_type),
                width = COALESCE($9, width),
                height = COALESCE($10, height)
            WHERE id = $1
            RETURNING {MEDIA_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, BlogMedia>(&sql)
            .bind(id)
            .bind(changes.media_type.map(MediaType::as_str))
            .bind(&changes.url)
            .bind(&changes.title)
            .bind(&changes.description)
            .bind(&changes.alt_text)
            .bind(changes.file_size)
            .bind(&changes.mime_type)
            .bind(changes.width)
            .bind(changes.height)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_media(&self, id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM blog_media WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------------
    // Leads
    // ------------------------------------------------------------------------

    async fn list_leads(&self) -> Result<Vec<Lead>, StoreError> {
        let sql = format!("SELECT {LEAD_COLUMNS} FROM leads ORDER BY created_at DESC, id DESC");
        Ok(sqlx::query_as::<_, Lead>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_lead(&self, id: i32) -> Result<Option<Lead>, StoreError> {
        let sql = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1");
        Ok(sqlx::query_as::<_, Lead>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_lead(&self, lead: NewLead) -> Result<Lead, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO leads (name, email, business_needs, message, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, now(), now())
            RETURNING {LEAD_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Lead>(&sql)
            .bind(&lead.name)
            .bind(&lead.email)
            .bind(&lead.business_needs)
            .bind(&lead.message)
            .bind(LeadStatus::New.as_str())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_lead(&self, id: i32, changes: UpdateLead) -> Result<Option<Lead>, StoreError> {
        let sql = format!(
            r#"
            UPDATE leads
            SET status = COALESCE($2, status),
                notes = COALESCE($3, notes),
                updated_at = now()
            WHERE id = $1
            RETURNING {LEAD_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Lead>(&sql)
            .bind(id)
            .bind(changes.status.map(LeadStatus::as_str))
            .bind(&changes.notes)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_lead(&self, id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConfig;
    use crate::storage::{seed_admin_user, ADMIN_USERNAME};

    /// Connects to `DATABASE_URL` and applies migrations; `None` when the
    /// variable is unset so the test can bail out quietly.
    async fn connect() -> Option<PgStorage> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let config = DbConfig {
            url,
            ..DbConfig::default()
        };
        let pool = db::init_pool(&config).await.expect("connect to DATABASE_URL");
        db::run_migrations(&pool).await.expect("run migrations");
        Some(PgStorage::new(pool))
    }

    fn draft(title: &str, author_id: i32) -> NewBlogPost {
        NewBlogPost {
            title: title.to_string(),
            slug: None,
            excerpt: "Excerpt".to_string(),
            content: "Body".to_string(),
            cover_image: None,
            category_id: None,
            author_id,
            published: false,
            featured_post: false,
            read_time: 5,
            tags: vec!["rust".to_string()],
            meta_title: Some("Meta".to_string()),
            meta_description: None,
            social_image: None,
        }
    }

    #[tokio::test]
    #[ignore = "needs a Postgres database in DATABASE_URL"]
    async fn test_post_publish_and_partial_update_sql() {
        let Some(store) = connect().await else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };

        seed_admin_user(&store, "not-a-real-hash".to_string()).await.unwrap();
        let author = store
            .get_user_by_username(ADMIN_USERNAME)
            .await
            .unwrap()
            .expect("seeded admin");

        let title = format!("Pg publish flow {}", chrono::Utc::now().timestamp_micros());
        let post = store.create_post(draft(&title, author.id)).await.unwrap();
        assert!(!post.published);
        assert!(post.published_at.is_none());

        // Only `featured_post` changes; every other column keeps its value.
        let featured = store
            .update_post(
                post.id,
                UpdateBlogPost {
                    featured_post: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(featured.featured_post);
        assert_eq!(featured.title, title);
        assert_eq!(featured.slug, post.slug);
        assert_eq!(featured.tags, vec!["rust".to_string()]);
        assert_eq!(featured.meta_title.as_deref(), Some("Meta"));
        assert!(featured.published_at.is_none());

        let published = store
            .update_post(
                post.id,
                UpdateBlogPost {
                    published: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        let first_published_at = published.published_at.expect("set on first publish");

        let unpublished = store
            .update_post(
                post.id,
                UpdateBlogPost {
                    published: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(!unpublished.published);
        assert_eq!(unpublished.published_at, Some(first_published_at));

        let republished = store
            .update_post(
                post.id,
                UpdateBlogPost {
                    published: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(republished.published_at, Some(first_published_at));

        assert!(store.delete_post(post.id).await.unwrap());
        assert!(store.get_post(post.id).await.unwrap().is_none());
    }
}
