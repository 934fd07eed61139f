//! Persistence gateway: the single seam through which every read and write
//! to users, categories, posts, media and leads flows.
//!
//! Two implementations exist, chosen once at start-up: [`PgStorage`] when a
//! database is configured and [`MemStorage`] otherwise. Expected absence is
//! reported with `Option`/`bool`; only infrastructure failures and rule
//! violations surface as [`StoreError`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::time::Duration;

use crate::db::models::{
    BlogCategory, BlogMedia, BlogPost, Lead, LeadStatus, NewBlogCategory, NewBlogMedia,
    NewBlogPost, NewLead, NewUser, PostFilters, UpdateBlogCategory, UpdateBlogMedia,
    UpdateBlogPost, UpdateLead, User,
};

pub use memory::MemStorage;
pub use postgres::PgStorage;

/// Username of the row seeded at start-up and used as the default post author.
pub const ADMIN_USERNAME: &str = "admin";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique column already holds the submitted value.
    #[error("{field} is already in use")]
    Conflict { field: &'static str },

    /// A foreign key points at a row that does not exist.
    #[error("{field} does not reference an existing row")]
    InvalidReference { field: &'static str },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend_tag(&self) -> &'static str;

    async fn health_check(&self) -> Result<Duration, StoreError>;

    // Users
    async fn get_user(&self, id: i32) -> Result<Option<User>, StoreError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    // Categories
    async fn list_categories(&self) -> Result<Vec<BlogCategory>, StoreError>;
    async fn get_category(&self, id: i32) -> Result<Option<BlogCategory>, StoreError>;
    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<BlogCategory>, StoreError>;
    async fn create_category(&self, category: NewBlogCategory) -> Result<BlogCategory, StoreError>;
    async fn update_category(
        &self,
        id: i32,
        changes: UpdateBlogCategory,
    ) -> Result<Option<BlogCategory>, StoreError>;
    /// Posts that referenced the category keep existing with `category_id` cleared.
    async fn delete_category(&self, id: i32) -> Result<bool, StoreError>;

    // Posts
    async fn list_posts(&self, filters: PostFilters) -> Result<Vec<BlogPost>, StoreError>;
    async fn get_post(&self, id: i32) -> Result<Option<BlogPost>, StoreError>;
    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, StoreError>;
    async fn create_post(&self, post: NewBlogPost) -> Result<BlogPost, StoreError>;
    async fn update_post(
        &self,
        id: i32,
        changes: UpdateBlogPost,
    ) -> Result<Option<BlogPost>, StoreError>;
    /// Removes the post's media first, then the post.
    async fn delete_post(&self, id: i32) -> Result<bool, StoreError>;
    async fn increment_view_count(&self, id: i32) -> Result<(), StoreError>;

    // Media
    async fn list_media_for_post(&self, post_id: i32) -> Result<Vec<BlogMedia>, StoreError>;
    async fn get_media(&self, id: i32) -> Result<Option<BlogMedia>, StoreError>;
    async fn create_media(&self, media: NewBlogMedia) -> Result<BlogMedia, StoreError>;
    async fn update_media(
        &self,
        id: i32,
        changes: UpdateBlogMedia,
    ) -> Result<Option<BlogMedia>, StoreError>;
    async fn delete_media(&self, id: i32) -> Result<bool, StoreError>;

    // Leads
    async fn list_leads(&self) -> Result<Vec<Lead>, StoreError>;
    async fn get_lead(&self, id: i32) -> Result<Option<Lead>, StoreError>;
    async fn create_lead(&self, lead: NewLead) -> Result<Lead, StoreError>;
    async fn update_lead(&self, id: i32, changes: UpdateLead) -> Result<Option<Lead>, StoreError>;
    async fn delete_lead(&self, id: i32) -> Result<bool, StoreError>;

    async fn update_lead_status(
        &self,
        id: i32,
        status: LeadStatus,
    ) -> Result<Option<Lead>, StoreError> {
        self.update_lead(
            id,
            UpdateLead {
                status: Some(status),
                notes: None,
            },
        )
        .await
    }
}

/// Inserts the admin user unless one already exists. Duplicate-key races are
/// treated as success.
pub async fn seed_admin_user(store: &dyn Storage, password_hash: String) -> Result<(), StoreError> {
    if store.get_user_by_username(ADMIN_USERNAME).await?.is_some() {
        tracing::debug!("Admin user already present, skipping seed");
        return Ok(());
    }

    match store
        .create_user(NewUser {
            username: ADMIN_USERNAME.to_string(),
            password: password_hash,
            is_admin: true,
        })
        .await
    {
        Ok(user) => {
            tracing::info!(user_id = user.id, "Seeded admin user");
            Ok(())
        }
        Err(StoreError::Conflict { .. }) => Ok(()),
        Err(e) => Err(e),
    }
}
