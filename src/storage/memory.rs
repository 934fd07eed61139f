//! In-memory storage used when no database is configured, and by the tests.

use async_trait::async_trait;
use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{Storage, StoreError};
use crate::db::models::{
    BlogCategory, BlogMedia, BlogPost, Lead, LeadStatus, NewBlogCategory, NewBlogMedia,
    NewBlogPost, NewLead, NewUser, PostFilters, UpdateBlogCategory, UpdateBlogMedia,
    UpdateBlogPost, UpdateLead, User,
};
use crate::slug;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<BlogCategory>,
    posts: Vec<BlogPost>,
    media: Vec<BlogMedia>,
    leads: Vec<Lead>,
    next_id: i32,
}

impl Tables {
    /// Ids are shared across tables; uniqueness per table is all callers rely on.
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn post_slug_taken(&self, slug: &str, except: Option<i32>) -> bool {
        self.posts
            .iter()
            .any(|p| p.slug == slug && Some(p.id) != except)
    }

    fn check_category_unique(
        &self,
        name: &str,
        slug: &str,
        except: Option<i32>,
    ) -> Result<(), StoreError> {
        let others = || self.categories.iter().filter(move |c| Some(c.id) != except);
        if others().any(|c| c.name == name) {
            return Err(StoreError::Conflict { field: "name" });
        }
        if others().any(|c| c.slug == slug) {
            return Err(StoreError::Conflict { field: "slug" });
        }
        Ok(())
    }

    fn check_post_references(
        &self,
        category_id: Option<i32>,
        author_id: Option<i32>,
    ) -> Result<(), StoreError> {
        if let Some(category_id) = category_id {
            if !self.categories.iter().any(|c| c.id == category_id) {
                return Err(StoreError::InvalidReference { field: "categoryId" });
            }
        }
        if let Some(author_id) = author_id {
            if !self.users.iter().any(|u| u.id == author_id) {
                return Err(StoreError::InvalidReference { field: "authorId" });
            }
        }
        Ok(())
    }
}

/// Process-local storage behind a single lock. Contents vanish on restart.
#[derive(Default)]
pub struct MemStorage {
    tables: RwLock<Tables>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemStorage {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<Duration, StoreError> {
        let start = Instant::now();
        drop(self.tables.read().await);
        Ok(start.elapsed())
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    async fn get_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict { field: "username" });
        }
        let user = User {
            id: tables.next_id(),
            username: user.username,
            password: user.password,
            is_admin: user.is_admin,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    // ------------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------------

    async fn list_categories(&self) -> Result<Vec<BlogCategory>, StoreError> {
        let tables = self.tables.read().await;
        let mut categories = tables.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: i32) -> Result<Option<BlogCategory>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<BlogCategory>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn create_category(&self, category: NewBlogCategory) -> Result<BlogCategory, StoreError> {
        let mut tables = self.tables.write().await;
        let slug = slug::base_slug(category.slug.as_deref(), &category.name, "category");
        tables.check_category_unique(&category.name, &slug, None)?;

        let category = BlogCategory {
            id: tables.next_id(),
            name: category.name,
            slug,
            description: category.description,
            color: category.color,
            created_at: Utc::now(),
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: i32,
        changes: UpdateBlogCategory,
    ) -> Result<Option<BlogCategory>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.categories.iter().find(|c| c.id == id).cloned() else {
            return Ok(None);
        };

        let name = changes.name.unwrap_or(existing.name);
        let slug = changes.slug.unwrap_or(existing.slug);
        tables.check_category_unique(&name, &slug, Some(id))?;

        let Some(category) = tables.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        category.name = name;
        category.slug = slug;
        category.description = changes.description.or(category.description.take());
        category.color = changes.color.or(category.color.take());
        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, id: i32) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        if tables.categories.len() == before {
            return Ok(false);
        }
        for post in tables.posts.iter_mut().filter(|p| p.category_id == Some(id)) {
            post.category_id = None;
        }
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------------

    async fn list_posts(&self, filters: PostFilters) -> Result<Vec<BlogPost>, StoreError> {
        let tables = self.tables.read().await;
        let mut posts: Vec<BlogPost> = tables
            .posts
            .iter()
            .filter(|p| filters.matches(p))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    async fn get_post(&self, id: i32) -> Result<Option<BlogPost>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn create_post(&self, post: NewBlogPost) -> Result<BlogPost, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_post_references(post.category_id, Some(post.author_id))?;

        let base = slug::base_slug(post.slug.as_deref(), &post.title, "post");
        let slug = slug::unique_slug(&base, |candidate| tables.post_slug_taken(candidate, None));

        let now = Utc::now();
        let post = BlogPost {
            id: tables.next_id(),
            title: post.title,
            slug,
            excerpt: post.excerpt,
            content: post.content,
            cover_image: post.cover_image,
            category_id: post.category_id,
            author_id: post.author_id,
            published: post.published,
            featured_post: post.featured_post,
            read_time: post.read_time,
            view_count: 0,
            tags: post.tags,
            meta_title: post.meta_title,
            meta_description: post.meta_description,
            social_image: post.social_image,
            published_at: post.published.then_some(now),
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(
        &self,
        id: i32,
        changes: UpdateBlogPost,
    ) -> Result<Option<BlogPost>, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == id) {
            return Ok(None);
        }
        if let Some(slug) = changes.slug.as_deref() {
            if tables.post_slug_taken(slug, Some(id)) {
                return Err(StoreError::Conflict { field: "slug" });
            }
        }
        tables.check_post_references(changes.category_id, changes.author_id)?;

        let Some(post) = tables.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        let now = Utc::now();

        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(slug) = changes.slug {
            post.slug = slug;
        }
        if let Some(excerpt) = changes.excerpt {
            post.excerpt = excerpt;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        post.cover_image = changes.cover_image.or(post.cover_image.take());
        post.category_id = changes.category_id.or(post.category_id);
        if let Some(author_id) = changes.author_id {
            post.author_id = author_id;
        }
        if let Some(published) = changes.published {
            post.published = published;
            if published && post.published_at.is_none() {
                post.published_at = Some(now);
            }
        }
        if let Some(featured) = changes.featured_post {
            post.featured_post = featured;
        }
        if let Some(read_time) = changes.read_time {
            post.read_time = read_time;
        }
        if let Some(tags) = changes.tags {
            post.tags = tags;
        }
        post.meta_title = changes.meta_title.or(post.meta_title.take());
        post.meta_description = changes.meta_description.or(post.meta_description.take());
        post.social_image = changes.social_image.or(post.social_image.take());
        post.updated_at = now;

        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: i32) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == id) {
            return Ok(false);
        }
        tables.media.retain(|m| m.blog_post_id != id);
        tables.posts.retain(|p| p.id != id);
        Ok(true)
    }

    async fn increment_view_count(&self, id: i32) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(post) = tables.posts.iter_mut().find(|p| p.id == id) {
            post.view_count += 1;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Media
    // ------------------------------------------------------------------------

    async fn list_media_for_post(&self, post_id: i32) -> Result<Vec<BlogMedia>, StoreError> {
        let tables = self.tables.read().await;
        let mut media: Vec<BlogMedia> = tables
            .media
            .iter()
            .filter(|m| m.blog_post_id == post_id)
            .cloned()
            .collect();
        media.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(media)
    }

    async fn get_media(&self, id: i32) -> Result<Option<BlogMedia>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.media.iter().find(|m| m.id == id).cloned())
    }

    async fn create_media(&self, media: NewBlogMedia) -> Result<BlogMedia, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == media.blog_post_id) {
            return Err(StoreError::InvalidReference { field: "blogPostId" });
        }
        let media = BlogMedia {
            id: tables.next_id(),
            blog_post_id: media.blog_post_id,
            media_type: media.media_type,
            url: media.url,
            title: media.title,
            description: media.description,
            alt_text: media.alt_text,
            file_size: media.file_size,
            mime_type: media.mime_type,
            width: media.width,
            height: media.height,
            created_at: Utc::now(),
        };
        tables.media.push(media.clone());
        Ok(media)
    }

    async fn update_media(
        &self,
        id: i32,
        changes: UpdateBlogMedia,
    ) -> Result<Option<BlogMedia>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(media) = tables.media.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        if let Some(media_type) = changes.media_type {
            media.media_type = media_type;
        }
        if let Some(url) = changes.url {
            media.url = url;
        }
        media.title = changes.title.or(media.title.take());
        media.description = changes.description.or(media.description.take());
        media.alt_text = changes.alt_text.or(media.alt_text.take());
        media.file_size = changes.file_size.or(media.file_size);
        media.mime_type = changes.mime_type.or(media.mime_type.take());
        media.width = changes.width.or(media.width);
        media.height = changes.height.or(media.height);
        Ok(Some(media.clone()))
    }

    async fn delete_media(&self, id: i32) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.media.len();
        tables.media.retain(|m| m.id != id);
        Ok(tables.media.len() != before)
    }

    // ------------------------------------------------------------------------
    // Leads
    // ------------------------------------------------------------------------

    async fn list_leads(&self) -> Result<Vec<Lead>, StoreError> {
        let tables = self.tables.read().await;
        let mut leads = tables.leads.clone();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(leads)
    }

    async fn get_lead(&self, id: i32) -> Result<Option<Lead>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.leads.iter().find(|l| l.id == id).cloned())
    }

    async fn create_lead(&self, lead: NewLead) -> Result<Lead, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let lead = Lead {
            id: tables.next_id(),
            name: lead.name,
            email: lead.email,
            business_needs: lead.business_needs,
            message: lead.message,
            status: LeadStatus::New,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        tables.leads.push(lead.clone());
        Ok(lead)
    }

    async fn update_lead(&self, id: i32, changes: UpdateLead) -> Result<Option<Lead>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(lead) = tables.leads.iter_mut().find(|l| l.id == id) else {
            return Ok(None);
        };
        if let Some(status) = changes.status {
            lead.status = status;
        }
        lead.notes = changes.notes.or(lead.notes.take());
        lead.updated_at = Utc::now();
        Ok(Some(lead.clone()))
    }

    async fn delete_lead(&self, id: i32) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.leads.len();
        tables.leads.retain(|l| l.id != id);
        Ok(tables.leads.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::MediaType;

    async fn store_with_author() -> (MemStorage, i32) {
        let store = MemStorage::new();
        let author = store
            .create_user(NewUser {
                username: "admin".to_string(),
                password: "hash".to_string(),
                is_admin: true,
            })
            .await
            .unwrap();
        (store, author.id)
    }

    fn new_post(title: &str, author_id: i32) -> NewBlogPost {
        NewBlogPost {
            title: title.to_string(),
            slug: None,
            excerpt: "Short summary".to_string(),
            content: "<p>Body</p>".to_string(),
            cover_image: None,
            category_id: None,
            author_id,
            published: false,
            featured_post: false,
            read_time: 5,
            tags: vec![],
            meta_title: None,
            meta_description: None,
            social_image: None,
        }
    }

    fn new_media(post_id: i32, url: &str) -> NewBlogMedia {
        NewBlogMedia {
            blog_post_id: post_id,
            media_type: MediaType::Image,
            url: url.to_string(),
            title: None,
            description: None,
            alt_text: Some("diagram".to_string()),
            file_size: None,
            mime_type: Some("image/png".to_string()),
            width: Some(800),
            height: Some(600),
        }
    }

    #[tokio::test]
    async fn test_same_title_gets_distinct_slugs() {
        let (store, author) = store_with_author().await;
        let first = store.create_post(new_post("Hello World", author)).await.unwrap();
        let second = store.create_post(new_post("Hello World", author)).await.unwrap();

        assert_eq!(first.slug, "hello-world");
        assert_ne!(second.slug, first.slug);
        let suffix = second.slug.strip_prefix("hello-world-").unwrap();
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_explicit_slug_collision_is_suffixed() {
        let (store, author) = store_with_author().await;
        let mut post = new_post("First", author);
        post.slug = Some("launch".to_string());
        store.create_post(post.clone()).await.unwrap();

        post.title = "Second".to_string();
        let second = store.create_post(post).await.unwrap();
        assert!(second.slug.starts_with("launch-"));
    }

    #[tokio::test]
    async fn test_new_post_defaults() {
        let (store, author) = store_with_author().await;
        let post = store.create_post(new_post("Defaults", author)).await.unwrap();
        assert_eq!(post.view_count, 0);
        assert_eq!(post.read_time, 5);
        assert!(post.published_at.is_none());
        assert_eq!(post.created_at, post.updated_at);
    }

    #[tokio::test]
    async fn test_post_created_published_gets_published_at() {
        let (store, author) = store_with_author().await;
        let mut post = new_post("Live now", author);
        post.published = true;
        let post = store.create_post(post).await.unwrap();
        assert_eq!(post.published_at, Some(post.created_at));
    }

    #[tokio::test]
    async fn test_publish_transition_sets_published_at_once() {
        let (store, author) = store_with_author().await;
        let post = store.create_post(new_post("Draft", author)).await.unwrap();

        let publish = UpdateBlogPost {
            published: Some(true),
            ..Default::default()
        };
        let first = store.update_post(post.id, publish.clone()).await.unwrap().unwrap();
        let published_at = first.published_at.expect("published_at set");

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
        assert_eq!(unpublished.published_at, Some(published_at));

        let republished = store.update_post(post.id, publish).await.unwrap().unwrap();
        assert!(republished.published);
        assert_eq!(republished.published_at, Some(published_at));
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at_and_keeps_absent_fields() {
        let (store, author) = store_with_author().await;
        let mut post = new_post("Keep", author);
        post.cover_image = Some("https://cdn.example/cover.png".to_string());
        let post = store.create_post(post).await.unwrap();

        let updated = store
            .update_post(
                post.id,
                UpdateBlogPost {
                    title: Some("Kept".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Kept");
        assert_eq!(updated.slug, post.slug);
        assert_eq!(updated.cover_image, post.cover_image);
        assert!(updated.updated_at >= post.updated_at);
    }

    #[tokio::test]
    async fn test_update_slug_conflict_is_rejected() {
        let (store, author) = store_with_author().await;
        store.create_post(new_post("Taken", author)).await.unwrap();
        let other = store.create_post(new_post("Other", author)).await.unwrap();

        let result = store
            .update_post(
                other.id,
                UpdateBlogPost {
                    slug: Some("taken".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::Conflict { field: "slug" })));
    }

    #[tokio::test]
    async fn test_update_missing_post_returns_none() {
        let store = MemStorage::new();
        let result = store.update_post(404, UpdateBlogPost::default()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_post_cascades_media() {
        let (store, author) = store_with_author().await;
        let post = store.create_post(new_post("With media", author)).await.unwrap();
        let keep = store.create_post(new_post("Untouched", author)).await.unwrap();
        for n in 0..3 {
            store
                .create_media(new_media(post.id, &format!("https://cdn.example/{n}.png")))
                .await
                .unwrap();
        }
        store
            .create_media(new_media(keep.id, "https://cdn.example/keep.png"))
            .await
            .unwrap();

        assert!(store.delete_post(post.id).await.unwrap());
        assert!(store.list_media_for_post(post.id).await.unwrap().is_empty());
        assert!(store.get_post(post.id).await.unwrap().is_none());
        assert_eq!(store.list_media_for_post(keep.id).await.unwrap().len(), 1);
        assert!(!store.delete_post(post.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_media_requires_existing_post() {
        let store = MemStorage::new();
        let result = store.create_media(new_media(99, "https://cdn.example/x.png")).await;
        assert!(matches!(
            result,
            Err(StoreError::InvalidReference { field: "blogPostId" })
        ));
    }

    #[tokio::test]
    async fn test_filters_are_and_combined_and_newest_first() {
        let (store, author) = store_with_author().await;
        let mut ids = Vec::new();
        for (published, featured) in [(true, true), (true, false), (false, true), (true, true)] {
            let mut post = new_post("Post", author);
            post.published = published;
            post.featured_post = featured;
            ids.push(store.create_post(post).await.unwrap().id);
        }

        let both = store
            .list_posts(PostFilters {
                published: Some(true),
                featured: Some(true),
                category_id: None,
            })
            .await
            .unwrap();
        let both_ids: Vec<i32> = both.iter().map(|p| p.id).collect();
        assert_eq!(both_ids, vec![ids[3], ids[0]]);

        let all = store.list_posts(PostFilters::default()).await.unwrap();
        let all_ids: Vec<i32> = all.iter().map(|p| p.id).collect();
        assert_eq!(all_ids, ids.iter().rev().copied().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_category_filter_and_delete_clears_reference() {
        let (store, author) = store_with_author().await;
        let category = store
            .create_category(NewBlogCategory {
                name: "Machine Learning".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(category.slug, "machine-learning");

        let mut post = new_post("Categorised", author);
        post.category_id = Some(category.id);
        let post = store.create_post(post).await.unwrap();
        store.create_post(new_post("Loose", author)).await.unwrap();

        let filtered = store
            .list_posts(PostFilters {
                category_id: Some(category.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);

        assert!(store.delete_category(category.id).await.unwrap());
        let post = store.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(post.category_id, None);
    }

    #[tokio::test]
    async fn test_category_name_and_slug_are_unique() {
        let store = MemStorage::new();
        store
            .create_category(NewBlogCategory {
                name: "Automation".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let same_name = store
            .create_category(NewBlogCategory {
                name: "Automation".to_string(),
                slug: Some("automation-2".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(same_name, Err(StoreError::Conflict { field: "name" })));

        let same_slug = store
            .create_category(NewBlogCategory {
                name: "Automation!".to_string(),
                ..Default::default()
            })
            .await;
        assert!(matches!(same_slug, Err(StoreError::Conflict { field: "slug" })));
    }

    #[tokio::test]
    async fn test_post_with_unknown_category_is_rejected() {
        let (store, author) = store_with_author().await;
        let mut post = new_post("Orphan", author);
        post.category_id = Some(777);
        let result = store.create_post(post).await;
        assert!(matches!(
            result,
            Err(StoreError::InvalidReference { field: "categoryId" })
        ));
    }

    #[tokio::test]
    async fn test_view_count_increments() {
        let (store, author) = store_with_author().await;
        let post = store.create_post(new_post("Popular", author)).await.unwrap();
        for _ in 0..4 {
            store.increment_view_count(post.id).await.unwrap();
        }
        assert_eq!(store.get_post(post.id).await.unwrap().unwrap().view_count, 4);
    }

    #[tokio::test]
    async fn test_lead_lifecycle() {
        let store = MemStorage::new();
        let lead = store
            .create_lead(NewLead {
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
                business_needs: "Chatbot".to_string(),
                message: Some("Let's talk".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(lead.status, LeadStatus::New);

        let contacted = store
            .update_lead_status(lead.id, LeadStatus::Contacted)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(contacted.status, LeadStatus::Contacted);
        assert!(contacted.updated_at >= lead.updated_at);

        assert_eq!(store.list_leads().await.unwrap().len(), 1);
        assert!(store.delete_lead(lead.id).await.unwrap());
        assert!(store.get_lead(lead.id).await.unwrap().is_none());
        assert!(!store.delete_lead(lead.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let (store, _) = store_with_author().await;
        let result = store
            .create_user(NewUser {
                username: "admin".to_string(),
                password: "other".to_string(),
                is_admin: false,
            })
            .await;
        assert!(matches!(result, Err(StoreError::Conflict { field: "username" })));
    }
}
