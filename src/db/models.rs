//! Database Models - structs representing database tables (used by sqlx/serde),
//! plus the insert/patch shapes the storage gateway accepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};

/// Raised when a stored or submitted enum value is not one of the known variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// ============================================================================
// Users
// ============================================================================

/// User model. Only used as the author foreign key for posts.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub is_admin: bool,
}

/// New user for insertion
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    /// bcrypt hash
    pub password: String,
    pub is_admin: bool,
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogCategory {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// New category. `slug` is derived from `name` when absent.
#[derive(Debug, Clone, Default)]
pub struct NewBlogCategory {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateBlogCategory {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

// ============================================================================
// Posts
// ============================================================================

/// Blog post model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub cover_image: Option<String>,
    pub category_id: Option<i32>,
    pub author_id: i32,
    pub published: bool,
    pub featured_post: bool,
    pub read_time: i32,
    pub view_count: i32,
    pub tags: Vec<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub social_image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New blog post for creation
#[derive(Debug, Clone)]
pub struct NewBlogPost {
    pub title: String,
    /// Derived from `title` when absent; suffixed on collision.
    pub slug: Option<String>,
    pub excerpt: String,
    pub content: String,
    pub cover_image: Option<String>,
    pub category_id: Option<i32>,
    pub author_id: i32,
    pub published: bool,
    pub featured_post: bool,
    pub read_time: i32,
    pub tags: Vec<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub social_image: Option<String>,
}

/// Blog post update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateBlogPost {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub category_id: Option<i32>,
    pub author_id: Option<i32>,
    pub published: Option<bool>,
    pub featured_post: Option<bool>,
    pub read_time: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub social_image: Option<String>,
}

/// Equality filters for listing posts; absent fields do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostFilters {
    pub published: Option<bool>,
    pub category_id: Option<i32>,
    pub featured: Option<bool>,
}

impl PostFilters {
    pub fn matches(&self, post: &BlogPost) -> bool {
        self.published.is_none_or(|p| post.published == p)
            && self.category_id.is_none_or(|c| post.category_id == Some(c))
            && self.featured.is_none_or(|f| post.featured_post == f)
    }
}

/// Post detail response: the post with its media attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostWithMedia {
    #[serde(flatten)]
    pub post: BlogPost,
    pub media: Vec<BlogMedia>,
}

// ============================================================================
// Media
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Document,
}

impl MediaType {
    pub const ALL: [MediaType; 3] = [MediaType::Image, MediaType::Video, MediaType::Document];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Document => "document",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "media type",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for MediaType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogMedia {
    pub id: i32,
    pub blog_post_id: i32,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub media_type: MediaType,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub alt_text: Option<String>,
    pub file_size: Option<i32>,
    pub mime_type: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBlogMedia {
    pub blog_post_id: i32,
    pub media_type: MediaType,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub alt_text: Option<String>,
    pub file_size: Option<i32>,
    pub mime_type: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateBlogMedia {
    pub media_type: Option<MediaType>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub alt_text: Option<String>,
    pub file_size: Option<i32>,
    pub mime_type: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

// ============================================================================
// Leads
// ============================================================================

/// Sales pipeline position of a lead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
    Closed,
    Rejected,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 6] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Converted,
        LeadStatus::Closed,
        LeadStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Closed => "closed",
            LeadStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "lead status",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for LeadStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub business_needs: String,
    pub message: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: LeadStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contact form submission. Status always starts at `new`.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub business_needs: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateLead {
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
}
