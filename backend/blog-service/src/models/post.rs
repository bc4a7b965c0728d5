use super::{AuthorSummary, CategorySummary, Tag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_PUBLISHED: &str = "published";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => STATUS_DRAFT,
            PostStatus::Published => STATUS_PUBLISHED,
        }
    }
}

/// Bare `posts` row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub category_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub cover_image_url: Option<String>,
    pub status: String,
    pub featured: bool,
    pub reading_time_minutes: i32,
    pub view_count: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == STATUS_PUBLISHED
    }
}

/// Post joined with author, category and engagement counts
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_display_name: Option<String>,
    pub author_avatar_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub cover_image_url: Option<String>,
    pub status: String,
    pub featured: bool,
    pub reading_time_minutes: i32,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostRow {
    pub fn is_published(&self) -> bool {
        self.status == STATUS_PUBLISHED
    }

    fn author(&self) -> AuthorSummary {
        AuthorSummary {
            id: self.author_id,
            username: self.author_username.clone(),
            display_name: self.author_display_name.clone(),
            avatar_url: self.author_avatar_url.clone(),
        }
    }

    fn category(&self) -> Option<CategorySummary> {
        match (self.category_id, &self.category_name, &self.category_slug) {
            (Some(id), Some(name), Some(slug)) => Some(CategorySummary {
                id,
                name: name.clone(),
                slug: slug.clone(),
            }),
            _ => None,
        }
    }

    pub fn into_summary(self, tags: Vec<Tag>) -> PostSummary {
        PostSummary {
            author: self.author(),
            category: self.category(),
            id: self.id,
            title: self.title,
            slug: self.slug,
            excerpt: self.excerpt,
            cover_image_url: self.cover_image_url,
            status: self.status,
            featured: self.featured,
            reading_time_minutes: self.reading_time_minutes,
            view_count: self.view_count,
            like_count: self.like_count,
            comment_count: self.comment_count,
            tags,
            published_at: self.published_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn into_detail(self, tags: Vec<Tag>, liked_by_me: bool, bookmarked_by_me: bool) -> PostDetail {
        let content = self.content.clone();
        PostDetail {
            post: self.into_summary(tags),
            content,
            liked_by_me,
            bookmarked_by_me,
        }
    }
}

/// List item (no body)
#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub cover_image_url: Option<String>,
    pub status: String,
    pub featured: bool,
    pub reading_time_minutes: i32,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub author: AuthorSummary,
    pub category: Option<CategorySummary>,
    pub tags: Vec<Tag>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Single post view
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostSummary,
    pub content: String,
    pub liked_by_me: bool,
    pub bookmarked_by_me: bool,
}

/// Filters accepted by the post list query; `None` means "any"
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub author: Option<String>,
    pub author_id: Option<Uuid>,
    pub query: Option<String>,
    pub featured: Option<bool>,
    pub liked_by: Option<Uuid>,
    pub bookmarked_by: Option<Uuid>,
}

impl PostFilter {
    pub fn published() -> Self {
        Self {
            status: Some(STATUS_PUBLISHED.to_string()),
            ..Self::default()
        }
    }
}

/// `GET /posts` query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub author: Option<String>,
    pub q: Option<String>,
    pub featured: Option<bool>,
}

/// `POST /posts` body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 200000))]
    pub content: String,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(custom(function = "crate::validators::validate_http_url"))]
    pub cover_image_url: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Publish immediately instead of saving a draft
    #[serde(default)]
    pub publish: bool,
}

/// `PATCH /posts/{id}` body; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200000))]
    pub content: Option<String>,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(custom(function = "crate::validators::validate_http_url"))]
    pub cover_image_url: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Slug and timestamp for sitemap entries
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SitemapEntry {
    pub slug: String,
    pub updated_at: DateTime<Utc>,
}
