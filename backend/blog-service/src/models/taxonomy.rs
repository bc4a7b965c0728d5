use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category with its number of published posts
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryWithCount {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub post_count: i64,
}

/// Category block embedded in posts
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TagWithCount {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub post_count: i64,
}

/// Tag attached to a post, as returned by the batch lookup
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostTag {
    pub post_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<PostTag> for Tag {
    fn from(t: PostTag) -> Self {
        Tag {
            id: t.id,
            name: t.name,
            slug: t.slug,
        }
    }
}
