/// Likes and bookmarks
use crate::db::{bookmarks, likes, posts};
use crate::error::{AppError, Result};
use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookmarkState {
    pub bookmarked: bool,
}

pub struct EngagementService {
    pool: PgPool,
}

impl EngagementService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent; liking twice leaves one like
    pub async fn like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeState> {
        self.require_published(post_id).await?;
        let created = likes::create_like(&self.pool, post_id, user_id).await?;
        debug!(post_id = %post_id, user_id = %user_id, created, "Like recorded");
        self.like_state(post_id, true).await
    }

    pub async fn unlike(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeState> {
        self.require_exists(post_id).await?;
        let removed = likes::delete_like(&self.pool, post_id, user_id).await?;
        debug!(post_id = %post_id, user_id = %user_id, removed, "Like removed");
        self.like_state(post_id, false).await
    }

    pub async fn bookmark(&self, post_id: Uuid, user_id: Uuid) -> Result<BookmarkState> {
        self.require_published(post_id).await?;
        bookmarks::create_bookmark(&self.pool, post_id, user_id).await?;
        Ok(BookmarkState { bookmarked: true })
    }

    pub async fn unbookmark(&self, post_id: Uuid, user_id: Uuid) -> Result<BookmarkState> {
        self.require_exists(post_id).await?;
        bookmarks::delete_bookmark(&self.pool, post_id, user_id).await?;
        Ok(BookmarkState { bookmarked: false })
    }

    async fn like_state(&self, post_id: Uuid, liked: bool) -> Result<LikeState> {
        let like_count = likes::count_likes_by_post(&self.pool, post_id).await?;
        Ok(LikeState { liked, like_count })
    }

    async fn require_published(&self, post_id: Uuid) -> Result<()> {
        match posts::find_by_id(&self.pool, post_id).await? {
            Some(post) if post.is_published() => Ok(()),
            _ => Err(AppError::NotFound("Post not found".to_string())),
        }
    }

    async fn require_exists(&self, post_id: Uuid) -> Result<()> {
        posts::find_by_id(&self.pool, post_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }
}
