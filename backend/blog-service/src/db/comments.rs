/// Comment database operations
use crate::models::{Comment, CommentRow, RecentComment};
use sqlx::PgPool;
use uuid::Uuid;

const COMMENT_COLUMNS: &str = "id, post_id, author_id, parent_id, content, created_at, updated_at";

/// All comments of a post with their authors, oldest first
pub async fn list_for_post(pool: &PgPool, post_id: Uuid) -> Result<Vec<CommentRow>, sqlx::Error> {
    sqlx::query_as::<_, CommentRow>(
        r#"
        SELECT c.id, c.post_id, c.parent_id, c.content,
               c.author_id, u.username AS author_username,
               u.display_name AS author_display_name, u.avatar_url AS author_avatar_url,
               c.created_at, c.updated_at
        FROM comments c
        JOIN users u ON u.id = c.author_id
        WHERE c.post_id = $1
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(&format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_row_by_id(pool: &PgPool, id: Uuid) -> Result<Option<CommentRow>, sqlx::Error> {
    sqlx::query_as::<_, CommentRow>(
        r#"
        SELECT c.id, c.post_id, c.parent_id, c.content,
               c.author_id, u.username AS author_username,
               u.display_name AS author_display_name, u.avatar_url AS author_avatar_url,
               c.created_at, c.updated_at
        FROM comments c
        JOIN users u ON u.id = c.author_id
        WHERE c.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn insert(
    pool: &PgPool,
    post_id: Uuid,
    author_id: Uuid,
    parent_id: Option<Uuid>,
    content: &str,
) -> Result<Comment, sqlx::Error> {
    sqlx::query_as::<_, Comment>(&format!(
        r#"
        INSERT INTO comments (post_id, author_id, parent_id, content)
        VALUES ($1, $2, $3, $4)
        RETURNING {COMMENT_COLUMNS}
        "#
    ))
    .bind(post_id)
    .bind(author_id)
    .bind(parent_id)
    .bind(content)
    .fetch_one(pool)
    .await
}

pub async fn update_content(pool: &PgPool, id: Uuid, content: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(content)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replies go with their parent (FK cascade)
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Newest comments across all posts
pub async fn recent(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<(Vec<RecentComment>, i64), sqlx::Error> {
    let comments = sqlx::query_as::<_, RecentComment>(
        r#"
        SELECT c.id, c.post_id, p.title AS post_title, p.slug AS post_slug,
               u.username AS author_username, c.content, c.created_at
        FROM comments c
        JOIN posts p ON p.id = c.post_id
        JOIN users u ON u.id = c.author_id
        ORDER BY c.created_at DESC, c.id DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments")
        .fetch_one(pool)
        .await?;

    Ok((comments, total))
}
