/// Post database operations
use crate::db::like_pattern;
use crate::models::{Post, PostFilter, PostRow, SitemapEntry};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const POST_COLUMNS: &str = "id, author_id, category_id, title, slug, excerpt, content, \
                            cover_image_url, status, featured, reading_time_minutes, view_count, \
                            published_at, created_at, updated_at";

const POST_ROW_SELECT: &str = r#"
    SELECT p.id, p.author_id, u.username AS author_username,
           u.display_name AS author_display_name, u.avatar_url AS author_avatar_url,
           p.category_id, c.name AS category_name, c.slug AS category_slug,
           p.title, p.slug, p.excerpt, p.content, p.cover_image_url, p.status, p.featured,
           p.reading_time_minutes, p.view_count,
           (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
           (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count,
           p.published_at, p.created_at, p.updated_at
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
"#;

const POST_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR p.status = $1)
      AND ($2::text IS NULL OR c.slug = $2)
      AND ($3::text IS NULL OR EXISTS (
            SELECT 1 FROM post_tags pt JOIN tags t ON t.id = pt.tag_id
            WHERE pt.post_id = p.id AND t.slug = $3))
      AND ($4::text IS NULL OR LOWER(u.username) = LOWER($4))
      AND ($5::uuid IS NULL OR p.author_id = $5)
      AND ($6::text IS NULL OR p.title ILIKE $6 OR p.excerpt ILIKE $6)
      AND ($7::bool IS NULL OR p.featured = $7)
      AND ($8::uuid IS NULL OR EXISTS (
            SELECT 1 FROM likes lk WHERE lk.post_id = p.id AND lk.user_id = $8))
      AND ($9::uuid IS NULL OR EXISTS (
            SELECT 1 FROM bookmarks bm WHERE bm.post_id = p.id AND bm.user_id = $9))
"#;

/// Fields for a new post
#[derive(Debug, Clone)]
pub struct NewPost<'a> {
    pub author_id: Uuid,
    pub category_id: Option<Uuid>,
    pub title: &'a str,
    pub slug: &'a str,
    pub excerpt: &'a str,
    pub content: &'a str,
    pub cover_image_url: Option<&'a str>,
    pub status: &'a str,
    pub reading_time_minutes: i32,
}

/// Full replacement of the editable columns
#[derive(Debug, Clone)]
pub struct PostChanges<'a> {
    pub category_id: Option<Uuid>,
    pub title: &'a str,
    pub slug: &'a str,
    pub excerpt: &'a str,
    pub content: &'a str,
    pub cover_image_url: Option<&'a str>,
    pub reading_time_minutes: i32,
}

/// Filtered page of posts, newest publication first, plus the total match count
pub async fn list(
    pool: &PgPool,
    filter: &PostFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PostRow>, i64), sqlx::Error> {
    let pattern = filter.query.as_deref().map(like_pattern);

    let rows = sqlx::query_as::<_, PostRow>(&format!(
        "{POST_ROW_SELECT} {POST_FILTER} \
         ORDER BY COALESCE(p.published_at, p.created_at) DESC, p.id DESC \
         LIMIT $10 OFFSET $11"
    ))
    .bind(filter.status.as_deref())
    .bind(filter.category.as_deref())
    .bind(filter.tag.as_deref())
    .bind(filter.author.as_deref())
    .bind(filter.author_id)
    .bind(pattern.as_deref())
    .bind(filter.featured)
    .bind(filter.liked_by)
    .bind(filter.bookmarked_by)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM posts p \
         JOIN users u ON u.id = p.author_id \
         LEFT JOIN categories c ON c.id = p.category_id \
         {POST_FILTER}"
    ))
    .bind(filter.status.as_deref())
    .bind(filter.category.as_deref())
    .bind(filter.tag.as_deref())
    .bind(filter.author.as_deref())
    .bind(filter.author_id)
    .bind(pattern.as_deref())
    .bind(filter.featured)
    .bind(filter.liked_by)
    .bind(filter.bookmarked_by)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

pub async fn find_row_by_slug(pool: &PgPool, slug: &str) -> Result<Option<PostRow>, sqlx::Error> {
    sqlx::query_as::<_, PostRow>(&format!("{POST_ROW_SELECT} WHERE p.slug = $1"))
        .bind(slug)
        .fetch_optional(pool)
        .await
}

pub async fn find_row_by_id(pool: &PgPool, id: Uuid) -> Result<Option<PostRow>, sqlx::Error> {
    sqlx::query_as::<_, PostRow>(&format!("{POST_ROW_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Published post id for a slug (page view attribution)
pub async fn published_id_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM posts WHERE slug = $1 AND status = 'published'")
        .bind(slug)
        .fetch_optional(pool)
        .await
}

/// Existing slugs equal to `base` or of the form `base-…`, ignoring `exclude`
pub async fn slugs_with_prefix(
    conn: &mut PgConnection,
    base: &str,
    exclude: Option<Uuid>,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT slug FROM posts
        WHERE (slug = $1 OR slug LIKE $1 || '-%') AND ($2::uuid IS NULL OR id <> $2)
        "#,
    )
    .bind(base)
    .bind(exclude)
    .fetch_all(&mut *conn)
    .await
}

pub async fn insert(conn: &mut PgConnection, post: &NewPost<'_>) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        r#"
        INSERT INTO posts (author_id, category_id, title, slug, excerpt, content,
                           cover_image_url, status, reading_time_minutes, published_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                CASE WHEN $8 = 'published' THEN NOW() ELSE NULL END)
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(post.author_id)
    .bind(post.category_id)
    .bind(post.title)
    .bind(post.slug)
    .bind(post.excerpt)
    .bind(post.content)
    .bind(post.cover_image_url)
    .bind(post.status)
    .bind(post.reading_time_minutes)
    .fetch_one(&mut *conn)
    .await
}

pub async fn update(
    conn: &mut PgConnection,
    id: Uuid,
    changes: &PostChanges<'_>,
) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        r#"
        UPDATE posts
        SET category_id = $2, title = $3, slug = $4, excerpt = $5, content = $6,
            cover_image_url = $7, reading_time_minutes = $8, updated_at = NOW()
        WHERE id = $1
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(changes.category_id)
    .bind(changes.title)
    .bind(changes.slug)
    .bind(changes.excerpt)
    .bind(changes.content)
    .bind(changes.cover_image_url)
    .bind(changes.reading_time_minutes)
    .fetch_one(&mut *conn)
    .await
}

/// Set status; `published_at` is stamped on first publication only
pub async fn set_status(pool: &PgPool, id: Uuid, status: &str) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        r#"
        UPDATE posts
        SET status = $2,
            published_at = CASE WHEN $2 = 'published' THEN COALESCE(published_at, NOW())
                                ELSE published_at END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(pool)
    .await
}

pub async fn set_featured(pool: &PgPool, id: Uuid, featured: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE posts SET featured = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(featured)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Hard delete; comments, likes, bookmarks and tag links cascade
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn increment_view_count(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Published posts for the sitemap
pub async fn sitemap_entries(pool: &PgPool, limit: i64) -> Result<Vec<SitemapEntry>, sqlx::Error> {
    sqlx::query_as::<_, SitemapEntry>(
        r#"
        SELECT slug, updated_at FROM posts
        WHERE status = 'published'
        ORDER BY published_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
