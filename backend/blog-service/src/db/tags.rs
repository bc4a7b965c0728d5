/// Tag database operations
use crate::models::{PostTag, TagWithCount};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Id of the tag named `name`, compared case-insensitively
pub async fn find_id_by_name(conn: &mut PgConnection, name: &str) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM tags WHERE LOWER(name) = LOWER($1)")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
}

/// Tag slugs equal to `base` or of the form `base-…`
pub async fn slugs_with_prefix(conn: &mut PgConnection, base: &str) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT slug FROM tags WHERE slug = $1 OR slug LIKE $1 || '-%'")
        .bind(base)
        .fetch_all(&mut *conn)
        .await
}

/// Insert a tag; `None` when its name or slug was taken in the meantime
pub async fn insert(conn: &mut PgConnection, name: &str, slug: &str) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO tags (name, slug)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(slug)
    .fetch_optional(&mut *conn)
    .await
}

/// Replace the tag set of a post
pub async fn set_post_tags(
    conn: &mut PgConnection,
    post_id: Uuid,
    tag_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    if !tag_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO post_tags (post_id, tag_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(tag_ids)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Tags of several posts in one round trip
pub async fn for_posts(pool: &PgPool, post_ids: &[Uuid]) -> Result<Vec<PostTag>, sqlx::Error> {
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, PostTag>(
        r#"
        SELECT pt.post_id, t.id, t.name, t.slug
        FROM post_tags pt
        JOIN tags t ON t.id = pt.tag_id
        WHERE pt.post_id = ANY($1)
        ORDER BY t.name
        "#,
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await
}

/// Every tag with its published post count (zero included)
pub async fn list_with_counts(pool: &PgPool) -> Result<Vec<TagWithCount>, sqlx::Error> {
    sqlx::query_as::<_, TagWithCount>(
        r#"
        SELECT t.id, t.name, t.slug, COUNT(p.id) AS post_count
        FROM tags t
        LEFT JOIN post_tags pt ON pt.tag_id = t.id
        LEFT JOIN posts p ON p.id = pt.post_id AND p.status = 'published'
        GROUP BY t.id, t.name, t.slug
        ORDER BY post_count DESC, t.name
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
