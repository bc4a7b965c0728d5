/// About page storage (single row, id = 1)
use crate::models::AboutPage;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn get(pool: &PgPool) -> Result<Option<AboutPage>, sqlx::Error> {
    sqlx::query_as::<_, AboutPage>(
        "SELECT title, content, updated_by, updated_at FROM about_page WHERE id = 1",
    )
    .fetch_optional(pool)
    .await
}

pub async fn upsert(
    pool: &PgPool,
    title: &str,
    content: &str,
    updated_by: Uuid,
) -> Result<AboutPage, sqlx::Error> {
    sqlx::query_as::<_, AboutPage>(
        r#"
        INSERT INTO about_page (id, title, content, updated_by, updated_at)
        VALUES (1, $1, $2, $3, NOW())
        ON CONFLICT (id) DO UPDATE
        SET title = EXCLUDED.title,
            content = EXCLUDED.content,
            updated_by = EXCLUDED.updated_by,
            updated_at = NOW()
        RETURNING title, content, updated_by, updated_at
        "#,
    )
    .bind(title)
    .bind(content)
    .bind(updated_by)
    .fetch_one(pool)
    .await
}
