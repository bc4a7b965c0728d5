/// User database operations
use crate::models::{AdminUserView, User, UserProfile};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, username, password_hash, role, email_verified, \
                            display_name, bio, avatar_url, created_at, updated_at";

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Lookup by normalized (lower-case) email
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = LOWER($1)"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
}

/// Whether `username` belongs to any user other than `except`
pub async fn username_taken(
    pool: &PgPool,
    username: &str,
    except: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM users
            WHERE LOWER(username) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(username)
    .bind(except)
    .fetch_one(pool)
    .await
}

pub async fn create_user(
    pool: &PgPool,
    email: &str,
    username: &str,
    password_hash: &str,
    display_name: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (email, username, password_hash, display_name)
        VALUES ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(email)
    .bind(username)
    .bind(password_hash)
    .bind(display_name)
    .fetch_one(pool)
    .await
}

/// Refresh the credentials of a signup that was never verified
pub async fn refresh_unverified(
    pool: &PgPool,
    id: Uuid,
    username: &str,
    password_hash: &str,
    display_name: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET username = $2, password_hash = $3, display_name = $4, updated_at = NOW()
        WHERE id = $1 AND email_verified = FALSE
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(username)
    .bind(password_hash)
    .bind(display_name)
    .fetch_one(pool)
    .await
}

pub async fn mark_email_verified(pool: &PgPool, id: Uuid) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET email_verified = TRUE, updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn update_password(pool: &PgPool, id: Uuid, password_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Partial profile update; `None` keeps the stored value
pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    display_name: Option<&str>,
    bio: Option<&str>,
    avatar_url: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET display_name = COALESCE($2, display_name),
            bio = COALESCE($3, bio),
            avatar_url = COALESCE($4, avatar_url),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(display_name)
    .bind(bio)
    .bind(avatar_url)
    .fetch_one(pool)
    .await
}

/// Public profile with published post count
pub async fn get_profile(pool: &PgPool, username: &str) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT u.id, u.username, u.display_name, u.bio, u.avatar_url, u.created_at,
               (SELECT COUNT(*) FROM posts p
                WHERE p.author_id = u.id AND p.status = 'published') AS post_count
        FROM users u
        WHERE LOWER(u.username) = LOWER($1) AND u.email_verified = TRUE
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

/// Admin listing, optionally filtered by a username/email substring
pub async fn list_users(
    pool: &PgPool,
    pattern: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<AdminUserView>, i64), sqlx::Error> {
    let users = sqlx::query_as::<_, AdminUserView>(
        r#"
        SELECT u.id, u.email, u.username, u.display_name, u.role, u.email_verified, u.created_at,
               (SELECT COUNT(*) FROM posts p WHERE p.author_id = u.id) AS post_count
        FROM users u
        WHERE ($1::text IS NULL OR u.username ILIKE $1 OR u.email ILIKE $1)
        ORDER BY u.created_at DESC, u.id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users u WHERE ($1::text IS NULL OR u.username ILIKE $1 OR u.email ILIKE $1)",
    )
    .bind(pattern)
    .fetch_one(pool)
    .await?;

    Ok((users, total))
}

/// Returns false when the user does not exist
pub async fn set_role(pool: &PgPool, id: Uuid, role: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(role)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns false when the user does not exist
pub async fn delete_user(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
