/// Session database operations
///
/// Only the SHA-256 digest of a session token is ever stored.
use crate::models::{SessionIdentity, UserSession};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new session
pub async fn create_session(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &str,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
    expires_at: DateTime<Utc>,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO user_sessions (user_id, token_hash, ip_address, user_agent, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(ip_address)
    .bind(user_agent)
    .bind(expires_at)
    .fetch_one(pool)
    .await
}

/// Resolve a live (unrevoked, unexpired) session
pub async fn find_identity(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<SessionIdentity>, sqlx::Error> {
    sqlx::query_as::<_, SessionIdentity>(
        r#"
        SELECT s.id AS session_id, u.id AS user_id, u.username, u.role, u.email_verified,
               s.last_seen_at
        FROM user_sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token_hash = $1 AND s.revoked_at IS NULL AND s.expires_at > NOW()
        "#,
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

pub async fn touch(pool: &PgPool, session_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE user_sessions SET last_seen_at = NOW() WHERE id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Active sessions of a user, most recently used first
pub async fn list_active(pool: &PgPool, user_id: Uuid) -> Result<Vec<UserSession>, sqlx::Error> {
    sqlx::query_as::<_, UserSession>(
        r#"
        SELECT id, user_id, ip_address, user_agent, created_at, last_seen_at, expires_at
        FROM user_sessions
        WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > NOW()
        ORDER BY last_seen_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Revoke one session owned by `user_id`; false if none matched
pub async fn revoke(pool: &PgPool, session_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE user_sessions SET revoked_at = NOW()
        WHERE id = $1 AND user_id = $2 AND revoked_at IS NULL
        "#,
    )
    .bind(session_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Revoke every session of a user except `keep`
pub async fn revoke_all(pool: &PgPool, user_id: Uuid, keep: Option<Uuid>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE user_sessions SET revoked_at = NOW()
        WHERE user_id = $1 AND revoked_at IS NULL AND ($2::uuid IS NULL OR id <> $2)
        "#,
    )
    .bind(user_id)
    .bind(keep)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
