/// One-time code storage
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OtpRecord {
    pub id: Uuid,
    pub code_hash: String,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
}

/// Store a new code, superseding any unconsumed code for the same (email, purpose)
pub async fn replace_code(
    pool: &PgPool,
    email: &str,
    purpose: &str,
    code_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM otp_codes WHERE email = $1 AND purpose = $2 AND consumed_at IS NULL")
        .bind(email)
        .bind(purpose)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO otp_codes (email, purpose, code_hash, expires_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(email)
    .bind(purpose)
    .bind(code_hash)
    .bind(expires_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// Latest unconsumed code, row-locked for the verifying transaction
pub async fn find_pending_for_update(
    conn: &mut PgConnection,
    email: &str,
    purpose: &str,
) -> Result<Option<OtpRecord>, sqlx::Error> {
    sqlx::query_as::<_, OtpRecord>(
        r#"
        SELECT id, code_hash, attempts, expires_at
        FROM otp_codes
        WHERE email = $1 AND purpose = $2 AND consumed_at IS NULL
        ORDER BY created_at DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(email)
    .bind(purpose)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn has_pending(pool: &PgPool, email: &str, purpose: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM otp_codes
            WHERE email = $1 AND purpose = $2 AND consumed_at IS NULL
        )
        "#,
    )
    .bind(email)
    .bind(purpose)
    .fetch_one(pool)
    .await
}

pub async fn increment_attempts(conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE otp_codes SET attempts = attempts + 1 WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn consume(conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE otp_codes SET consumed_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
