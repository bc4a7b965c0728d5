/// Database access layer
///
/// Plain async functions over `sqlx`, one module per table group. Functions
/// that take a `PgConnection` are meant to run inside a caller's transaction.
pub mod about;
pub mod analytics;
pub mod bookmarks;
pub mod categories;
pub mod comments;
pub mod likes;
pub mod otp_codes;
pub mod posts;
pub mod sessions;
pub mod tags;
pub mod users;

use sqlx::PgPool;

/// Apply embedded migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Build a case-insensitive substring pattern for `ILIKE`
pub(crate) fn like_pattern(input: &str) -> String {
    let escaped = input
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" rust "), "%rust%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
    }
}
