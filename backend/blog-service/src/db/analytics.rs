/// Page view storage and aggregate queries
use crate::models::{DailyViews, DashboardTotals, LabelCount, NewPageView, TopPost};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub async fn insert_page_view(pool: &PgPool, view: &NewPageView) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO page_views (path, post_id, user_id, visitor_id, referrer_host, device_type, browser)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&view.path)
    .bind(view.post_id)
    .bind(view.user_id)
    .bind(&view.visitor_id)
    .bind(view.referrer_host.as_deref())
    .bind(view.device_type.as_str())
    .bind(view.browser)
    .execute(pool)
    .await?;
    Ok(())
}

/// (total views, unique visitors) since `since`
pub async fn totals_since(pool: &PgPool, since: DateTime<Utc>) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*), COUNT(DISTINCT visitor_id) FROM page_views WHERE created_at >= $1",
    )
    .bind(since)
    .fetch_one(pool)
    .await
}

/// Per-day (UTC) counts; days without views are absent
pub async fn daily_since(pool: &PgPool, since: DateTime<Utc>) -> Result<Vec<DailyViews>, sqlx::Error> {
    sqlx::query_as::<_, DailyViews>(
        r#"
        SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
               COUNT(*) AS views,
               COUNT(DISTINCT visitor_id) AS visitors
        FROM page_views
        WHERE created_at >= $1
        GROUP BY 1
        ORDER BY 1
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await
}

pub async fn by_device_since(pool: &PgPool, since: DateTime<Utc>) -> Result<Vec<LabelCount>, sqlx::Error> {
    sqlx::query_as::<_, LabelCount>(
        r#"
        SELECT device_type AS label, COUNT(*) AS count
        FROM page_views
        WHERE created_at >= $1
        GROUP BY device_type
        ORDER BY count DESC, label
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await
}

pub async fn by_browser_since(pool: &PgPool, since: DateTime<Utc>) -> Result<Vec<LabelCount>, sqlx::Error> {
    sqlx::query_as::<_, LabelCount>(
        r#"
        SELECT browser AS label, COUNT(*) AS count
        FROM page_views
        WHERE created_at >= $1
        GROUP BY browser
        ORDER BY count DESC, label
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await
}

pub async fn top_referrers_since(
    pool: &PgPool,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<LabelCount>, sqlx::Error> {
    sqlx::query_as::<_, LabelCount>(
        r#"
        SELECT referrer_host AS label, COUNT(*) AS count
        FROM page_views
        WHERE created_at >= $1 AND referrer_host IS NOT NULL
        GROUP BY referrer_host
        ORDER BY count DESC, label
        LIMIT $2
        "#,
    )
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn top_posts_since(
    pool: &PgPool,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<TopPost>, sqlx::Error> {
    sqlx::query_as::<_, TopPost>(
        r#"
        SELECT p.id AS post_id, p.title, p.slug, COUNT(*) AS views
        FROM page_views v
        JOIN posts p ON p.id = v.post_id
        WHERE v.created_at >= $1
        GROUP BY p.id, p.title, p.slug
        ORDER BY views DESC, p.title
        LIMIT $2
        "#,
    )
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Dashboard counters in one round trip
pub async fn dashboard_totals(
    pool: &PgPool,
    today_start: DateTime<Utc>,
    week_start: DateTime<Utc>,
) -> Result<DashboardTotals, sqlx::Error> {
    sqlx::query_as::<_, DashboardTotals>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users) AS users,
            (SELECT COUNT(*) FROM users WHERE created_at >= $2) AS new_users_7d,
            (SELECT COUNT(*) FROM posts) AS posts,
            (SELECT COUNT(*) FROM posts WHERE status = 'published') AS published_posts,
            (SELECT COUNT(*) FROM posts WHERE status = 'draft') AS draft_posts,
            (SELECT COUNT(*) FROM comments) AS comments,
            (SELECT COUNT(*) FROM likes) AS likes,
            (SELECT COUNT(*) FROM bookmarks) AS bookmarks,
            (SELECT COUNT(*) FROM page_views WHERE created_at >= $1) AS views_today,
            (SELECT COUNT(*) FROM page_views WHERE created_at >= $2) AS views_7d
        "#,
    )
    .bind(today_start)
    .bind(week_start)
    .fetch_one(pool)
    .await
}
