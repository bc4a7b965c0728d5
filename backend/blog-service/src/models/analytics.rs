use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Device class derived from the User-Agent header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
    Bot,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Desktop => "desktop",
            DeviceType::Bot => "bot",
        }
    }
}

/// `POST /analytics/page-views` body
#[derive(Debug, Clone, Deserialize)]
pub struct TrackPageViewRequest {
    pub path: String,
    pub post_slug: Option<String>,
    pub referrer: Option<String>,
}

/// Page view ready to insert
#[derive(Debug, Clone)]
pub struct NewPageView {
    pub path: String,
    pub post_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub visitor_id: String,
    pub referrer_host: Option<String>,
    pub device_type: DeviceType,
    pub browser: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DailyViews {
    pub day: NaiveDate,
    pub views: i64,
    pub visitors: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopPost {
    pub post_id: Uuid,
    pub title: String,
    pub slug: String,
    pub views: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub days: i64,
    pub total_views: i64,
    pub unique_visitors: i64,
    pub daily: Vec<DailyViews>,
    pub by_device: Vec<LabelCount>,
    pub by_browser: Vec<LabelCount>,
    pub top_referrers: Vec<LabelCount>,
    pub top_posts: Vec<TopPost>,
}

/// Counters shown on the admin dashboard
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DashboardTotals {
    pub users: i64,
    pub new_users_7d: i64,
    pub posts: i64,
    pub published_posts: i64,
    pub draft_posts: i64,
    pub comments: i64,
    pub likes: i64,
    pub bookmarks: i64,
    pub views_today: i64,
    pub views_7d: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub totals: DashboardTotals,
    pub recent_posts: Vec<super::PostSummary>,
    pub recent_comments: Vec<super::RecentComment>,
}
