/// Page view tracking and aggregation
use crate::db::{analytics, comments, posts};
use crate::error::{AppError, Result};
use crate::metrics::PAGE_VIEWS_TOTAL;
use crate::models::{
    AnalyticsSummary, Dashboard, DailyViews, DeviceType, NewPageView, PostFilter,
    TrackPageViewRequest,
};
use crate::services::posts::PostService;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

pub const MAX_SUMMARY_DAYS: i64 = 365;
const TOP_N: i64 = 10;
const DASHBOARD_RECENT: i64 = 5;
const MAX_PATH_LEN: usize = 500;
const MAX_REFERRER_HOST_LEN: usize = 255;

const BOT_MARKERS: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "slurp",
    "curl/",
    "wget/",
    "python-requests",
    "headlesschrome",
    "lighthouse",
    "facebookexternalhit",
    "preview",
];

/// Device class from a User-Agent. An empty agent counts as a bot.
pub fn classify_user_agent(user_agent: &str) -> DeviceType {
    let ua = user_agent.to_ascii_lowercase();
    if ua.trim().is_empty() || BOT_MARKERS.iter().any(|m| ua.contains(m)) {
        return DeviceType::Bot;
    }

    let android = ua.contains("android");
    if ua.contains("ipad")
        || ua.contains("tablet")
        || ua.contains("kindle")
        || ua.contains("silk/")
        || (android && !ua.contains("mobile"))
    {
        return DeviceType::Tablet;
    }

    if ua.contains("mobi")
        || ua.contains("iphone")
        || ua.contains("ipod")
        || android
        || ua.contains("windows phone")
        || ua.contains("opera mini")
    {
        return DeviceType::Mobile;
    }

    DeviceType::Desktop
}

/// Browser family; order matters because most agents also claim Chrome or Safari
pub fn browser_name(user_agent: &str) -> &'static str {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("edg/") || ua.contains("edge/") || ua.contains("edgios") {
        "Edge"
    } else if ua.contains("opr/") || ua.contains("opera") {
        "Opera"
    } else if ua.contains("samsungbrowser") {
        "Samsung Internet"
    } else if ua.contains("firefox/") || ua.contains("fxios") {
        "Firefox"
    } else if ua.contains("chrome/") || ua.contains("crios") {
        "Chrome"
    } else if ua.contains("safari/") {
        "Safari"
    } else {
        "Other"
    }
}

/// Host of an absolute http(s) referrer, without `www.`; self-referrals are dropped
pub fn referrer_host(referrer: &str, site_host: Option<&str>) -> Option<String> {
    let url = url::Url::parse(referrer.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    if let Some(site) = site_host {
        let site = site.strip_prefix("www.").unwrap_or(site);
        if host == site {
            return None;
        }
    }
    if host.is_empty() || host.len() > MAX_REFERRER_HOST_LEN {
        return None;
    }
    Some(host)
}

/// One entry per day from `start` for `days` days; missing days are zero
pub fn fill_daily_series(rows: Vec<DailyViews>, start: NaiveDate, days: i64) -> Vec<DailyViews> {
    let mut by_day: HashMap<NaiveDate, DailyViews> = rows.into_iter().map(|r| (r.day, r)).collect();
    (0..days)
        .map(|offset| {
            let day = start + Duration::days(offset);
            by_day.remove(&day).unwrap_or(DailyViews {
                day,
                views: 0,
                visitors: 0,
            })
        })
        .collect()
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

/// Who viewed the page
#[derive(Debug, Clone)]
pub struct ViewContext<'a> {
    pub user_agent: &'a str,
    pub user_id: Option<Uuid>,
    pub visitor_id: &'a str,
    pub site_host: Option<&'a str>,
}

pub struct AnalyticsService {
    pool: PgPool,
}

impl AnalyticsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a page view. Returns `None` (nothing stored) for bots.
    pub async fn track_page_view(
        &self,
        req: &TrackPageViewRequest,
        ctx: ViewContext<'_>,
    ) -> Result<Option<DeviceType>> {
        let path = req.path.trim();
        if !path.starts_with('/') || path.len() > MAX_PATH_LEN {
            return Err(AppError::Validation(
                "path must be an absolute path of at most 500 characters".to_string(),
            ));
        }

        let device_type = classify_user_agent(ctx.user_agent);
        if device_type == DeviceType::Bot {
            debug!(path = %path, "Ignoring bot page view");
            return Ok(None);
        }

        let post_id = match req.post_slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => posts::published_id_by_slug(&self.pool, slug).await?,
            None => None,
        };

        let view = NewPageView {
            path: path.to_string(),
            post_id,
            user_id: ctx.user_id,
            visitor_id: ctx.visitor_id.to_string(),
            referrer_host: req
                .referrer
                .as_deref()
                .and_then(|r| referrer_host(r, ctx.site_host)),
            device_type,
            browser: browser_name(ctx.user_agent),
        };
        analytics::insert_page_view(&self.pool, &view).await?;

        if let Some(post_id) = post_id {
            posts::increment_view_count(&self.pool, post_id).await?;
        }

        PAGE_VIEWS_TOTAL
            .with_label_values(&[device_type.as_str()])
            .inc();
        Ok(Some(device_type))
    }

    /// Aggregates over the last `days` days (including today), clamped to `[1, 365]`
    pub async fn summary(&self, days: i64) -> Result<AnalyticsSummary> {
        let days = days.clamp(1, MAX_SUMMARY_DAYS);
        let start = Utc::now().date_naive() - Duration::days(days - 1);
        let since = start_of_day(start);

        let (total_views, unique_visitors) = analytics::totals_since(&self.pool, since).await?;
        let daily = analytics::daily_since(&self.pool, since).await?;

        Ok(AnalyticsSummary {
            days,
            total_views,
            unique_visitors,
            daily: fill_daily_series(daily, start, days),
            by_device: analytics::by_device_since(&self.pool, since).await?,
            by_browser: analytics::by_browser_since(&self.pool, since).await?,
            top_referrers: analytics::top_referrers_since(&self.pool, since, TOP_N).await?,
            top_posts: analytics::top_posts_since(&self.pool, since, TOP_N).await?,
        })
    }

    /// Site totals with the most recent posts and comments
    pub async fn dashboard(&self) -> Result<Dashboard> {
        let today = Utc::now().date_naive();
        let totals = analytics::dashboard_totals(
            &self.pool,
            start_of_day(today),
            start_of_day(today - Duration::days(6)),
        )
        .await?;

        let recent_posts = PostService::new(self.pool.clone())
            .list_posts(&PostFilter::default(), DASHBOARD_RECENT, 0)
            .await?
            .items;
        let (recent_comments, _) = comments::recent(&self.pool, DASHBOARD_RECENT, 0).await?;

        Ok(Dashboard {
            totals,
            recent_posts,
            recent_comments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";
    const ANDROID_PHONE: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
    const ANDROID_TABLET: &str = "Mozilla/5.0 (Linux; Android 13; SM-X700) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const WINDOWS_EDGE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
    const MAC_FIREFOX: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.1; rv:121.0) Gecko/20100101 Firefox/121.0";
    const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

    #[test]
    fn classifies_devices() {
        assert_eq!(classify_user_agent(IPHONE), DeviceType::Mobile);
        assert_eq!(classify_user_agent(IPAD), DeviceType::Tablet);
        assert_eq!(classify_user_agent(ANDROID_PHONE), DeviceType::Mobile);
        assert_eq!(classify_user_agent(ANDROID_TABLET), DeviceType::Tablet);
        assert_eq!(classify_user_agent(WINDOWS_EDGE), DeviceType::Desktop);
        assert_eq!(classify_user_agent(GOOGLEBOT), DeviceType::Bot);
        assert_eq!(classify_user_agent(""), DeviceType::Bot);
        assert_eq!(classify_user_agent("curl/8.4.0"), DeviceType::Bot);
    }

    #[test]
    fn detects_browsers() {
        assert_eq!(browser_name(WINDOWS_EDGE), "Edge");
        assert_eq!(browser_name(MAC_FIREFOX), "Firefox");
        assert_eq!(browser_name(ANDROID_PHONE), "Chrome");
        assert_eq!(browser_name(IPHONE), "Safari");
        assert_eq!(browser_name("Lynx/2.9"), "Other");
    }

    #[test]
    fn referrer_is_reduced_to_host() {
        assert_eq!(
            referrer_host("https://www.Google.com/search?q=rust", Some("blog.example.com")).as_deref(),
            Some("google.com")
        );
        assert_eq!(referrer_host("https://blog.example.com/posts/a", Some("blog.example.com")), None);
        assert_eq!(referrer_host("https://www.blog.example.com/", Some("blog.example.com")), None);
        assert_eq!(referrer_host("android-app://com.slack", None), None);
        assert_eq!(referrer_host("not a url", None), None);
    }

    #[test]
    fn daily_series_is_zero_filled() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let rows = vec![
            DailyViews {
                day: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
                views: 7,
                visitors: 3,
            },
            DailyViews {
                day: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                views: 1,
                visitors: 1,
            },
        ];

        let series = fill_daily_series(rows, start, 5);
        assert_eq!(series.len(), 5);
        assert_eq!(
            series.iter().map(|d| d.views).collect::<Vec<_>>(),
            vec![0, 7, 0, 1, 0]
        );
        assert_eq!(series[0].day, start);
        assert_eq!(series[4].day, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn daily_series_spans_month_boundary() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let series = fill_daily_series(vec![], start, 3);
        assert_eq!(series[2].day, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }
}
