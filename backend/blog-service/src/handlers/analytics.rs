/// Page view tracking and the admin analytics report
use crate::error::Result;
use crate::handlers::user_agent;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::TrackPageViewRequest;
use crate::services::analytics::ViewContext;
use crate::services::AnalyticsService;
use crate::AppState;
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

const DEFAULT_SUMMARY_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub days: Option<i64>,
}

/// POST /api/v1/analytics/page-views
///
/// Always 204. A visitor id cookie is issued on the first tracked view.
pub async fn track_page_view(
    http: HttpRequest,
    state: web::Data<AppState>,
    viewer: Option<AuthUser>,
    req: web::Json<TrackPageViewRequest>,
) -> Result<HttpResponse> {
    let analytics = &state.config.analytics;

    let existing = http
        .cookie(&analytics.visitor_cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| Uuid::parse_str(v).is_ok());
    let fresh = existing.is_none();
    let visitor_id = existing.unwrap_or_else(|| Uuid::new_v4().to_string());
    let site_host = state.config.app.public_host();

    let tracked = AnalyticsService::new(state.db.clone())
        .track_page_view(
            &req,
            ViewContext {
                user_agent: user_agent(&http).unwrap_or(""),
                user_id: viewer.map(|v| v.user_id),
                visitor_id: &visitor_id,
                site_host: site_host.as_deref(),
            },
        )
        .await?;

    let mut response = HttpResponse::NoContent();
    if fresh && tracked.is_some() {
        response.cookie(
            Cookie::build(analytics.visitor_cookie_name.clone(), visitor_id)
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(state.config.session.secure_cookie)
                .max_age(CookieDuration::days(analytics.visitor_cookie_days))
                .finish(),
        );
    }
    Ok(response.finish())
}

/// GET /api/v1/admin/analytics?days=N
pub async fn analytics_summary(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<SummaryQuery>,
) -> Result<HttpResponse> {
    let summary = AnalyticsService::new(state.db.clone())
        .summary(query.days.unwrap_or(DEFAULT_SUMMARY_DAYS))
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}
