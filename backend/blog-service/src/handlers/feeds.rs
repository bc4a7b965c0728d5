/// RSS and sitemap endpoints, served outside `/api/v1`
use crate::error::Result;
use crate::services::FeedService;
use crate::AppState;
use actix_web::{web, HttpResponse};

/// GET /feed.xml
pub async fn rss(state: web::Data<AppState>) -> Result<HttpResponse> {
    let app = &state.config.app;
    let xml = FeedService::new(state.db.clone())
        .rss(&app.site_name, &app.public_base_url)
        .await?;
    Ok(HttpResponse::Ok()
        .content_type("application/rss+xml; charset=utf-8")
        .body(xml))
}

/// GET /sitemap.xml
pub async fn sitemap(state: web::Data<AppState>) -> Result<HttpResponse> {
    let xml = FeedService::new(state.db.clone())
        .sitemap(&state.config.app.public_base_url)
        .await?;
    Ok(HttpResponse::Ok()
        .content_type("application/xml; charset=utf-8")
        .body(xml))
}
