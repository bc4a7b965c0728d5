use crate::error::Result;
use crate::middleware::AdminUser;
use crate::services::AboutService;
use crate::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertAboutRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100000))]
    pub content: String,
}

/// GET /api/v1/about
pub async fn get_about(state: web::Data<AppState>) -> Result<HttpResponse> {
    let page = AboutService::new(state.db.clone()).get().await?;
    Ok(HttpResponse::Ok().json(page))
}

/// PUT /api/v1/about
pub async fn upsert_about(
    state: web::Data<AppState>,
    admin: AdminUser,
    req: web::Json<UpsertAboutRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let page = AboutService::new(state.db.clone())
        .upsert(&req.title, &req.content, admin.0.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(page))
}
