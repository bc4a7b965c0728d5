/// Like and bookmark toggles; all of them are idempotent
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::services::EngagementService;
use crate::AppState;
use actix_web::{web, HttpResponse};
use uuid::Uuid;

pub async fn like_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let like = EngagementService::new(state.db.clone())
        .like(*post_id, user.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(like))
}

pub async fn unlike_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let like = EngagementService::new(state.db.clone())
        .unlike(*post_id, user.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(like))
}

pub async fn bookmark_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let bookmark = EngagementService::new(state.db.clone())
        .bookmark(*post_id, user.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(bookmark))
}

pub async fn unbookmark_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let bookmark = EngagementService::new(state.db.clone())
        .unbookmark(*post_id, user.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(bookmark))
}
