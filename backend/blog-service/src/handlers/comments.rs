/// Comment handlers
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

/// GET /api/v1/posts/{post_id}/comments
pub async fn list_comments(
    state: web::Data<AppState>,
    viewer: Option<AuthUser>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let threads = state
        .comment_service()
        .list_comments(*post_id, viewer.map(|v| v.actor()))
        .await?;
    Ok(HttpResponse::Ok().json(threads))
}

/// POST /api/v1/posts/{post_id}/comments
pub async fn create_comment(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
    req: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    let comment = state
        .comment_service()
        .create_comment(*post_id, user.user_id, &req.content, req.parent_id)
        .await?;
    Ok(HttpResponse::Created().json(comment))
}

/// PATCH /api/v1/comments/{comment_id}
pub async fn update_comment(
    state: web::Data<AppState>,
    user: AuthUser,
    comment_id: web::Path<Uuid>,
    req: web::Json<UpdateCommentRequest>,
) -> Result<HttpResponse> {
    let comment = state
        .comment_service()
        .update_comment(*comment_id, user.user_id, &req.content)
        .await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// DELETE /api/v1/comments/{comment_id}
pub async fn delete_comment(
    state: web::Data<AppState>,
    user: AuthUser,
    comment_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state
        .comment_service()
        .delete_comment(*comment_id, user.actor())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
