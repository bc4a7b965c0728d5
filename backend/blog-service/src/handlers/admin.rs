/// Admin dashboard and moderation handlers
use crate::error::Result;
use crate::middleware::AdminUser;
use crate::models::{Pagination, PostFilter, PostStatus};
use crate::services::{AnalyticsService, PostService, UserService};
use crate::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AdminPostQuery {
    pub status: Option<PostStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct SetFeaturedRequest {
    pub featured: bool,
}

/// GET /api/v1/admin/dashboard
pub async fn dashboard(state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse> {
    let dashboard = AnalyticsService::new(state.db.clone()).dashboard().await?;
    Ok(HttpResponse::Ok().json(dashboard))
}

/// GET /api/v1/admin/users
pub async fn list_users(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<UserListQuery>,
) -> Result<HttpResponse> {
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };
    let users = UserService::new(state.db.clone())
        .list_users(query.q.as_deref(), page.limit(), page.offset())
        .await?;
    Ok(HttpResponse::Ok().json(users))
}

/// PATCH /api/v1/admin/users/{id}/role
pub async fn set_user_role(
    state: web::Data<AppState>,
    admin: AdminUser,
    user_id: web::Path<Uuid>,
    req: web::Json<SetRoleRequest>,
) -> Result<HttpResponse> {
    UserService::new(state.db.clone())
        .set_role(admin.0.user_id, *user_id, req.role.trim())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /api/v1/admin/users/{id}
pub async fn delete_user(
    state: web::Data<AppState>,
    admin: AdminUser,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    UserService::new(state.db.clone())
        .delete_user(admin.0.user_id, *user_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/admin/posts - every post regardless of status unless filtered
pub async fn list_all_posts(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<AdminPostQuery>,
) -> Result<HttpResponse> {
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };
    let filter = PostFilter {
        status: query.status.map(|s| s.as_str().to_string()),
        ..PostFilter::default()
    };
    let posts = PostService::new(state.db.clone())
        .list_posts(&filter, page.limit(), page.offset())
        .await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// PATCH /api/v1/admin/posts/{id}/featured
pub async fn set_featured(
    state: web::Data<AppState>,
    _admin: AdminUser,
    post_id: web::Path<Uuid>,
    req: web::Json<SetFeaturedRequest>,
) -> Result<HttpResponse> {
    PostService::new(state.db.clone())
        .set_featured(*post_id, req.featured)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "featured": req.featured })))
}

/// GET /api/v1/admin/comments
pub async fn list_recent_comments(
    state: web::Data<AppState>,
    _admin: AdminUser,
    page: web::Query<Pagination>,
) -> Result<HttpResponse> {
    let comments = state
        .comment_service()
        .recent_comments(page.limit(), page.offset())
        .await?;
    Ok(HttpResponse::Ok().json(comments))
}
