/// Post handlers - HTTP endpoints for post operations
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{
    CreatePostRequest, Pagination, PostFilter, PostListQuery, PostStatus, UpdatePostRequest,
};
use crate::services::PostService;
use crate::AppState;
use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// GET /api/v1/posts
pub async fn list_posts(
    state: web::Data<AppState>,
    query: web::Query<PostListQuery>,
) -> Result<HttpResponse> {
    let pagination = Pagination {
        limit: query.limit,
        offset: query.offset,
    };
    let filter = PostFilter {
        category: non_empty(&query.category),
        tag: non_empty(&query.tag),
        author: non_empty(&query.author),
        query: non_empty(&query.q),
        featured: query.featured,
        ..PostFilter::published()
    };

    let page = PostService::new(state.db.clone())
        .list_posts(&filter, pagination.limit(), pagination.offset())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// POST /api/v1/posts
pub async fn create_post(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    if !user.email_verified {
        return Err(AppError::Forbidden("Verify your email before posting".to_string()));
    }
    req.validate()?;

    let post = PostService::new(state.db.clone())
        .create_post(user.user_id, &req)
        .await?;
    Ok(HttpResponse::Created().json(post))
}

/// GET /api/v1/posts/{slug}
pub async fn get_post(
    state: web::Data<AppState>,
    viewer: Option<AuthUser>,
    slug: web::Path<String>,
) -> Result<HttpResponse> {
    let post = PostService::new(state.db.clone())
        .get_post(&slug, viewer.map(|v| v.actor()))
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

/// PATCH /api/v1/posts/{id}
pub async fn update_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
    req: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let post = PostService::new(state.db.clone())
        .update_post(*post_id, user.actor(), &req)
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

/// POST /api/v1/posts/{id}/publish
pub async fn publish_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = PostService::new(state.db.clone())
        .set_status(*post_id, user.actor(), PostStatus::Published)
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

/// POST /api/v1/posts/{id}/unpublish
pub async fn unpublish_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = PostService::new(state.db.clone())
        .set_status(*post_id, user.actor(), PostStatus::Draft)
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

/// DELETE /api/v1/posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    user: AuthUser,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    PostService::new(state.db.clone())
        .delete_post(*post_id, user.actor())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
