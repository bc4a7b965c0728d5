/// Profile handlers and the signed-in user's own lists
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::Pagination;
use crate::services::users::{PersonalList, ProfileChanges};
use crate::services::UserService;
use crate::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 64))]
    pub display_name: Option<String>,
    #[validate(length(max = 1000))]
    pub bio: Option<String>,
    #[validate(custom(function = "crate::validators::validate_http_url"))]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// GET /api/v1/users/{username}
pub async fn get_profile(state: web::Data<AppState>, username: web::Path<String>) -> Result<HttpResponse> {
    let profile = UserService::new(state.db.clone())
        .get_profile(&username)
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// GET /api/v1/users/{username}/posts
pub async fn list_user_posts(
    state: web::Data<AppState>,
    username: web::Path<String>,
    page: web::Query<Pagination>,
) -> Result<HttpResponse> {
    let posts = UserService::new(state.db.clone())
        .list_user_posts(&username, page.limit(), page.offset())
        .await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// PATCH /api/v1/users/me
pub async fn update_profile(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let updated = UserService::new(state.db.clone())
        .update_profile(
            user.user_id,
            ProfileChanges {
                display_name: req.display_name.as_deref(),
                bio: req.bio.as_deref(),
                avatar_url: req.avatar_url.as_deref(),
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// PUT /api/v1/users/me/password
pub async fn change_password(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse> {
    state
        .auth_service()
        .change_password(
            user.user_id,
            user.session_id,
            &req.current_password,
            &req.new_password,
        )
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn personal(
    state: &AppState,
    user: &AuthUser,
    list: PersonalList,
    page: &Pagination,
) -> Result<HttpResponse> {
    let posts = UserService::new(state.db.clone())
        .personal_posts(user.user_id, list, page.limit(), page.offset())
        .await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// GET /api/v1/users/me/posts (drafts included)
pub async fn my_posts(
    state: web::Data<AppState>,
    user: AuthUser,
    page: web::Query<Pagination>,
) -> Result<HttpResponse> {
    personal(&state, &user, PersonalList::Authored, &page).await
}

/// GET /api/v1/users/me/bookmarks
pub async fn my_bookmarks(
    state: web::Data<AppState>,
    user: AuthUser,
    page: web::Query<Pagination>,
) -> Result<HttpResponse> {
    personal(&state, &user, PersonalList::Bookmarked, &page).await
}

/// GET /api/v1/users/me/likes
pub async fn my_likes(
    state: web::Data<AppState>,
    user: AuthUser,
    page: web::Query<Pagination>,
) -> Result<HttpResponse> {
    personal(&state, &user, PersonalList::Liked, &page).await
}
