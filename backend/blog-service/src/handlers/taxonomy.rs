/// Category and tag handlers
use crate::error::Result;
use crate::middleware::AdminUser;
use crate::services::TaxonomyService;
use crate::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// GET /api/v1/categories
pub async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse> {
    let categories = TaxonomyService::new(state.db.clone()).list_categories().await?;
    Ok(HttpResponse::Ok().json(categories))
}

/// GET /api/v1/categories/{slug}
pub async fn get_category(state: web::Data<AppState>, slug: web::Path<String>) -> Result<HttpResponse> {
    let category = TaxonomyService::new(state.db.clone())
        .get_category(&slug)
        .await?;
    Ok(HttpResponse::Ok().json(category))
}

/// POST /api/v1/categories
pub async fn create_category(
    state: web::Data<AppState>,
    _admin: AdminUser,
    req: web::Json<CreateCategoryRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let category = TaxonomyService::new(state.db.clone())
        .create_category(&req.name, req.description.as_deref())
        .await?;
    Ok(HttpResponse::Created().json(category))
}

/// PATCH /api/v1/categories/{id}
pub async fn update_category(
    state: web::Data<AppState>,
    _admin: AdminUser,
    category_id: web::Path<Uuid>,
    req: web::Json<UpdateCategoryRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let category = TaxonomyService::new(state.db.clone())
        .update_category(*category_id, req.name.as_deref(), req.description.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(category))
}

/// DELETE /api/v1/categories/{id}
pub async fn delete_category(
    state: web::Data<AppState>,
    _admin: AdminUser,
    category_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    TaxonomyService::new(state.db.clone())
        .delete_category(*category_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/tags
pub async fn list_tags(state: web::Data<AppState>) -> Result<HttpResponse> {
    let tags = TaxonomyService::new(state.db.clone()).list_tags().await?;
    Ok(HttpResponse::Ok().json(tags))
}

/// DELETE /api/v1/tags/{id}
pub async fn delete_tag(
    state: web::Data<AppState>,
    _admin: AdminUser,
    tag_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    TaxonomyService::new(state.db.clone()).delete_tag(*tag_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
