/// Category and tag management
use crate::db::{categories, tags};
use crate::error::{AppError, Result};
use crate::models::{Category, CategoryWithCount, TagWithCount};
use crate::services::slug::{next_available, slugify_or};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

const MAX_CATEGORY_SLUG_LEN: usize = 72;

pub struct TaxonomyService {
    pool: PgPool,
}

impl TaxonomyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryWithCount>> {
        Ok(categories::list_with_counts(&self.pool).await?)
    }

    pub async fn get_category(&self, slug: &str) -> Result<CategoryWithCount> {
        categories::find_by_slug(&self.pool, slug)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
    }

    /// Name must be unique; the slug gets a numeric suffix when taken
    pub async fn create_category(&self, name: &str, description: Option<&str>) -> Result<Category> {
        let name = name.trim();
        let slug = self.free_slug(name, None).await?;
        let category = categories::create(&self.pool, name, &slug, description).await?;
        info!(category_id = %category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Category> {
        let current = categories::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

        let name = name.map(str::trim).unwrap_or(&current.name);
        let slug = if name == current.name {
            current.slug.clone()
        } else {
            self.free_slug(name, Some(id)).await?
        };
        let description = description.or(current.description.as_deref());

        let category = categories::update(&self.pool, id, name, &slug, description)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;
        info!(category_id = %id, slug = %category.slug, "Category updated");
        Ok(category)
    }

    /// Posts in the category become uncategorized
    pub async fn delete_category(&self, id: Uuid) -> Result<()> {
        if !categories::delete(&self.pool, id).await? {
            return Err(AppError::NotFound("Category not found".to_string()));
        }
        info!(category_id = %id, "Category deleted");
        Ok(())
    }

    pub async fn list_tags(&self) -> Result<Vec<TagWithCount>> {
        Ok(tags::list_with_counts(&self.pool).await?)
    }

    pub async fn delete_tag(&self, id: Uuid) -> Result<()> {
        if !tags::delete(&self.pool, id).await? {
            return Err(AppError::NotFound("Tag not found".to_string()));
        }
        info!(tag_id = %id, "Tag deleted");
        Ok(())
    }

    async fn free_slug(&self, name: &str, exclude: Option<Uuid>) -> Result<String> {
        let base = slugify_or(name, "category", MAX_CATEGORY_SLUG_LEN);
        let taken = categories::slugs_with_prefix(&self.pool, &base, exclude).await?;
        Ok(next_available(&base, &taken))
    }
}
