use crate::db::about;
use crate::error::{AppError, Result};
use crate::models::AboutPage;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

pub struct AboutService {
    pool: PgPool,
}

impl AboutService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self) -> Result<AboutPage> {
        about::get(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("About page not found".to_string()))
    }

    pub async fn upsert(&self, title: &str, content: &str, updated_by: Uuid) -> Result<AboutPage> {
        let page = about::upsert(&self.pool, title.trim(), content, updated_by).await?;
        info!(updated_by = %updated_by, "About page updated");
        Ok(page)
    }
}
