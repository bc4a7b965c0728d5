use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Site "about" page (single row)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AboutPage {
    pub title: String,
    pub content: String,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}
