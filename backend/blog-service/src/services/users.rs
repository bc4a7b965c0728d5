/// Profiles, personal lists and admin user management
use crate::db::{self, users};
use crate::error::{AppError, Result};
use crate::models::{
    AdminUserView, Page, PostFilter, PostSummary, UserProfile, UserResponse, ROLE_ADMIN,
    ROLE_USER, STATUS_PUBLISHED,
};
use crate::services::posts::PostService;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

/// Which of a user's own post lists to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalList {
    Authored,
    Liked,
    Bookmarked,
}

/// Fields a user may change on their own profile; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges<'a> {
    pub display_name: Option<&'a str>,
    pub bio: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn me(&self, user_id: Uuid) -> Result<UserResponse> {
        users::find_by_id(&self.pool, user_id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn get_profile(&self, username: &str) -> Result<UserProfile> {
        users::get_profile(&self.pool, username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Published posts by `username`
    pub async fn list_user_posts(&self, username: &str, limit: i64, offset: i64) -> Result<Page<PostSummary>> {
        let profile = self.get_profile(username).await?;
        let filter = PostFilter {
            author_id: Some(profile.id),
            ..PostFilter::published()
        };
        PostService::new(self.pool.clone())
            .list_posts(&filter, limit, offset)
            .await
    }

    pub async fn update_profile(&self, user_id: Uuid, changes: ProfileChanges<'_>) -> Result<UserResponse> {
        let user = users::update_profile(
            &self.pool,
            user_id,
            changes.display_name.map(str::trim),
            changes.bio.map(str::trim),
            changes.avatar_url.map(str::trim),
        )
        .await?;
        info!(user_id = %user_id, "Profile updated");
        Ok(user.into())
    }

    /// Authored posts include drafts; liked and bookmarked lists only show published posts
    pub async fn personal_posts(
        &self,
        user_id: Uuid,
        list: PersonalList,
        limit: i64,
        offset: i64,
    ) -> Result<Page<PostSummary>> {
        let published = Some(STATUS_PUBLISHED.to_string());
        let filter = match list {
            PersonalList::Authored => PostFilter {
                author_id: Some(user_id),
                ..PostFilter::default()
            },
            PersonalList::Liked => PostFilter {
                status: published,
                liked_by: Some(user_id),
                ..PostFilter::default()
            },
            PersonalList::Bookmarked => PostFilter {
                status: published,
                bookmarked_by: Some(user_id),
                ..PostFilter::default()
            },
        };
        PostService::new(self.pool.clone())
            .list_posts(&filter, limit, offset)
            .await
    }

    pub async fn list_users(&self, query: Option<&str>, limit: i64, offset: i64) -> Result<Page<AdminUserView>> {
        let pattern = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(db::like_pattern);
        let (items, total) = users::list_users(&self.pool, pattern.as_deref(), limit, offset).await?;
        Ok(Page::new(items, total, offset))
    }

    pub async fn set_role(&self, acting_admin: Uuid, user_id: Uuid, role: &str) -> Result<()> {
        if role != ROLE_USER && role != ROLE_ADMIN {
            return Err(AppError::Validation("role must be 'user' or 'admin'".to_string()));
        }
        if acting_admin == user_id && role != ROLE_ADMIN {
            return Err(AppError::BadRequest("You cannot demote yourself".to_string()));
        }
        if !users::set_role(&self.pool, user_id, role).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        info!(admin_id = %acting_admin, user_id = %user_id, role = %role, "User role changed");
        Ok(())
    }

    /// Removes the account together with its posts, comments and sessions
    pub async fn delete_user(&self, acting_admin: Uuid, user_id: Uuid) -> Result<()> {
        if acting_admin == user_id {
            return Err(AppError::BadRequest("You cannot delete your own account".to_string()));
        }
        if !users::delete_user(&self.pool, user_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        info!(admin_id = %acting_admin, user_id = %user_id, "User deleted");
        Ok(())
    }
}
