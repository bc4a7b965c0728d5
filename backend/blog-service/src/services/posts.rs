/// Post service - creation, listing, editing and publication of posts
use crate::db::{bookmarks, categories, likes, posts, tags};
use crate::error::{AppError, Result};
use crate::metrics::POSTS_CREATED_TOTAL;
use crate::models::{
    Actor, CreatePostRequest, Page, PostDetail, PostFilter, PostRow, PostStatus, PostSummary, Tag,
    UpdatePostRequest, STATUS_DRAFT, STATUS_PUBLISHED,
};
use crate::services::slug::{next_available, slugify_or};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

pub const EXCERPT_CHARS: usize = 160;
pub const WORDS_PER_MINUTE: usize = 200;
pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_CHARS: usize = 32;
const MAX_SLUG_LEN: usize = 200;
const SLUG_ATTEMPTS: usize = 3;
/// Leaves room for a numeric suffix within the 48-character column
const MAX_TAG_SLUG_LEN: usize = 40;

pub struct PostService {
    pool: PgPool,
}

impl PostService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a post owned by `author_id`, draft unless `publish` is set
    pub async fn create_post(&self, author_id: Uuid, req: &CreatePostRequest) -> Result<PostDetail> {
        let tag_names = normalize_tags(&req.tags)?;
        if let Some(category_id) = req.category_id {
            if !categories::exists(&self.pool, category_id).await? {
                return Err(AppError::NotFound("Category not found".to_string()));
            }
        }

        let base = slugify_or(&req.title, "post", MAX_SLUG_LEN);
        let excerpt = match req.excerpt.as_deref().map(str::trim) {
            Some(e) if !e.is_empty() => e.to_string(),
            _ => make_excerpt(&req.content),
        };
        let status = if req.publish { STATUS_PUBLISHED } else { STATUS_DRAFT };

        let mut attempt = 0;
        let post = loop {
            attempt += 1;
            let mut tx = self.pool.begin().await?;

            let taken = posts::slugs_with_prefix(&mut *tx, &base, None).await?;
            let slug = next_available(&base, &taken);
            let new_post = posts::NewPost {
                author_id,
                category_id: req.category_id,
                title: req.title.trim(),
                slug: &slug,
                excerpt: &excerpt,
                content: &req.content,
                cover_image_url: req.cover_image_url.as_deref(),
                status,
                reading_time_minutes: reading_time_minutes(&req.content),
            };

            match posts::insert(&mut *tx, &new_post).await {
                Ok(post) => {
                    attach_tags(&mut *tx, post.id, &tag_names).await?;
                    tx.commit().await?;
                    break post;
                }
                Err(e) if is_slug_conflict(&e) && attempt < SLUG_ATTEMPTS => {
                    warn!(slug = %slug, attempt, "Slug taken concurrently, retrying");
                    tx.rollback().await?;
                }
                Err(e) => return Err(e.into()),
            }
        };

        POSTS_CREATED_TOTAL.inc();
        info!(post_id = %post.id, author_id = %author_id, slug = %post.slug, status, "Post created");

        self.detail_by_id(post.id, Some(author_id)).await
    }

    /// Filtered page of posts with their tags
    pub async fn list_posts(
        &self,
        filter: &PostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Page<PostSummary>> {
        let (rows, total) = posts::list(&self.pool, filter, limit, offset).await?;
        let items = self.with_tags(rows).await?;
        Ok(Page::new(items, total, offset))
    }

    /// Single post by slug. Drafts are only visible to their author or an admin.
    pub async fn get_post(&self, slug: &str, viewer: Option<Actor>) -> Result<PostDetail> {
        let row = posts::find_row_by_slug(&self.pool, slug)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        if !row.is_published() && !viewer.map_or(false, |v| v.can_manage(row.author_id)) {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        self.detail(row, viewer.map(|v| v.user_id)).await
    }

    pub async fn update_post(&self, id: Uuid, actor: Actor, req: &UpdatePostRequest) -> Result<PostDetail> {
        let current = posts::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        if !actor.can_manage(current.author_id) {
            return Err(AppError::Forbidden("Not allowed to edit this post".to_string()));
        }

        let tag_names = req.tags.as_deref().map(normalize_tags).transpose()?;
        if let Some(category_id) = req.category_id {
            if !categories::exists(&self.pool, category_id).await? {
                return Err(AppError::NotFound("Category not found".to_string()));
            }
        }

        let title = req.title.as_deref().map(str::trim).unwrap_or(&current.title);
        let content = req.content.as_deref().unwrap_or(&current.content);
        let excerpt = match req.excerpt.as_deref().map(str::trim) {
            Some("") => make_excerpt(content),
            Some(e) => e.to_string(),
            None => current.excerpt.clone(),
        };
        let cover_image_url = req
            .cover_image_url
            .as_deref()
            .or(current.cover_image_url.as_deref());
        let category_id = req.category_id.or(current.category_id);

        let new_base = match (&req.slug, &req.title) {
            (Some(slug), _) => Some(slugify_or(slug, "post", MAX_SLUG_LEN)),
            (None, Some(_)) if !current.is_published() && title != current.title => {
                Some(slugify_or(title, "post", MAX_SLUG_LEN))
            }
            _ => None,
        }
        .filter(|base| *base != current.slug);

        let mut attempt = 0;
        let post = loop {
            attempt += 1;
            let mut tx = self.pool.begin().await?;

            let slug = match &new_base {
                Some(base) => {
                    let taken = posts::slugs_with_prefix(&mut *tx, base, Some(id)).await?;
                    next_available(base, &taken)
                }
                None => current.slug.clone(),
            };
            let changes = posts::PostChanges {
                category_id,
                title,
                slug: &slug,
                excerpt: &excerpt,
                content,
                cover_image_url,
                reading_time_minutes: reading_time_minutes(content),
            };

            match posts::update(&mut *tx, id, &changes).await {
                Ok(post) => {
                    if let Some(names) = &tag_names {
                        attach_tags(&mut *tx, id, names).await?;
                    }
                    tx.commit().await?;
                    break post;
                }
                Err(e) if is_slug_conflict(&e) && new_base.is_some() && attempt < SLUG_ATTEMPTS => {
                    warn!(slug = %slug, attempt, "Slug taken concurrently, retrying");
                    tx.rollback().await?;
                }
                Err(e) => return Err(e.into()),
            }
        };

        info!(post_id = %id, user_id = %actor.user_id, slug = %post.slug, "Post updated");
        self.detail_by_id(id, Some(actor.user_id)).await
    }

    /// Publish or unpublish; the first publication date is kept
    pub async fn set_status(&self, id: Uuid, actor: Actor, status: PostStatus) -> Result<PostDetail> {
        let current = posts::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        if !actor.can_manage(current.author_id) {
            return Err(AppError::Forbidden("Not allowed to change this post".to_string()));
        }

        posts::set_status(&self.pool, id, status.as_str())
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        info!(post_id = %id, user_id = %actor.user_id, status = status.as_str(), "Post status changed");
        self.detail_by_id(id, Some(actor.user_id)).await
    }

    pub async fn delete_post(&self, id: Uuid, actor: Actor) -> Result<()> {
        let current = posts::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        if !actor.can_manage(current.author_id) {
            return Err(AppError::Forbidden("Not allowed to delete this post".to_string()));
        }

        posts::delete(&self.pool, id).await?;
        info!(post_id = %id, user_id = %actor.user_id, "Post deleted");
        Ok(())
    }

    pub async fn set_featured(&self, id: Uuid, featured: bool) -> Result<()> {
        if !posts::set_featured(&self.pool, id, featured).await? {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        info!(post_id = %id, featured, "Post featured flag changed");
        Ok(())
    }

    async fn detail_by_id(&self, id: Uuid, viewer: Option<Uuid>) -> Result<PostDetail> {
        let row = posts::find_row_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        self.detail(row, viewer).await
    }

    async fn detail(&self, row: PostRow, viewer: Option<Uuid>) -> Result<PostDetail> {
        let tags = tags::for_posts(&self.pool, &[row.id])
            .await?
            .into_iter()
            .map(Tag::from)
            .collect();

        let (liked, bookmarked) = match viewer {
            Some(user_id) => (
                likes::is_liked(&self.pool, row.id, user_id).await?,
                bookmarks::is_bookmarked(&self.pool, row.id, user_id).await?,
            ),
            None => (false, false),
        };

        Ok(row.into_detail(tags, liked, bookmarked))
    }

    async fn with_tags(&self, rows: Vec<PostRow>) -> Result<Vec<PostSummary>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut by_post: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for tag in tags::for_posts(&self.pool, &ids).await? {
            by_post.entry(tag.post_id).or_default().push(tag.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let tags = by_post.remove(&row.id).unwrap_or_default();
                row.into_summary(tags)
            })
            .collect())
    }
}

async fn attach_tags(conn: &mut PgConnection, post_id: Uuid, names: &[String]) -> Result<()> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let id = tag_id(&mut *conn, name).await?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    tags::set_post_tags(&mut *conn, post_id, &ids).await?;
    Ok(())
}

/// Existing tag with the same name (any case), or a new one with a free slug
async fn tag_id(conn: &mut PgConnection, name: &str) -> Result<Uuid> {
    let base = slugify_or(name, "tag", MAX_TAG_SLUG_LEN);
    for attempt in 1..=SLUG_ATTEMPTS {
        if let Some(id) = tags::find_id_by_name(&mut *conn, name).await? {
            return Ok(id);
        }
        let taken = tags::slugs_with_prefix(&mut *conn, &base).await?;
        let slug = next_available(&base, &taken);
        if let Some(id) = tags::insert(&mut *conn, name, &slug).await? {
            return Ok(id);
        }
        warn!(tag = %name, slug = %slug, attempt, "Tag created concurrently, retrying");
    }
    Err(AppError::Conflict(format!("Tag '{}' could not be created", name)))
}

fn is_slug_conflict(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.constraint() == Some("posts_slug_key"))
}

/// First `EXCERPT_CHARS` characters of whitespace-collapsed content
pub fn make_excerpt(content: &str) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= EXCERPT_CHARS {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(EXCERPT_CHARS).collect();
    format!("{}…", cut.trim_end())
}

/// Whole minutes at `WORDS_PER_MINUTE`, never less than one
pub fn reading_time_minutes(content: &str) -> i32 {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as i32
}

/// Trim, drop blanks and case-insensitive duplicates, enforce limits
pub fn normalize_tags(input: &[String]) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for raw in input {
        let name = raw.trim();
        if name.is_empty() {
            continue;
        }
        if name.chars().count() > MAX_TAG_CHARS {
            return Err(AppError::Validation(format!(
                "Tag '{}' is longer than {} characters",
                name, MAX_TAG_CHARS
            )));
        }
        if !out.iter().any(|t| t.to_lowercase() == name.to_lowercase()) {
            out.push(name.to_string());
        }
    }
    if out.len() > MAX_TAGS {
        return Err(AppError::Validation(format!(
            "A post can have at most {} tags",
            MAX_TAGS
        )));
    }
    Ok(out)
}
