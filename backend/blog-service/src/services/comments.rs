/// Comment service - threaded comments on published posts
use crate::db::{comments, posts, users};
use crate::error::{AppError, Result};
use crate::metrics::COMMENTS_CREATED_TOTAL;
use crate::models::{Actor, CommentRow, CommentThread, CommentView, Page, Post, RecentComment};
use crate::services::email::EmailService;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

pub const MAX_COMMENT_CHARS: usize = 2000;

/// Emails post authors about new comments
#[derive(Clone)]
pub struct CommentNotifier {
    pub email: EmailService,
    pub public_base_url: String,
}

pub struct CommentService {
    pool: PgPool,
    notifier: Option<CommentNotifier>,
}

impl CommentService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            notifier: None,
        }
    }

    pub fn with_notifier(pool: PgPool, notifier: CommentNotifier) -> Self {
        Self {
            pool,
            notifier: Some(notifier),
        }
    }

    /// Top-level comments oldest first, each carrying its replies
    pub async fn list_comments(&self, post_id: Uuid, viewer: Option<Actor>) -> Result<Vec<CommentThread>> {
        let post = self.visible_post(post_id).await?;
        if !post.is_published() && !viewer.map_or(false, |v| v.can_manage(post.author_id)) {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let rows = comments::list_for_post(&self.pool, post_id).await?;
        Ok(build_threads(rows))
    }

    /// Comment on a published post. A reply to a reply hangs off the top-level comment.
    pub async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<CommentView> {
        let content = validate_content(content)?;
        let post = self.visible_post(post_id).await?;
        if !post.is_published() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let parent_id = match parent_id {
            Some(pid) => {
                let parent = comments::find_by_id(&self.pool, pid)
                    .await?
                    .ok_or_else(|| AppError::BadRequest("Parent comment not found".to_string()))?;
                if parent.post_id != post_id {
                    return Err(AppError::BadRequest(
                        "Parent comment belongs to another post".to_string(),
                    ));
                }
                Some(parent.parent_id.unwrap_or(parent.id))
            }
            None => None,
        };

        let comment = comments::insert(&self.pool, post_id, author_id, parent_id, content).await?;
        COMMENTS_CREATED_TOTAL.inc();
        info!(comment_id = %comment.id, post_id = %post_id, user_id = %author_id, "Comment created");

        let row = comments::find_row_by_id(&self.pool, comment.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        if post.author_id != author_id {
            self.notify_author(&post, &row);
        }

        Ok(row.into())
    }

    /// Only the comment author may edit
    pub async fn update_comment(&self, id: Uuid, user_id: Uuid, content: &str) -> Result<CommentView> {
        let content = validate_content(content)?;
        let comment = comments::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
        if comment.author_id != user_id {
            return Err(AppError::Forbidden("Not allowed to edit this comment".to_string()));
        }

        comments::update_content(&self.pool, id, content).await?;
        let row = comments::find_row_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
        Ok(row.into())
    }

    /// Comment author, post author or admin. Replies are removed with the comment.
    pub async fn delete_comment(&self, id: Uuid, actor: Actor) -> Result<()> {
        let comment = comments::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        let allowed = actor.can_manage(comment.author_id)
            || posts::find_by_id(&self.pool, comment.post_id)
                .await?
                .map_or(false, |p| p.author_id == actor.user_id);
        if !allowed {
            return Err(AppError::Forbidden("Not allowed to delete this comment".to_string()));
        }

        comments::delete(&self.pool, id).await?;
        info!(comment_id = %id, user_id = %actor.user_id, "Comment deleted");
        Ok(())
    }

    /// Newest comments across the site, for moderation
    pub async fn recent_comments(&self, limit: i64, offset: i64) -> Result<Page<RecentComment>> {
        let (items, total) = comments::recent(&self.pool, limit, offset).await?;
        Ok(Page::new(items, total, offset))
    }

    async fn visible_post(&self, post_id: Uuid) -> Result<Post> {
        posts::find_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    fn notify_author(&self, post: &Post, comment: &CommentRow) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        if !notifier.email.is_enabled() {
            return;
        }

        let pool = self.pool.clone();
        let author_id = post.author_id;
        let post_title = post.title.clone();
        let post_url = format!("{}/posts/{}", notifier.public_base_url, post.slug);
        let commenter = comment
            .author_display_name
            .clone()
            .unwrap_or_else(|| comment.author_username.clone());
        let content = comment.content.clone();

        tokio::spawn(async move {
            let author = match users::find_by_id(&pool, author_id).await {
                Ok(Some(author)) => author,
                Ok(None) => return,
                Err(e) => {
                    warn!(user_id = %author_id, error = %e, "Failed to load post author for notification");
                    return;
                }
            };
            if let Err(e) = notifier
                .email
                .send_comment_notification(&author.email, &post_title, &post_url, &commenter, &content)
                .await
            {
                warn!(user_id = %author_id, error = %e, "Failed to send comment notification");
            }
        });
    }
}

fn validate_content(content: &str) -> Result<&str> {
    let content = content.trim();
    let len = content.chars().count();
    if len == 0 {
        return Err(AppError::Validation("Comment cannot be empty".to_string()));
    }
    if len > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_CHARS
        )));
    }
    Ok(content)
}

/// Group rows (oldest first) into one level of threads.
///
/// A reply whose parent is missing from `rows` is shown as a top-level comment.
pub fn build_threads(rows: Vec<CommentRow>) -> Vec<CommentThread> {
    let top_level: Vec<Uuid> = rows
        .iter()
        .filter(|r| r.parent_id.is_none())
        .map(|r| r.id)
        .collect();

    let mut threads: Vec<CommentThread> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut replies: Vec<CommentRow> = Vec::new();

    for row in rows {
        match row.parent_id {
            Some(pid) if top_level.contains(&pid) => replies.push(row),
            _ => {
                index.insert(row.id, threads.len());
                threads.push(CommentThread {
                    comment: row.into(),
                    replies: Vec::new(),
                });
            }
        }
    }

    for reply in replies {
        if let Some(pid) = reply.parent_id {
            if let Some(&i) = index.get(&pid) {
                threads[i].replies.push(reply.into());
            }
        }
    }

    threads
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn row(id: Uuid, parent_id: Option<Uuid>, minutes: i64) -> CommentRow {
        let at = Utc::now() + Duration::minutes(minutes);
        CommentRow {
            id,
            post_id: Uuid::nil(),
            parent_id,
            content: format!("comment {minutes}"),
            author_id: Uuid::new_v4(),
            author_username: "reader".to_string(),
            author_display_name: None,
            author_avatar_url: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn replies_nest_under_their_parent_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let r1 = Uuid::new_v4();
        let r2 = Uuid::new_v4();
        let rows = vec![
            row(a, None, 0),
            row(b, None, 1),
            row(r1, Some(a), 2),
            row(r2, Some(a), 3),
        ];

        let threads = build_threads(rows);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, a);
        assert_eq!(
            threads[0].replies.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![r1, r2]
        );
        assert!(threads[1].replies.is_empty());
    }

    #[test]
    fn orphan_reply_is_promoted() {
        let orphan = Uuid::new_v4();
        let threads = build_threads(vec![row(orphan, Some(Uuid::new_v4()), 0)]);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].comment.id, orphan);
    }

    #[test]
    fn content_limits() {
        assert!(validate_content("   ").is_err());
        assert!(validate_content(&"x".repeat(MAX_COMMENT_CHARS + 1)).is_err());
        assert_eq!(validate_content("  hi  ").unwrap(), "hi");
    }
}
