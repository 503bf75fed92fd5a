use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use real_core::model::{
    is_crowdsourced_forced_removal_criteria_met, Comment, CommentCounter, CommentError, Flag,
    FlaggedItem, PostError, UserError,
};

use super::{access_denial, fail_soft, FlagManager, ManagerConfig, Repositories, Result};

#[derive(Clone)]
pub struct CommentManager {
    repos: Repositories,
    flag: FlagManager,
    config: Arc<ManagerConfig>,
}

impl CommentManager {
    pub fn new(repos: Repositories, flag: FlagManager, config: Arc<ManagerConfig>) -> Self {
        Self {
            repos,
            flag,
            config,
        }
    }

    pub async fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>> {
        Ok(self.repos.comments.get_comment(comment_id).await?)
    }

    /// Comments on a post, oldest first.
    pub async fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        Ok(self.repos.comments.list_comments_by_post(post_id).await?)
    }

    pub async fn add_comment(&self, user_id: &str, post_id: &str, text: &str) -> Result<Comment> {
        let post = self
            .repos
            .posts
            .get_post(post_id)
            .await?
            .ok_or_else(|| PostError::DoesNotExist(post_id.to_string()))?;
        if self.repos.users.get_user(user_id).await?.is_none() {
            return Err(UserError::DoesNotExist(user_id.to_string()).into());
        }
        let owner = self
            .repos
            .users
            .get_user(&post.posted_by_user_id)
            .await?
            .ok_or_else(|| UserError::DoesNotExist(post.posted_by_user_id.clone()))?;

        let cannot = |reason: &str| CommentError::CannotComment {
            post_id: post_id.to_string(),
            reason: reason.to_string(),
        };
        if text.trim().is_empty() {
            return Err(cannot("comment text is required").into());
        }
        if !post.is_completed() {
            return Err(cannot("post is not completed").into());
        }
        if post.comments_disabled {
            return Err(cannot("comments are disabled on the post").into());
        }
        if owner.comments_disabled {
            return Err(cannot("the post owner has disabled comments").into());
        }
        if access_denial(&self.repos, user_id, &owner).await?.is_some() {
            return Err(CommentError::NoAccess {
                post_id: post_id.to_string(),
                user_id: user_id.to_string(),
            }
            .into());
        }

        let comment = Comment {
            comment_id: Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
            flag_count: 0,
        };
        self.repos.comments.create_comment(&comment).await?;
        tracing::debug!(comment_id = %comment.comment_id, %post_id, %user_id, "Comment added");
        Ok(comment)
    }

    async fn remove(&self, comment: &Comment) -> Result<()> {
        self.flag
            .unflag_all_on_item(&FlaggedItem::Comment(comment.comment_id.clone()))
            .await?;
        match self.repos.comments.delete_comment(&comment.comment_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a comment on behalf of its author or the post's owner.
    pub async fn delete_comment(&self, comment_id: &str, user_id: &str) -> Result<()> {
        let comment = self
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| CommentError::DoesNotExist(comment_id.to_string()))?;
        let post_owner = self
            .repos
            .posts
            .get_post(&comment.post_id)
            .await?
            .map(|p| p.posted_by_user_id);
        if comment.user_id != user_id && post_owner.as_deref() != Some(user_id) {
            return Err(CommentError::NotAuthorized {
                comment_id: comment_id.to_string(),
                user_id: user_id.to_string(),
            }
            .into());
        }
        self.remove(&comment).await
    }

    pub async fn delete_all_on_post(&self, post_id: &str) -> Result<()> {
        for comment in self.repos.comments.list_comments_by_post(post_id).await? {
            self.remove(&comment).await?;
        }
        Ok(())
    }

    pub async fn delete_all_by_user(&self, user_id: &str) -> Result<()> {
        for comment in self.repos.comments.list_comments_by_user(user_id).await? {
            self.remove(&comment).await?;
        }
        Ok(())
    }

    pub async fn flag_comment(&self, comment_id: &str, user_id: &str) -> Result<Flag> {
        let comment = self
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| CommentError::DoesNotExist(comment_id.to_string()))?;
        let post = self
            .repos
            .posts
            .get_post(&comment.post_id)
            .await?
            .ok_or_else(|| PostError::DoesNotExist(comment.post_id.clone()))?;
        let owner = self
            .repos
            .users
            .get_user(&post.posted_by_user_id)
            .await?
            .ok_or_else(|| UserError::DoesNotExist(post.posted_by_user_id.clone()))?;
        if access_denial(&self.repos, user_id, &owner).await?.is_some() {
            return Err(CommentError::NoAccess {
                post_id: post.post_id,
                user_id: user_id.to_string(),
            }
            .into());
        }
        self.flag
            .flag(FlaggedItem::Comment(comment.comment_id), user_id, &comment.user_id)
            .await
    }

    pub async fn on_flag_add(&self, comment_id: &str, flagged_by_user_id: &str) -> Result<()> {
        let flag_count = match self
            .repos
            .comments
            .increment_comment_count(comment_id, CommentCounter::Flag)
            .await
        {
            Ok(count) => count,
            Err(e) if e.is_not_found() => {
                tracing::warn!(%comment_id, "Flagged comment no longer exists");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let by_admin = self
            .repos
            .users
            .get_user(flagged_by_user_id)
            .await?
            .is_some_and(|u| self.config.is_flag_admin(&u.username));
        let Some(comment) = self.get_comment(comment_id).await? else {
            return Ok(());
        };
        let viewed_by_count = self
            .repos
            .posts
            .get_post(&comment.post_id)
            .await?
            .map(|p| p.viewed_by_count)
            .unwrap_or(0);

        if by_admin || is_crowdsourced_forced_removal_criteria_met(flag_count, viewed_by_count) {
            tracing::warn!(%comment_id, flag_count, viewed_by_count, by_admin, "Force deleting comment");
            self.remove(&comment).await?;
        }
        Ok(())
    }

    pub async fn on_flag_delete(&self, comment_id: &str) -> Result<()> {
        let result = self
            .repos
            .comments
            .decrement_comment_count(comment_id, CommentCounter::Flag)
            .await;
        fail_soft(result, CommentCounter::Flag.attribute_name(), "comment", comment_id)?;
        Ok(())
    }
}
