use chrono::Utc;

use real_core::model::{Like, LikeError, LikeStatus, PostError, UserError};

use super::{access_denial, Repositories, Result};

#[derive(Clone)]
pub struct LikeManager {
    repos: Repositories,
}

impl LikeManager {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn get_like(&self, liked_by_user_id: &str, post_id: &str) -> Result<Option<Like>> {
        Ok(self.repos.likes.get_like(liked_by_user_id, post_id).await?)
    }

    pub async fn like_post(
        &self,
        user_id: &str,
        post_id: &str,
        like_status: LikeStatus,
    ) -> Result<Like> {
        let post = self
            .repos
            .posts
            .get_post(post_id)
            .await?
            .ok_or_else(|| PostError::DoesNotExist(post_id.to_string()))?;
        let liker = self
            .repos
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| UserError::DoesNotExist(user_id.to_string()))?;
        let owner = self
            .repos
            .users
            .get_user(&post.posted_by_user_id)
            .await?
            .ok_or_else(|| UserError::DoesNotExist(post.posted_by_user_id.clone()))?;

        let cannot = |reason: &str| LikeError::CannotLike {
            post_id: post_id.to_string(),
            reason: reason.to_string(),
        };
        if !post.is_completed() {
            return Err(cannot("post is not completed").into());
        }
        if post.likes_disabled {
            return Err(cannot("likes are disabled on the post").into());
        }
        if owner.likes_disabled {
            return Err(cannot("the post owner has disabled likes").into());
        }
        if liker.likes_disabled {
            return Err(cannot("the user has disabled likes").into());
        }
        if let Some(reason) = access_denial(&self.repos, user_id, &owner).await? {
            return Err(cannot(reason).into());
        }
        if self.repos.likes.get_like(user_id, post_id).await?.is_some() {
            return Err(LikeError::AlreadyLiked {
                user_id: user_id.to_string(),
                post_id: post_id.to_string(),
            }
            .into());
        }

        let like = Like {
            liked_by_user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            posted_by_user_id: post.posted_by_user_id,
            like_status,
            liked_at: Utc::now(),
        };
        match self.repos.likes.create_like(&like).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {
                return Err(LikeError::AlreadyLiked {
                    user_id: user_id.to_string(),
                    post_id: post_id.to_string(),
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(%user_id, %post_id, status = %like_status, "Post liked");
        Ok(like)
    }

    pub async fn dislike_post(&self, user_id: &str, post_id: &str) -> Result<()> {
        match self.repos.likes.delete_like(user_id, post_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Err(LikeError::NotLiked {
                user_id: user_id.to_string(),
                post_id: post_id.to_string(),
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn dislike_all_of_post(&self, post_id: &str) -> Result<()> {
        for like in self.repos.likes.list_likes_by_post(post_id).await? {
            self.dislike_post(&like.liked_by_user_id, post_id).await?;
        }
        Ok(())
    }

    pub async fn dislike_all_by_user(&self, liked_by_user_id: &str) -> Result<()> {
        for like in self.repos.likes.list_likes_by_user(liked_by_user_id).await? {
            self.dislike_post(liked_by_user_id, &like.post_id).await?;
        }
        Ok(())
    }

    /// Removes the likes `liked_by_user_id` left on posts of `posted_by_user_id`.
    pub async fn dislike_all_by_user_from_user(
        &self,
        liked_by_user_id: &str,
        posted_by_user_id: &str,
    ) -> Result<()> {
        let likes = self
            .repos
            .likes
            .list_likes_by_user_of_user(liked_by_user_id, posted_by_user_id)
            .await?;
        for like in likes {
            self.dislike_post(liked_by_user_id, &like.post_id).await?;
        }
        Ok(())
    }

    /// Likes of a post in the order they were made.
    pub async fn list_likes_of_post(&self, post_id: &str) -> Result<Vec<Like>> {
        Ok(self.repos.likes.list_likes_by_post(post_id).await?)
    }
}
