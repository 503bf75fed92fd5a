use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use real_core::model::{
    is_comment_unviewed, is_crowdsourced_forced_removal_criteria_met, is_owner_view_increase,
    like_counter, validate_post_status_transition, AlbumError, CardSpec, Comment, Flag,
    FlaggedItem, Like, Post, PostCounter, PostError, PostStatus, PostType, UserError, View,
    POST_VIEWS_CARD_THRESHOLD,
};

use super::{
    access_denial, fail_soft, CardManager, CommentManager, FlagManager, LikeManager,
    ManagerConfig, Repositories, Result, ViewManager,
};

/// The managers a [`PostManager`] delegates to.
#[derive(Clone)]
pub struct PostDependencies {
    pub card: CardManager,
    pub comment: CommentManager,
    pub flag: FlagManager,
    pub like: LikeManager,
    pub view: ViewManager,
}

/// Input for [`PostManager::add_post`].
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Generated when not supplied.
    pub post_id: Option<String>,
    pub post_type: PostType,
    pub text: Option<String>,
    pub album_id: Option<String>,
    /// The post expires this long after it was posted.
    pub lifetime: Option<Duration>,
    pub likes_disabled: bool,
    pub comments_disabled: bool,
}

impl NewPost {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::of_type(PostType::TextOnly)
        }
    }

    pub fn image() -> Self {
        Self::of_type(PostType::Image)
    }

    fn of_type(post_type: PostType) -> Self {
        Self {
            post_id: None,
            post_type,
            text: None,
            album_id: None,
            lifetime: None,
            likes_disabled: false,
            comments_disabled: false,
        }
    }
}

/// Editable post fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetails {
    pub text: Option<String>,
    pub likes_disabled: Option<bool>,
    pub comments_disabled: Option<bool>,
}

/// Manages posts and the counters and cards hanging off them.
#[derive(Clone)]
pub struct PostManager {
    repos: Repositories,
    deps: PostDependencies,
    config: Arc<ManagerConfig>,
}

impl PostManager {
    pub fn new(repos: Repositories, deps: PostDependencies, config: Arc<ManagerConfig>) -> Self {
        Self {
            repos,
            deps,
            config,
        }
    }

    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        Ok(self.repos.posts.get_post(post_id).await?)
    }

    /// Posts of a user, newest first.
    pub async fn list_posts(&self, user_id: &str, status: Option<PostStatus>) -> Result<Vec<Post>> {
        Ok(self.repos.posts.list_posts_by_user(user_id, status).await?)
    }

    pub async fn add_post(&self, user_id: &str, new_post: NewPost) -> Result<Post> {
        if self.repos.users.get_user(user_id).await?.is_none() {
            return Err(UserError::DoesNotExist(user_id.to_string()).into());
        }
        let text = new_post.text.filter(|t| !t.trim().is_empty());
        if new_post.post_type == PostType::TextOnly && text.is_none() {
            return Err(PostError::Invalid("text-only posts require text".to_string()).into());
        }
        if new_post.lifetime.is_some_and(|l| l <= Duration::zero()) {
            return Err(PostError::Invalid("lifetime must be positive".to_string()).into());
        }
        if let Some(album_id) = &new_post.album_id {
            let album = self
                .repos
                .albums
                .get_album(album_id)
                .await?
                .ok_or_else(|| AlbumError::DoesNotExist(album_id.clone()))?;
            if album.owned_by_user_id != user_id {
                return Err(AlbumError::NotOwner {
                    album_id: album_id.clone(),
                    user_id: user_id.to_string(),
                }
                .into());
            }
        }

        let post_id = new_post
            .post_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut post = Post::new(&post_id, user_id, new_post.post_type, Utc::now());
        post.text = text;
        post.album_id = new_post.album_id;
        post.likes_disabled = new_post.likes_disabled;
        post.comments_disabled = new_post.comments_disabled;
        if let Some(lifetime) = new_post.lifetime {
            post = post.with_lifetime(lifetime);
        }
        // Image posts complete once their upload has been processed.
        if post.post_type == PostType::TextOnly {
            post.post_status = PostStatus::Completed;
        }

        match self.repos.posts.create_post(&post).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {
                return Err(PostError::AlreadyExists(post_id).into())
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(%post_id, %user_id, status = %post.post_status, "Post added");
        Ok(post)
    }

    async fn owned(&self, post_id: &str, user_id: &str) -> Result<Post> {
        let post = self
            .get_post(post_id)
            .await?
            .ok_or_else(|| PostError::DoesNotExist(post_id.to_string()))?;
        if post.posted_by_user_id != user_id {
            return Err(PostError::NotOwner {
                post_id: post_id.to_string(),
                user_id: user_id.to_string(),
            }
            .into());
        }
        Ok(post)
    }

    async fn set_status(&self, mut post: Post, status: PostStatus) -> Result<Post> {
        validate_post_status_transition(&post.post_id, post.post_status, status)?;
        post.post_status = status;
        self.repos.posts.update_post(&post).await?;
        Ok(post)
    }

    pub async fn complete_post(&self, post_id: &str, user_id: &str) -> Result<Post> {
        let post = self.owned(post_id, user_id).await?;
        self.set_status(post, PostStatus::Completed).await
    }

    pub async fn archive_post(&self, post_id: &str, user_id: &str) -> Result<Post> {
        let post = self.owned(post_id, user_id).await?;
        self.set_status(post, PostStatus::Archived).await
    }

    /// Unlike completion, restoring only applies to archived posts.
    pub async fn restore_post(&self, post_id: &str, user_id: &str) -> Result<Post> {
        let post = self.owned(post_id, user_id).await?;
        if post.post_status != PostStatus::Archived {
            return Err(PostError::InvalidStatusTransition {
                post_id: post_id.to_string(),
                from: post.post_status,
                to: PostStatus::Completed,
            }
            .into());
        }
        self.set_status(post, PostStatus::Completed).await
    }

    pub async fn delete_post(&self, post_id: &str, user_id: &str) -> Result<()> {
        let post = self.owned(post_id, user_id).await?;
        self.delete(post).await
    }

    /// Removes a post and everything attached to it. The post is marked
    /// `DELETING` first so it drops out of feeds and counts right away.
    pub(crate) async fn delete(&self, post: Post) -> Result<()> {
        let post_id = post.post_id.clone();
        let post = if post.post_status == PostStatus::Deleting {
            post
        } else {
            self.set_status(post, PostStatus::Deleting).await?
        };

        self.deps.comment.delete_all_on_post(&post_id).await?;
        self.deps
            .flag
            .unflag_all_on_item(&FlaggedItem::Post(post_id.clone()))
            .await?;
        self.deps.like.dislike_all_of_post(&post_id).await?;
        self.deps.view.delete_views(&post_id).await?;
        match self.repos.posts.delete_post(&post_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!(%post_id, user_id = %post.posted_by_user_id, "Post deleted");
        Ok(())
    }

    pub async fn set_details(
        &self,
        post_id: &str,
        user_id: &str,
        details: PostDetails,
    ) -> Result<Post> {
        let mut post = self.owned(post_id, user_id).await?;
        if let Some(text) = details.text {
            if post.post_type == PostType::TextOnly && text.trim().is_empty() {
                return Err(PostError::Invalid("text-only posts require text".to_string()).into());
            }
            post.text = (!text.trim().is_empty()).then_some(text);
        }
        if let Some(likes_disabled) = details.likes_disabled {
            post.likes_disabled = likes_disabled;
        }
        if let Some(comments_disabled) = details.comments_disabled {
            post.comments_disabled = comments_disabled;
        }
        self.repos.posts.update_post(&post).await?;
        Ok(post)
    }

    /// Records one view of each post by `user_id`. Posts that are missing or
    /// not completed are skipped with a warning.
    pub async fn record_views(
        &self,
        user_id: &str,
        post_ids: &[String],
        viewed_at: DateTime<Utc>,
    ) -> Result<()> {
        for post_id in post_ids {
            match self.get_post(post_id).await? {
                Some(post) if post.is_completed() => {
                    self.deps
                        .view
                        .record_view_count(post_id, user_id, 1, viewed_at)
                        .await?;
                }
                Some(post) => {
                    tracing::warn!(%post_id, %user_id, status = %post.post_status, "Cannot record view on post that is not completed");
                }
                None => {
                    tracing::warn!(%post_id, %user_id, "Cannot record view on missing post");
                }
            }
        }
        Ok(())
    }

    /// Archives completed posts whose lifetime ran out. Returns how many
    /// were archived.
    pub async fn archive_expired_posts(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut archived = 0;
        for post in self.repos.posts.list_expired_posts(now).await? {
            let post_id = post.post_id.clone();
            match self.set_status(post, PostStatus::Archived).await {
                Ok(_) => archived += 1,
                Err(e) => tracing::warn!(%post_id, error = %e, "Failed to archive expired post"),
            }
        }
        if archived > 0 {
            tracing::info!(archived, "Archived expired posts");
        }
        Ok(archived)
    }

    pub async fn flag_post(&self, post_id: &str, user_id: &str) -> Result<Flag> {
        let post = self
            .get_post(post_id)
            .await?
            .ok_or_else(|| PostError::DoesNotExist(post_id.to_string()))?;
        let owner = self
            .repos
            .users
            .get_user(&post.posted_by_user_id)
            .await?
            .ok_or_else(|| UserError::DoesNotExist(post.posted_by_user_id.clone()))?;
        if access_denial(&self.repos, user_id, &owner).await?.is_some() {
            return Err(PostError::NoAccess {
                post_id: post_id.to_string(),
                user_id: user_id.to_string(),
            }
            .into());
        }
        self.deps
            .flag
            .flag(FlaggedItem::Post(post.post_id), user_id, &post.posted_by_user_id)
            .await
    }

    pub fn is_forced_removal_criteria_met(&self, post: &Post) -> bool {
        is_crowdsourced_forced_removal_criteria_met(post.flag_count, post.viewed_by_count)
    }

    /// Increments a post counter, warning instead of failing if the post
    /// has been deleted in the meantime.
    async fn increment(&self, post_id: &str, counter: PostCounter) -> Result<Option<u64>> {
        match self.repos.posts.increment_post_count(post_id, counter).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Failed to increment {} for post `{post_id}`", counter.attribute_name());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn decrement(&self, post_id: &str, counter: PostCounter) -> Result<Option<u64>> {
        let result = self.repos.posts.decrement_post_count(post_id, counter).await;
        Ok(fail_soft(result, counter.attribute_name(), "post", post_id)?)
    }

    async fn remove_post_cards(&self, user_id: &str, post_id: &str) -> Result<()> {
        for spec in CardSpec::post_cards(user_id, post_id) {
            self.deps.card.remove_card_by_spec_if_exists(&spec).await?;
        }
        Ok(())
    }

    pub async fn on_flag_add(&self, post_id: &str, flagged_by_user_id: &str) -> Result<()> {
        if self.increment(post_id, PostCounter::Flag).await?.is_none() {
            return Ok(());
        }
        let Some(post) = self.get_post(post_id).await? else {
            return Ok(());
        };
        let by_admin = self
            .repos
            .users
            .get_user(flagged_by_user_id)
            .await?
            .is_some_and(|u| self.config.is_flag_admin(&u.username));

        if post.is_completed() && (by_admin || self.is_forced_removal_criteria_met(&post)) {
            tracing::warn!(
                %post_id,
                flag_count = post.flag_count,
                viewed_by_count = post.viewed_by_count,
                by_admin,
                "Force archiving post"
            );
            self.set_status(post, PostStatus::Archived).await?;
        }
        Ok(())
    }

    pub async fn on_flag_delete(&self, post_id: &str) -> Result<()> {
        self.decrement(post_id, PostCounter::Flag).await?;
        Ok(())
    }

    pub async fn on_like_add(&self, like: &Like) -> Result<()> {
        let counter = like_counter(like.like_status);
        if self.increment(&like.post_id, counter).await?.is_none() {
            return Ok(());
        }
        if like.liked_by_user_id != like.posted_by_user_id {
            let spec = CardSpec::post_likes(&like.posted_by_user_id, &like.post_id);
            self.deps.card.add_or_update_card_by_spec(&spec).await?;
        }
        Ok(())
    }

    pub async fn on_like_delete(&self, like: &Like) -> Result<()> {
        self.decrement(&like.post_id, like_counter(like.like_status))
            .await?;
        Ok(())
    }

    pub async fn on_comment_add(&self, comment: &Comment) -> Result<()> {
        let Some(post) = self.get_post(&comment.post_id).await? else {
            tracing::warn!(comment_id = %comment.comment_id, post_id = %comment.post_id, "Comment added to missing post");
            return Ok(());
        };
        self.increment(&post.post_id, PostCounter::Comment).await?;
        if comment.user_id == post.posted_by_user_id {
            return Ok(());
        }

        let Some(unviewed) = self
            .increment(&post.post_id, PostCounter::CommentsUnviewed)
            .await?
        else {
            return Ok(());
        };
        self.repos
            .posts
            .set_last_unviewed_comment_at(&post.post_id, Some(comment.created_at))
            .await?;
        let spec = CardSpec::comment_activity(&post.posted_by_user_id, &post.post_id, unviewed);
        self.deps.card.add_or_update_card_by_spec(&spec).await?;
        Ok(())
    }

    pub async fn on_comment_delete(&self, comment: &Comment) -> Result<()> {
        self.decrement(&comment.post_id, PostCounter::Comment).await?;
        let Some(post) = self.get_post(&comment.post_id).await? else {
            return Ok(());
        };
        let owner_id = &post.posted_by_user_id;
        let owner_view = self.repos.views.get_view(&post.post_id, owner_id).await?;
        if !is_comment_unviewed(owner_id, comment, owner_view.as_ref()) {
            return Ok(());
        }

        match self
            .decrement(&post.post_id, PostCounter::CommentsUnviewed)
            .await?
        {
            Some(0) => {
                self.repos
                    .posts
                    .set_last_unviewed_comment_at(&post.post_id, None)
                    .await?;
                let spec = CardSpec::comment_activity(owner_id, &post.post_id, 0);
                self.deps.card.remove_card_by_spec_if_exists(&spec).await?;
            }
            Some(unviewed) => {
                let spec = CardSpec::comment_activity(owner_id, &post.post_id, unviewed);
                self.deps.card.add_or_update_card_by_spec(&spec).await?;
            }
            None => {}
        }
        Ok(())
    }

    /// First view of a post by a user other than its owner.
    pub async fn on_view_add(&self, view: &View) -> Result<()> {
        let Some(post) = self.get_post(&view.item_id).await? else {
            return Ok(());
        };
        if view.user_id == post.posted_by_user_id {
            return Ok(());
        }
        let viewed_by = self.increment(&post.post_id, PostCounter::ViewedBy).await?;
        if viewed_by == Some(POST_VIEWS_CARD_THRESHOLD) {
            let spec = CardSpec::post_views(&post.posted_by_user_id, &post.post_id);
            self.deps.card.add_or_update_card_by_spec(&spec).await?;
        }
        Ok(())
    }

    /// The owner looking at their post clears the unviewed-comment state
    /// and the cards about the post.
    pub async fn on_view_count_change_sync_counts_and_cards(
        &self,
        old: Option<&View>,
        new: Option<&View>,
    ) -> Result<()> {
        let Some(view) = new else {
            return Ok(());
        };
        let Some(post) = self.get_post(&view.item_id).await? else {
            // The owner is unknown once the post is gone, so only a growing
            // view count is treated as a possible owner view. Cards addressed
            // to a non-owner viewer simply do not exist.
            if is_owner_view_increase(&view.user_id, old, new) {
                self.remove_post_cards(&view.user_id, &view.item_id).await?;
            }
            return Ok(());
        };
        if !is_owner_view_increase(&post.posted_by_user_id, old, new) {
            return Ok(());
        }
        match self.repos.posts.clear_unviewed_comments(&post.post_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        self.remove_post_cards(&post.posted_by_user_id, &post.post_id)
            .await
    }

    pub async fn on_delete(&self, post: &Post) -> Result<()> {
        self.remove_post_cards(&post.posted_by_user_id, &post.post_id)
            .await
    }

    pub async fn on_album_delete_remove_posts(&self, album_id: &str) -> Result<()> {
        for mut post in self.repos.posts.list_posts_by_album(album_id).await? {
            post.album_id = None;
            post.album_rank = None;
            self.repos.posts.update_post(&post).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::{Harness, LogBuffer};
    use crate::managers::ManagerError;
    use real_core::model::{LikeStatus, ViewedStatus};
    use real_core::storage::CardRepository;

    async fn card_exists(h: &Harness, spec: &CardSpec) -> bool {
        h.store.get_card(&spec.card_id()).await.unwrap().is_some()
    }

    #[tokio::test]
    async fn test_add_text_post_completes() {
        let h = Harness::new();
        h.user("uid").await;

        let post = h
            .managers
            .post
            .add_post("uid", NewPost::text_only("lore ipsum"))
            .await
            .unwrap();
        assert_eq!(post.post_status, PostStatus::Completed);
        h.settle().await;
        assert_eq!(h.get_user("uid").await.post_count, 1);

        let result = h.managers.post.add_post("uid", NewPost::text_only("  ")).await;
        assert!(matches!(result, Err(ManagerError::Post(PostError::Invalid(_)))));
    }

    #[tokio::test]
    async fn test_image_post_stays_pending_until_completed() {
        let h = Harness::new();
        h.user("uid").await;
        h.user("other").await;

        let post = h.managers.post.add_post("uid", NewPost::image()).await.unwrap();
        assert_eq!(post.post_status, PostStatus::Pending);
        h.settle().await;
        assert_eq!(h.get_user("uid").await.post_count, 0);

        let result = h.managers.post.complete_post(&post.post_id, "other").await;
        assert!(matches!(result, Err(ManagerError::Post(PostError::NotOwner { .. }))));

        h.managers.post.complete_post(&post.post_id, "uid").await.unwrap();
        h.settle().await;
        assert_eq!(h.get_user("uid").await.post_count, 1);
    }

    #[tokio::test]
    async fn test_album_must_belong_to_poster() {
        let h = Harness::new();
        h.user("uid").await;
        h.user("other").await;
        let album = h.managers.album.add_album("other", "Theirs", None).await.unwrap();

        let new_post = NewPost {
            album_id: Some(album.album_id.clone()),
            ..NewPost::text_only("lore")
        };
        let result = h.managers.post.add_post("uid", new_post).await;
        assert!(matches!(result, Err(ManagerError::Album(AlbumError::NotOwner { .. }))));
    }

    #[tokio::test]
    async fn test_archive_and_restore_move_counts() {
        let h = Harness::new();
        h.user("uid").await;
        h.post("pid", "uid").await;

        h.managers.post.archive_post("pid", "uid").await.unwrap();
        h.settle().await;
        let user = h.get_user("uid").await;
        assert_eq!((user.post_count, user.post_archived_count), (0, 1));

        let result = h.managers.post.archive_post("pid", "uid").await;
        assert!(matches!(
            result,
            Err(ManagerError::Post(PostError::InvalidStatusTransition { .. }))
        ));

        h.managers.post.restore_post("pid", "uid").await.unwrap();
        h.settle().await;
        let user = h.get_user("uid").await;
        assert_eq!((user.post_count, user.post_archived_count), (1, 0));
    }

    #[tokio::test]
    async fn test_delete_post_cleans_up() {
        let h = Harness::new();
        h.user("owner").await;
        h.user("other").await;
        h.post("pid", "owner").await;
        h.managers
            .like
            .like_post("other", "pid", LikeStatus::OnymouslyLiked)
            .await
            .unwrap();
        h.managers.comment.add_comment("other", "pid", "hey").await.unwrap();
        h.managers.post.flag_post("pid", "other").await.unwrap();
        h.settle().await;
        let likes_card = CardSpec::post_likes("owner", "pid");
        assert!(card_exists(&h, &likes_card).await);

        h.managers.post.delete_post("pid", "owner").await.unwrap();
        h.settle().await;

        assert!(h.managers.post.get_post("pid").await.unwrap().is_none());
        assert!(h.managers.comment.list_comments("pid").await.unwrap().is_empty());
        assert!(h.managers.like.list_likes_of_post("pid").await.unwrap().is_empty());
        for spec in CardSpec::post_cards("owner", "pid") {
            assert!(!card_exists(&h, &spec).await);
        }
        let owner = h.get_user("owner").await;
        assert_eq!(owner.post_count, 0);
        assert_eq!(owner.card_count, 0);
    }

    #[tokio::test]
    async fn test_comment_card_cleared_by_owner_view() {
        let h = Harness::new();
        h.user("owner").await;
        h.user("other").await;
        h.post("pid", "owner").await;

        h.managers.comment.add_comment("other", "pid", "one").await.unwrap();
        h.managers.comment.add_comment("other", "pid", "two").await.unwrap();
        h.settle().await;
        let card = h
            .store
            .get_card(&CardSpec::comment_activity("owner", "pid", 0).card_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(card.title, "You have 2 new comments");

        h.managers
            .post
            .record_views("owner", &["pid".to_string()], Utc::now())
            .await
            .unwrap();
        h.settle().await;

        let post = h.get_post("pid").await;
        assert_eq!(post.comments_unviewed_count, 0);
        assert_eq!(post.last_unviewed_comment_at, None);
        assert_eq!(post.viewed_by_count, 0);
        assert!(!card_exists(&h, &CardSpec::comment_activity("owner", "pid", 0)).await);
    }

    #[tokio::test]
    async fn test_deleting_a_seen_comment_keeps_unviewed_state() {
        let h = Harness::new();
        h.user("owner").await;
        h.user("other").await;
        h.post("pid", "owner").await;

        let seen = h.managers.comment.add_comment("other", "pid", "old").await.unwrap();
        h.settle().await;
        h.managers
            .post
            .record_views("owner", &["pid".to_string()], Utc::now())
            .await
            .unwrap();
        h.settle().await;
        assert_eq!(h.get_post("pid").await.comments_unviewed_count, 0);

        let unseen = h.managers.comment.add_comment("other", "pid", "new").await.unwrap();
        h.settle().await;
        let post = h.get_post("pid").await;
        assert_eq!(post.comments_unviewed_count, 1);
        assert_eq!(post.last_unviewed_comment_at, Some(unseen.created_at));

        h.managers
            .comment
            .delete_comment(&seen.comment_id, "other")
            .await
            .unwrap();
        h.settle().await;
        let post = h.get_post("pid").await;
        assert_eq!(post.comment_count, 1);
        assert_eq!(post.comments_unviewed_count, 1);
        assert_eq!(post.last_unviewed_comment_at, Some(unseen.created_at));
        let card = h
            .store
            .get_card(&CardSpec::comment_activity("owner", "pid", 0).card_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(card.title, "You have 1 new comment");

        h.managers
            .comment
            .delete_comment(&unseen.comment_id, "other")
            .await
            .unwrap();
        h.settle().await;
        let post = h.get_post("pid").await;
        assert_eq!(post.comment_count, 0);
        assert_eq!(post.comments_unviewed_count, 0);
        assert_eq!(post.last_unviewed_comment_at, None);
        assert!(!card_exists(&h, &CardSpec::comment_activity("owner", "pid", 0)).await);
    }

    #[tokio::test]
    async fn test_replayed_like_delete_warns_and_keeps_zero() {
        let h = Harness::new();
        h.user("owner").await;
        h.user("fan").await;
        h.post("pid", "owner").await;
        let like = h
            .managers
            .like
            .like_post("fan", "pid", LikeStatus::OnymouslyLiked)
            .await
            .unwrap();
        h.settle().await;
        assert_eq!(h.get_post("pid").await.onymous_like_count, 1);

        h.managers.like.dislike_post("fan", "pid").await.unwrap();
        h.settle().await;
        assert_eq!(h.get_post("pid").await.onymous_like_count, 0);

        let (logs, _guard) = LogBuffer::capture();
        h.managers.post.on_like_delete(&like).await.unwrap();
        assert_eq!(h.get_post("pid").await.onymous_like_count, 0);
        assert!(logs
            .contents()
            .contains("Failed to decrement onymousLikeCount for post `pid`"));
    }

    #[tokio::test]
    async fn test_owner_view_racing_post_delete() {
        let h = Harness::new();
        h.user("owner").await;
        h.user("other").await;
        h.post("pid", "owner").await;
        h.managers.comment.add_comment("other", "pid", "hey").await.unwrap();
        h.settle().await;
        assert!(card_exists(&h, &CardSpec::comment_activity("owner", "pid", 0)).await);

        // The owner's view is recorded but its hooks run after the delete.
        h.managers
            .post
            .record_views("owner", &["pid".to_string()], Utc::now())
            .await
            .unwrap();
        h.managers.post.delete_post("pid", "owner").await.unwrap();
        h.settle().await;

        for spec in CardSpec::post_cards("owner", "pid") {
            assert!(!card_exists(&h, &spec).await);
        }
        assert_eq!(h.get_user("owner").await.card_count, 0);

        let now = Utc::now();
        let view = View {
            item_id: "pid".to_string(),
            user_id: "owner".to_string(),
            view_count: 2,
            first_viewed_at: now,
            last_viewed_at: now,
        };
        let earlier = View {
            view_count: 1,
            ..view.clone()
        };
        let hooks = &h.managers.post;
        hooks
            .on_view_count_change_sync_counts_and_cards(Some(&earlier), Some(&view))
            .await
            .unwrap();
        hooks
            .on_view_count_change_sync_counts_and_cards(Some(&view), Some(&view))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_views_card_at_threshold() {
        let h = Harness::new();
        h.user("owner").await;
        h.post("pid", "owner").await;
        let views_card = CardSpec::post_views("owner", "pid");

        for i in 0..POST_VIEWS_CARD_THRESHOLD {
            let viewer = format!("viewer{i}");
            assert!(!card_exists(&h, &views_card).await);
            h.managers
                .post
                .record_views(&viewer, &["pid".to_string()], Utc::now())
                .await
                .unwrap();
            h.settle().await;
        }
        assert!(card_exists(&h, &views_card).await);
        assert_eq!(h.get_post("pid").await.viewed_by_count, POST_VIEWS_CARD_THRESHOLD);
        let pid = h.get_post("pid").await;
        assert_eq!(
            h.managers.view.get_viewed_status(&pid, "viewer0").await.unwrap(),
            ViewedStatus::Viewed
        );
    }

    #[tokio::test]
    async fn test_admin_flag_force_archives() {
        let h = Harness::new();
        h.user("owner").await;
        h.admin("admin").await;
        h.post("pid", "owner").await;

        h.managers.post.flag_post("pid", "admin").await.unwrap();
        h.settle().await;

        let post = h.get_post("pid").await;
        assert_eq!(post.post_status, PostStatus::Archived);
        assert_eq!(post.flag_count, 1);
    }

    #[tokio::test]
    async fn test_crowdsourced_flags_force_archive() {
        let h = Harness::new();
        h.user("owner").await;
        h.post("pid", "owner").await;
        for i in 0..11 {
            let viewer = format!("viewer{i}");
            h.user(&viewer).await;
            h.managers
                .post
                .record_views(&viewer, &["pid".to_string()], Utc::now())
                .await
                .unwrap();
        }
        h.settle().await;
        assert_eq!(h.get_post("pid").await.viewed_by_count, 11);

        // One flag in eleven viewers stays under the ten percent line.
        h.managers.post.flag_post("pid", "viewer0").await.unwrap();
        h.settle().await;
        let post = h.get_post("pid").await;
        assert_eq!(post.post_status, PostStatus::Completed);
        assert_eq!(post.flag_count, 1);

        h.managers.post.flag_post("pid", "viewer1").await.unwrap();
        h.settle().await;
        let post = h.get_post("pid").await;
        assert_eq!(post.post_status, PostStatus::Archived);
        assert_eq!(post.flag_count, 2);
        let owner = h.get_user("owner").await;
        assert_eq!((owner.post_count, owner.post_archived_count), (0, 1));
    }

    #[tokio::test]
    async fn test_flag_without_views_keeps_post() {
        let h = Harness::new();
        h.user("owner").await;
        h.user("other").await;
        h.post("pid", "owner").await;

        h.managers.post.flag_post("pid", "other").await.unwrap();
        h.settle().await;
        let post = h.get_post("pid").await;
        assert_eq!(post.post_status, PostStatus::Completed);
        assert!(!h.managers.post.is_forced_removal_criteria_met(&post));
    }

    #[tokio::test]
    async fn test_flag_private_post_denied() {
        let h = Harness::new();
        h.private_user("owner").await;
        h.user("other").await;
        h.post("pid", "owner").await;

        let result = h.managers.post.flag_post("pid", "other").await;
        assert!(matches!(result, Err(ManagerError::Post(PostError::NoAccess { .. }))));
    }

    #[tokio::test]
    async fn test_archive_expired_posts() {
        let h = Harness::new();
        h.user("uid").await;
        let new_post = NewPost {
            lifetime: Some(Duration::hours(1)),
            ..NewPost::text_only("lore")
        };
        let post = h.managers.post.add_post("uid", new_post).await.unwrap();
        h.post("forever", "uid").await;

        let archived = h.managers.post.archive_expired_posts(Utc::now()).await.unwrap();
        assert_eq!(archived, 0);
        let later = Utc::now() + Duration::hours(2);
        let archived = h.managers.post.archive_expired_posts(later).await.unwrap();
        assert_eq!(archived, 1);
        assert_eq!(h.get_post(&post.post_id).await.post_status, PostStatus::Archived);
        assert_eq!(h.get_post("forever").await.post_status, PostStatus::Completed);
    }

    #[tokio::test]
    async fn test_set_details() {
        let h = Harness::new();
        h.user("uid").await;
        h.post("pid", "uid").await;

        let details = PostDetails {
            text: Some("edited".into()),
            comments_disabled: Some(true),
            ..Default::default()
        };
        h.managers.post.set_details("pid", "uid", details).await.unwrap();
        let post = h.get_post("pid").await;
        assert_eq!(post.text.as_deref(), Some("edited"));
        assert!(post.comments_disabled);
        assert!(!post.likes_disabled);

        let details = PostDetails {
            text: Some("".into()),
            ..Default::default()
        };
        let result = h.managers.post.set_details("pid", "uid", details).await;
        assert!(matches!(result, Err(ManagerError::Post(PostError::Invalid(_)))));
    }
}
