//! Routes change records to the managers' `on_*` hooks.
//!
//! The in-memory backend hands its change log to a background worker that
//! settles it on an interval. With DynamoDB the table's stream is delivered
//! to `POST /internal/stream` and dispatched record by record.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use real_core::model::{Album, Card, Comment, Flag, FlaggedItem, Follow, Like, Post, User, View};
use real_core::stream::{ChangeKind, ChangeRecord};

use crate::managers::{Managers, Result};

/// Upper bound on drain rounds in [`StreamDispatcher::settle`]. Each round
/// may write and so queue further records; hooks converge long before this.
const MAX_SETTLE_ROUNDS: usize = 32;

/// A store that buffers its change records for later dispatch.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    async fn take_changes(&self) -> Vec<ChangeRecord>;
}

#[cfg(any(test, feature = "inmemory"))]
#[async_trait]
impl ChangeSource for crate::storage::InMemoryRepository {
    async fn take_changes(&self) -> Vec<ChangeRecord> {
        crate::storage::InMemoryRepository::take_changes(self).await
    }
}

#[derive(Clone)]
pub struct StreamDispatcher {
    managers: Managers,
}

impl StreamDispatcher {
    pub fn new(managers: Managers) -> Self {
        Self { managers }
    }

    /// Runs every hook interested in `record`. A failing hook is logged and
    /// does not stop the others.
    pub async fn dispatch(&self, record: &ChangeRecord) {
        if let Some((old, new)) = record.images::<User>() {
            self.dispatch_user(record, old, new).await;
        } else if let Some((old, new)) = record.images::<Post>() {
            self.dispatch_post(record, old, new).await;
        } else if let Some((old, new)) = record.images::<Comment>() {
            self.dispatch_comment(record, old, new).await;
        } else if let Some((old, new)) = record.images::<Like>() {
            self.dispatch_like(record, old, new).await;
        } else if let Some((old, new)) = record.images::<Follow>() {
            self.dispatch_follow(record, old, new).await;
        } else if let Some((old, new)) = record.images::<View>() {
            self.dispatch_view(record, old, new).await;
        } else if let Some((old, new)) = record.images::<Flag>() {
            self.dispatch_flag(record, old, new).await;
        } else if let Some((old, new)) = record.images::<Album>() {
            if let (Some(album), None) = (old, new) {
                let result = self
                    .managers
                    .post
                    .on_album_delete_remove_posts(&album.album_id)
                    .await;
                report(record, "on_album_delete_remove_posts", result);
            }
        } else if let Some((old, new)) = record.images::<Card>() {
            let result = self.managers.user.on_card_change_sync_count(old, new).await;
            report(record, "on_card_change_sync_count", result);
        }
    }

    async fn dispatch_user(&self, record: &ChangeRecord, old: Option<&User>, new: Option<&User>) {
        let user = &self.managers.user;
        report(record, "on_user_change_sync_dating", user.on_user_change_sync_dating(old, new).await);
        report(
            record,
            "on_user_change_sync_requested_followers_card",
            user.on_user_change_sync_requested_followers_card(old, new).await,
        );
    }

    async fn dispatch_post(&self, record: &ChangeRecord, old: Option<&Post>, new: Option<&Post>) {
        let old_status = old.map(|p| p.post_status);
        let new_status = new.map(|p| p.post_status);
        let status_changed = old_status != new_status;
        let album_changed = old.and_then(|p| p.album_id.as_deref())
            != new.and_then(|p| p.album_id.as_deref());

        if status_changed {
            report(
                record,
                "on_post_status_change_sync_feed",
                self.managers.feed.on_post_status_change_sync_feed(old, new).await,
            );
            report(
                record,
                "on_post_status_change_sync_counts",
                self.managers.user.on_post_status_change_sync_counts(old, new).await,
            );
        }
        if status_changed || album_changed {
            report(
                record,
                "on_post_change_sync_album",
                self.managers.album.on_post_change_sync_album(old, new).await,
            );
        }
        if let (Some(post), None) = (old, new) {
            report(record, "on_delete", self.managers.post.on_delete(post).await);
        }
    }

    async fn dispatch_comment(
        &self,
        record: &ChangeRecord,
        old: Option<&Comment>,
        new: Option<&Comment>,
    ) {
        let post = &self.managers.post;
        match (old, new) {
            (None, Some(comment)) => {
                report(record, "on_comment_add", post.on_comment_add(comment).await)
            }
            (Some(comment), None) => {
                report(record, "on_comment_delete", post.on_comment_delete(comment).await)
            }
            _ => {}
        }
    }

    async fn dispatch_like(&self, record: &ChangeRecord, old: Option<&Like>, new: Option<&Like>) {
        let post = &self.managers.post;
        if let Some(like) = old {
            let status_changed = new.is_some_and(|n| n.like_status != like.like_status);
            if new.is_none() || status_changed {
                report(record, "on_like_delete", post.on_like_delete(like).await);
            }
        }
        if let Some(like) = new {
            let status_changed = old.is_some_and(|o| o.like_status != like.like_status);
            if old.is_none() || status_changed {
                report(record, "on_like_add", post.on_like_add(like).await);
            }
        }
    }

    async fn dispatch_follow(
        &self,
        record: &ChangeRecord,
        old: Option<&Follow>,
        new: Option<&Follow>,
    ) {
        report(
            record,
            "on_follow_change_sync_counts",
            self.managers.follower.on_follow_change_sync_counts(old, new).await,
        );
        report(
            record,
            "on_user_follow_status_change_sync_feed",
            self.managers
                .feed
                .on_user_follow_status_change_sync_feed(old, new)
                .await,
        );
    }

    async fn dispatch_view(&self, record: &ChangeRecord, old: Option<&View>, new: Option<&View>) {
        let post = &self.managers.post;
        if let (None, Some(view)) = (old, new) {
            report(record, "on_view_add", post.on_view_add(view).await);
        }
        if new.is_some() {
            report(
                record,
                "on_view_count_change_sync_counts_and_cards",
                post.on_view_count_change_sync_counts_and_cards(old, new).await,
            );
        }
    }

    async fn dispatch_flag(&self, record: &ChangeRecord, old: Option<&Flag>, new: Option<&Flag>) {
        match (old, new) {
            (None, Some(flag)) => {
                let result = match &flag.item {
                    FlaggedItem::Post(post_id) => {
                        self.managers.post.on_flag_add(post_id, &flag.user_id).await
                    }
                    FlaggedItem::Comment(comment_id) => {
                        self.managers.comment.on_flag_add(comment_id, &flag.user_id).await
                    }
                };
                report(record, "on_flag_add", result);
            }
            (Some(flag), None) => {
                let result = match &flag.item {
                    FlaggedItem::Post(post_id) => self.managers.post.on_flag_delete(post_id).await,
                    FlaggedItem::Comment(comment_id) => {
                        self.managers.comment.on_flag_delete(comment_id).await
                    }
                };
                report(record, "on_flag_delete", result);
            }
            _ => {}
        }
    }

    /// Dispatches buffered records until the source runs dry, so that the
    /// writes made by hooks are processed too. Returns the number of
    /// records dispatched.
    pub async fn settle(&self, source: &dyn ChangeSource) -> usize {
        let mut dispatched = 0;
        for _ in 0..MAX_SETTLE_ROUNDS {
            let records = source.take_changes().await;
            if records.is_empty() {
                return dispatched;
            }
            for record in &records {
                self.dispatch(record).await;
            }
            dispatched += records.len();
        }
        tracing::warn!(dispatched, rounds = MAX_SETTLE_ROUNDS, "Change log did not settle");
        dispatched
    }

    /// Settles `source` every `interval` until shutdown is signalled.
    pub fn spawn_worker(
        self,
        source: Arc<dyn ChangeSource>,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            tracing::debug!(?interval, "Stream worker started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let dispatched = self.settle(source.as_ref()).await;
                        if dispatched > 0 {
                            tracing::trace!(dispatched, "Stream worker settled");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Stream worker shutting down");
                        break;
                    }
                }
            }
        })
    }
}

fn report(record: &ChangeRecord, handler: &str, result: Result<()>) {
    if let Err(e) = result {
        let kind = match record.kind() {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Modify => "MODIFY",
            ChangeKind::Remove => "REMOVE",
        };
        tracing::error!(
            entity = record.type_name(),
            key = %record.key(),
            kind,
            handler,
            error = %e,
            "Stream handler failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::managers::testing::Harness;
    use real_core::model::{LikeStatus, PostStatus, PostType};
    use real_core::storage::{LikeRepository, PostRepository};

    #[tokio::test]
    async fn test_settle_drains_hook_writes() {
        let h = Harness::new();
        h.user("uid").await;
        let mut post = Post::new("pid", "uid", PostType::TextOnly, Utc::now()).with_text("lore");
        post.post_status = PostStatus::Completed;
        h.store.create_post(&post).await.unwrap();

        // The post insert, then the user counter and feed writes it causes.
        let dispatched = h.dispatcher.settle(h.store.as_ref()).await;
        assert!(dispatched >= 3);
        assert_eq!(h.dispatcher.settle(h.store.as_ref()).await, 0);
        assert_eq!(h.get_user("uid").await.post_count, 1);
    }

    #[tokio::test]
    async fn test_like_status_change_moves_count() {
        let h = Harness::new();
        h.user("owner").await;
        h.user("liker").await;
        h.post("pid", "owner").await;
        let like = h
            .managers
            .like
            .like_post("liker", "pid", LikeStatus::OnymouslyLiked)
            .await
            .unwrap();
        h.settle().await;

        let anonymous = Like {
            like_status: LikeStatus::AnonymouslyLiked,
            ..like.clone()
        };
        h.dispatcher
            .dispatch(&ChangeRecord::modify(like, anonymous))
            .await;

        let post = h.get_post("pid").await;
        assert_eq!(post.onymous_like_count, 0);
        assert_eq!(post.anonymous_like_count, 1);
    }

    #[tokio::test]
    async fn test_post_removal_runs_every_hook() {
        let h = Harness::new();
        h.user("owner").await;
        h.user("fan").await;
        h.post("pid", "owner").await;
        h.managers
            .like
            .like_post("fan", "pid", LikeStatus::OnymouslyLiked)
            .await
            .unwrap();
        h.settle().await;
        assert_eq!(h.managers.feed.get_feed("owner", None).await.unwrap().len(), 1);

        // A removal that skipped the manager still clears counts, feed and cards.
        h.store.delete_post("pid").await.unwrap();
        h.settle().await;

        assert_eq!(h.get_user("owner").await.post_count, 0);
        assert!(h.managers.feed.get_feed("owner", None).await.unwrap().is_empty());
        assert!(h.managers.card.list_cards("owner").await.unwrap().is_empty());
        assert!(h.store.get_like("fan", "pid").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_worker_settles_until_shutdown() {
        let h = Harness::new();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let worker = h.dispatcher.clone().spawn_worker(
            h.store.clone(),
            Duration::from_millis(5),
            shutdown_rx,
        );

        h.user("uid").await;
        let mut post = Post::new("pid", "uid", PostType::TextOnly, Utc::now());
        post.post_status = PostStatus::Completed;
        h.store.create_post(&post).await.unwrap();

        let mut settled = false;
        for _ in 0..100 {
            if h.get_user("uid").await.post_count == 1 {
                settled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(settled);

        shutdown_tx.send(()).unwrap();
        worker.await.unwrap();
    }
}
