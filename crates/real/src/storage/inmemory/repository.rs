//! In-memory repository implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use real_core::model::{
    Album, AlbumCounter, Block, Card, Comment, CommentCounter, FeedItem, Flag, FlaggedItem, Follow,
    FollowStatus, Like, Post, PostCounter, PostStatus, User, UserCounter, View,
};
use real_core::storage::{
    AlbumRepository, BlockRepository, CardRepository, CommentRepository, FeedRepository,
    FlagRepository, FollowRepository, LikeRepository, PostRepository, Result, UserRepository,
    ViewRepository,
};
use real_core::stream::{ChangeRecord, Entity};

use super::table::{decrement, increment, ChangeLog, Table};

/// In-memory storage backend.
///
/// Every write appends a [`ChangeRecord`] to a change log, which stands in
/// for the store's change-data-capture stream. Drain it with
/// [`InMemoryRepository::take_changes`].
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    users: Arc<Table<User>>,
    posts: Arc<Table<Post>>,
    comments: Arc<Table<Comment>>,
    likes: Arc<Table<Like>>,
    follows: Arc<Table<Follow>>,
    feed: Arc<Table<FeedItem>>,
    cards: Arc<Table<Card>>,
    albums: Arc<Table<Album>>,
    views: Arc<Table<View>>,
    flags: Arc<Table<Flag>>,
    blocks: Arc<Table<Block>>,
    changes: ChangeLog,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        let changes: ChangeLog = Arc::new(Mutex::new(Vec::new()));
        Self {
            users: table("User", &changes),
            posts: table("Post", &changes),
            comments: table("Comment", &changes),
            likes: table("Like", &changes),
            follows: table("Follow", &changes),
            feed: table("FeedItem", &changes),
            cards: table("Card", &changes),
            albums: table("Album", &changes),
            views: table("View", &changes),
            flags: table("Flag", &changes),
            blocks: table("Block", &changes),
            changes,
        }
    }

    /// Drains the change log in write order.
    pub async fn take_changes(&self) -> Vec<ChangeRecord> {
        std::mem::take(&mut *self.changes.lock().await)
    }
}

fn table<V: Clone + Into<Entity>>(entity_type: &'static str, changes: &ChangeLog) -> Arc<Table<V>> {
    Arc::new(Table::new(entity_type, changes.clone()))
}

fn pair_key(a: &str, b: &str) -> String {
    format!("{a}/{b}")
}

fn flag_key(item: &FlaggedItem, user_id: &str) -> String {
    format!("{}/{}/{}", item.type_name(), item.id(), user_id)
}

fn missing_item(attribute: &str) -> String {
    format!("attribute_exists(partitionKey) AND {attribute} > 0")
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users.get(user_id).await)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .filter(|u| u.username == username)
            .await
            .into_iter()
            .next())
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        self.users.create(user.user_id.clone(), user).await
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        self.users
            .update(&user.user_id, |stored| User {
                post_count: stored.post_count,
                post_archived_count: stored.post_archived_count,
                follower_count: stored.follower_count,
                followed_count: stored.followed_count,
                followers_requested_count: stored.followers_requested_count,
                card_count: stored.card_count,
                ..user.clone()
            })
            .await
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.users.delete(user_id).await
    }

    async fn increment_user_count(&self, user_id: &str, counter: UserCounter) -> Result<u64> {
        let table = &self.users;
        table
            .modify(
                user_id,
                || table.not_found(user_id),
                |user| Ok(increment(counter.field_mut(user))),
            )
            .await
    }

    async fn decrement_user_count(&self, user_id: &str, counter: UserCounter) -> Result<u64> {
        let table = &self.users;
        let attribute = counter.attribute_name();
        table
            .modify(
                user_id,
                || table.condition_failed(user_id, missing_item(attribute)),
                |user| decrement(table, user_id, attribute, counter.field_mut(user)),
            )
            .await
    }
}

#[async_trait]
impl PostRepository for InMemoryRepository {
    async fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        Ok(self.posts.get(post_id).await)
    }

    async fn create_post(&self, post: &Post) -> Result<()> {
        self.posts.create(post.post_id.clone(), post).await
    }

    async fn update_post(&self, post: &Post) -> Result<()> {
        self.posts
            .update(&post.post_id, |stored| Post {
                last_unviewed_comment_at: stored.last_unviewed_comment_at,
                onymous_like_count: stored.onymous_like_count,
                anonymous_like_count: stored.anonymous_like_count,
                comment_count: stored.comment_count,
                comments_unviewed_count: stored.comments_unviewed_count,
                flag_count: stored.flag_count,
                viewed_by_count: stored.viewed_by_count,
                ..post.clone()
            })
            .await
    }

    async fn delete_post(&self, post_id: &str) -> Result<()> {
        self.posts.delete(post_id).await
    }

    async fn list_posts_by_user(
        &self,
        user_id: &str,
        status: Option<PostStatus>,
    ) -> Result<Vec<Post>> {
        let mut posts = self
            .posts
            .filter(|p| {
                p.posted_by_user_id == user_id && status.is_none_or(|s| p.post_status == s)
            })
            .await;
        posts.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        Ok(posts)
    }

    async fn list_posts_by_album(&self, album_id: &str) -> Result<Vec<Post>> {
        let mut posts = self
            .posts
            .filter(|p| p.album_id.as_deref() == Some(album_id))
            .await;
        posts.sort_by_key(|p| p.album_rank);
        Ok(posts)
    }

    async fn list_expired_posts(&self, now: DateTime<Utc>) -> Result<Vec<Post>> {
        Ok(self
            .posts
            .filter(|p| p.is_completed() && p.expires_at.is_some_and(|at| at <= now))
            .await)
    }

    async fn increment_post_count(&self, post_id: &str, counter: PostCounter) -> Result<u64> {
        let table = &self.posts;
        table
            .modify(
                post_id,
                || table.not_found(post_id),
                |post| Ok(increment(counter.field_mut(post))),
            )
            .await
    }

    async fn decrement_post_count(&self, post_id: &str, counter: PostCounter) -> Result<u64> {
        let table = &self.posts;
        let attribute = counter.attribute_name();
        table
            .modify(
                post_id,
                || table.condition_failed(post_id, missing_item(attribute)),
                |post| decrement(table, post_id, attribute, counter.field_mut(post)),
            )
            .await
    }

    async fn set_last_unviewed_comment_at(
        &self,
        post_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let table = &self.posts;
        table
            .modify(
                post_id,
                || table.not_found(post_id),
                |post| {
                    post.last_unviewed_comment_at = at;
                    Ok(())
                },
            )
            .await
    }

    async fn clear_unviewed_comments(&self, post_id: &str) -> Result<()> {
        let table = &self.posts;
        table
            .modify(
                post_id,
                || table.not_found(post_id),
                |post| {
                    post.comments_unviewed_count = 0;
                    post.last_unviewed_comment_at = None;
                    Ok(())
                },
            )
            .await
    }
}

#[async_trait]
impl CommentRepository for InMemoryRepository {
    async fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>> {
        Ok(self.comments.get(comment_id).await)
    }

    async fn create_comment(&self, comment: &Comment) -> Result<()> {
        self.comments
            .create(comment.comment_id.clone(), comment)
            .await
    }

    async fn delete_comment(&self, comment_id: &str) -> Result<()> {
        self.comments.delete(comment_id).await
    }

    async fn list_comments_by_post(&self, post_id: &str) -> Result<Vec<Comment>> {
        let mut comments = self.comments.filter(|c| c.post_id == post_id).await;
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn list_comments_by_user(&self, user_id: &str) -> Result<Vec<Comment>> {
        let mut comments = self.comments.filter(|c| c.user_id == user_id).await;
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn increment_comment_count(
        &self,
        comment_id: &str,
        counter: CommentCounter,
    ) -> Result<u64> {
        let table = &self.comments;
        table
            .modify(
                comment_id,
                || table.not_found(comment_id),
                |comment| Ok(increment(counter.field_mut(comment))),
            )
            .await
    }

    async fn decrement_comment_count(
        &self,
        comment_id: &str,
        counter: CommentCounter,
    ) -> Result<u64> {
        let table = &self.comments;
        let attribute = counter.attribute_name();
        table
            .modify(
                comment_id,
                || table.condition_failed(comment_id, missing_item(attribute)),
                |comment| decrement(table, comment_id, attribute, counter.field_mut(comment)),
            )
            .await
    }
}

#[async_trait]
impl LikeRepository for InMemoryRepository {
    async fn get_like(&self, liked_by_user_id: &str, post_id: &str) -> Result<Option<Like>> {
        Ok(self.likes.get(&pair_key(liked_by_user_id, post_id)).await)
    }

    async fn create_like(&self, like: &Like) -> Result<()> {
        self.likes
            .create(pair_key(&like.liked_by_user_id, &like.post_id), like)
            .await
    }

    async fn delete_like(&self, liked_by_user_id: &str, post_id: &str) -> Result<()> {
        self.likes
            .delete(&pair_key(liked_by_user_id, post_id))
            .await
    }

    async fn list_likes_by_post(&self, post_id: &str) -> Result<Vec<Like>> {
        let mut likes = self.likes.filter(|l| l.post_id == post_id).await;
        likes.sort_by(|a, b| a.liked_at.cmp(&b.liked_at));
        Ok(likes)
    }

    async fn list_likes_by_user(&self, liked_by_user_id: &str) -> Result<Vec<Like>> {
        let mut likes = self
            .likes
            .filter(|l| l.liked_by_user_id == liked_by_user_id)
            .await;
        likes.sort_by(|a, b| a.liked_at.cmp(&b.liked_at));
        Ok(likes)
    }

    async fn list_likes_by_user_of_user(
        &self,
        liked_by_user_id: &str,
        posted_by_user_id: &str,
    ) -> Result<Vec<Like>> {
        Ok(self
            .likes
            .filter(|l| {
                l.liked_by_user_id == liked_by_user_id && l.posted_by_user_id == posted_by_user_id
            })
            .await)
    }
}

#[async_trait]
impl FollowRepository for InMemoryRepository {
    async fn get_follow(
        &self,
        follower_user_id: &str,
        followed_user_id: &str,
    ) -> Result<Option<Follow>> {
        Ok(self
            .follows
            .get(&pair_key(follower_user_id, followed_user_id))
            .await)
    }

    async fn put_follow(&self, follow: &Follow) -> Result<()> {
        self.follows
            .put(
                pair_key(&follow.follower_user_id, &follow.followed_user_id),
                follow,
            )
            .await
    }

    async fn delete_follow(&self, follower_user_id: &str, followed_user_id: &str) -> Result<()> {
        self.follows
            .delete(&pair_key(follower_user_id, followed_user_id))
            .await
    }

    async fn list_followers(
        &self,
        followed_user_id: &str,
        status: Option<FollowStatus>,
    ) -> Result<Vec<Follow>> {
        Ok(self
            .follows
            .filter(|f| {
                f.followed_user_id == followed_user_id
                    && status.is_none_or(|s| f.follow_status == s)
            })
            .await)
    }

    async fn list_followeds(
        &self,
        follower_user_id: &str,
        status: Option<FollowStatus>,
    ) -> Result<Vec<Follow>> {
        Ok(self
            .follows
            .filter(|f| {
                f.follower_user_id == follower_user_id
                    && status.is_none_or(|s| f.follow_status == s)
            })
            .await)
    }
}

#[async_trait]
impl FeedRepository for InMemoryRepository {
    async fn put_feed_items(&self, items: &[FeedItem]) -> Result<()> {
        for item in items {
            self.feed
                .put(pair_key(&item.user_id, &item.post_id), item)
                .await?;
        }
        Ok(())
    }

    async fn delete_feed_items(&self, keys: &[(String, String)]) -> Result<()> {
        for (user_id, post_id) in keys {
            self.feed.remove(&pair_key(user_id, post_id)).await;
        }
        Ok(())
    }

    async fn list_feed(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<FeedItem>> {
        let mut items = self.feed.filter(|i| i.user_id == user_id).await;
        items.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    async fn list_feed_by_post_owner(
        &self,
        user_id: &str,
        posted_by_user_id: &str,
    ) -> Result<Vec<FeedItem>> {
        Ok(self
            .feed
            .filter(|i| i.user_id == user_id && i.posted_by_user_id == posted_by_user_id)
            .await)
    }
}

#[async_trait]
impl CardRepository for InMemoryRepository {
    async fn get_card(&self, card_id: &str) -> Result<Option<Card>> {
        Ok(self.cards.get(card_id).await)
    }

    async fn create_card(&self, card: &Card) -> Result<()> {
        self.cards.create(card.card_id.clone(), card).await
    }

    async fn update_card(&self, card: &Card) -> Result<()> {
        self.cards.update(&card.card_id, |_| card.clone()).await
    }

    async fn delete_card(&self, card_id: &str) -> Result<()> {
        self.cards.delete(card_id).await
    }

    async fn list_cards_by_user(&self, user_id: &str) -> Result<Vec<Card>> {
        let mut cards = self.cards.filter(|c| c.user_id == user_id).await;
        cards.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(cards)
    }
}

#[async_trait]
impl AlbumRepository for InMemoryRepository {
    async fn get_album(&self, album_id: &str) -> Result<Option<Album>> {
        Ok(self.albums.get(album_id).await)
    }

    async fn create_album(&self, album: &Album) -> Result<()> {
        self.albums.create(album.album_id.clone(), album).await
    }

    async fn update_album(&self, album: &Album) -> Result<()> {
        self.albums
            .update(&album.album_id, |stored| Album {
                post_count: stored.post_count,
                rank_count: stored.rank_count,
                ..album.clone()
            })
            .await
    }

    async fn delete_album(&self, album_id: &str) -> Result<()> {
        self.albums.delete(album_id).await
    }

    async fn list_albums_by_user(&self, user_id: &str) -> Result<Vec<Album>> {
        let mut albums = self
            .albums
            .filter(|a| a.owned_by_user_id == user_id)
            .await;
        albums.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(albums)
    }

    async fn increment_album_count(&self, album_id: &str, counter: AlbumCounter) -> Result<u64> {
        let table = &self.albums;
        table
            .modify(
                album_id,
                || table.not_found(album_id),
                |album| Ok(increment(counter.field_mut(album))),
            )
            .await
    }

    async fn decrement_album_count(&self, album_id: &str, counter: AlbumCounter) -> Result<u64> {
        let table = &self.albums;
        let attribute = counter.attribute_name();
        table
            .modify(
                album_id,
                || table.condition_failed(album_id, missing_item(attribute)),
                |album| decrement(table, album_id, attribute, counter.field_mut(album)),
            )
            .await
    }
}

#[async_trait]
impl ViewRepository for InMemoryRepository {
    async fn get_view(&self, item_id: &str, user_id: &str) -> Result<Option<View>> {
        Ok(self.views.get(&pair_key(item_id, user_id)).await)
    }

    async fn create_view(&self, view: &View) -> Result<()> {
        self.views
            .create(pair_key(&view.item_id, &view.user_id), view)
            .await
    }

    async fn increment_view_count(
        &self,
        item_id: &str,
        user_id: &str,
        view_count: u64,
        viewed_at: DateTime<Utc>,
    ) -> Result<()> {
        let table = &self.views;
        let key = pair_key(item_id, user_id);
        table
            .modify(
                &key,
                || table.not_found(&key),
                |view| {
                    view.view_count += view_count;
                    view.last_viewed_at = view.last_viewed_at.max(viewed_at);
                    Ok(())
                },
            )
            .await
    }

    async fn list_views(&self, item_id: &str) -> Result<Vec<View>> {
        Ok(self.views.filter(|v| v.item_id == item_id).await)
    }

    async fn delete_view(&self, item_id: &str, user_id: &str) -> Result<()> {
        self.views.delete(&pair_key(item_id, user_id)).await
    }
}

#[async_trait]
impl FlagRepository for InMemoryRepository {
    async fn get_flag(&self, item: &FlaggedItem, user_id: &str) -> Result<Option<Flag>> {
        Ok(self.flags.get(&flag_key(item, user_id)).await)
    }

    async fn create_flag(&self, flag: &Flag) -> Result<()> {
        self.flags
            .create(flag_key(&flag.item, &flag.user_id), flag)
            .await
    }

    async fn delete_flag(&self, item: &FlaggedItem, user_id: &str) -> Result<()> {
        self.flags.delete(&flag_key(item, user_id)).await
    }

    async fn list_flags_by_item(&self, item: &FlaggedItem) -> Result<Vec<Flag>> {
        Ok(self.flags.filter(|f| &f.item == item).await)
    }

    async fn list_flags_by_user(&self, user_id: &str) -> Result<Vec<Flag>> {
        Ok(self.flags.filter(|f| f.user_id == user_id).await)
    }
}

#[async_trait]
impl BlockRepository for InMemoryRepository {
    async fn get_block(
        &self,
        blocker_user_id: &str,
        blocked_user_id: &str,
    ) -> Result<Option<Block>> {
        Ok(self
            .blocks
            .get(&pair_key(blocker_user_id, blocked_user_id))
            .await)
    }

    async fn create_block(&self, block: &Block) -> Result<()> {
        self.blocks
            .create(
                pair_key(&block.blocker_user_id, &block.blocked_user_id),
                block,
            )
            .await
    }

    async fn delete_block(&self, blocker_user_id: &str, blocked_user_id: &str) -> Result<()> {
        self.blocks
            .delete(&pair_key(blocker_user_id, blocked_user_id))
            .await
    }

    async fn list_blocks_by_blocker(&self, blocker_user_id: &str) -> Result<Vec<Block>> {
        Ok(self
            .blocks
            .filter(|b| b.blocker_user_id == blocker_user_id)
            .await)
    }

    async fn list_blocks_by_blocked(&self, blocked_user_id: &str) -> Result<Vec<Block>> {
        Ok(self
            .blocks
            .filter(|b| b.blocked_user_id == blocked_user_id)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use real_core::model::PostType;
    use real_core::storage::RepositoryError;
    use real_core::stream::ChangeKind;

    fn post(post_id: &str) -> Post {
        Post::new(post_id, "uid", PostType::TextOnly, Utc::now())
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let repo = InMemoryRepository::new();
        repo.create_post(&post("pid")).await.unwrap();

        let stored = repo.get_post("pid").await.unwrap().unwrap();
        assert_eq!(stored.post_id, "pid");
        assert!(repo.get_post("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let repo = InMemoryRepository::new();
        repo.create_post(&post("pid")).await.unwrap();

        let result = repo.create_post(&post("pid")).await;
        assert!(matches!(result, Err(RepositoryError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_update_keeps_counters() {
        let repo = InMemoryRepository::new();
        repo.create_post(&post("pid")).await.unwrap();
        repo.increment_post_count("pid", PostCounter::Comment)
            .await
            .unwrap();

        let mut update = post("pid").with_text("edited");
        update.comment_count = 0;
        repo.update_post(&update).await.unwrap();

        let stored = repo.get_post("pid").await.unwrap().unwrap();
        assert_eq!(stored.text.as_deref(), Some("edited"));
        assert_eq!(stored.comment_count, 1);
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let repo = InMemoryRepository::new();
        let result = repo.update_post(&post("pid")).await;
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_decrement_at_zero_fails_condition() {
        let repo = InMemoryRepository::new();
        repo.create_post(&post("pid")).await.unwrap();

        assert_eq!(
            repo.increment_post_count("pid", PostCounter::Flag)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            repo.decrement_post_count("pid", PostCounter::Flag)
                .await
                .unwrap(),
            0
        );
        let result = repo.decrement_post_count("pid", PostCounter::Flag).await;
        assert!(matches!(
            result,
            Err(RepositoryError::ConditionFailed { .. })
        ));

        let result = repo.decrement_post_count("missing", PostCounter::Flag).await;
        assert!(matches!(
            result,
            Err(RepositoryError::ConditionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_increment_missing_not_found() {
        let repo = InMemoryRepository::new();
        let result = repo.increment_user_count("uid", UserCounter::Post).await;
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_change_log_records_writes() {
        let repo = InMemoryRepository::new();
        repo.create_post(&post("pid")).await.unwrap();
        repo.increment_post_count("pid", PostCounter::ViewedBy)
            .await
            .unwrap();
        repo.delete_post("pid").await.unwrap();

        let changes = repo.take_changes().await;
        let kinds: Vec<_> = changes.iter().map(ChangeRecord::kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Insert, ChangeKind::Modify, ChangeKind::Remove]
        );
        assert!(repo.take_changes().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_decrement_records_nothing() {
        let repo = InMemoryRepository::new();
        repo.create_post(&post("pid")).await.unwrap();
        repo.take_changes().await;

        let _ = repo.decrement_post_count("pid", PostCounter::Comment).await;
        assert!(repo.take_changes().await.is_empty());
    }

    #[tokio::test]
    async fn test_feed_sorted_newest_first() {
        let repo = InMemoryRepository::new();
        let now = Utc::now();
        let older = Post::new("p1", "poster", PostType::TextOnly, now - chrono::Duration::hours(1));
        let newer = Post::new("p2", "poster", PostType::TextOnly, now);
        repo.put_feed_items(&[FeedItem::for_post("uid", &older), FeedItem::for_post("uid", &newer)])
            .await
            .unwrap();

        let feed = repo.list_feed("uid", None).await.unwrap();
        let ids: Vec<_> = feed.iter().map(|i| i.post_id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);

        let feed = repo.list_feed("uid", Some(1)).await.unwrap();
        assert_eq!(feed.len(), 1);

        repo.delete_feed_items(&[("uid".to_string(), "p2".to_string()), ("uid".to_string(), "nope".to_string())])
            .await
            .unwrap();
        assert_eq!(repo.list_feed("uid", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_view_count_increment() {
        let repo = InMemoryRepository::new();
        let now = Utc::now();
        let view = View {
            item_id: "pid".to_string(),
            user_id: "uid".to_string(),
            view_count: 1,
            first_viewed_at: now,
            last_viewed_at: now,
        };
        repo.create_view(&view).await.unwrap();
        let later = now + chrono::Duration::minutes(5);
        repo.increment_view_count("pid", "uid", 2, later)
            .await
            .unwrap();

        let stored = repo.get_view("pid", "uid").await.unwrap().unwrap();
        assert_eq!(stored.view_count, 3);
        assert_eq!(stored.first_viewed_at, now);
        assert_eq!(stored.last_viewed_at, later);
    }
}
