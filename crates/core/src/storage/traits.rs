use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{
    Album, AlbumCounter, Block, Card, Comment, CommentCounter, FeedItem, Flag, FlaggedItem, Follow,
    FollowStatus, Like, Post, PostCounter, PostStatus, User, UserCounter, View,
};

use super::Result;

// Counter contract shared by every repository below: increments fail with
// `NotFound` when the item is missing, decrements fail with
// `ConditionFailed` when the counter is already zero or the item is
// missing. Both return the counter's new value.

/// Repository for user operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn create_user(&self, user: &User) -> Result<()>;

    /// Writes every attribute except the counters.
    async fn update_user(&self, user: &User) -> Result<()>;

    async fn delete_user(&self, user_id: &str) -> Result<()>;

    async fn increment_user_count(&self, user_id: &str, counter: UserCounter) -> Result<u64>;

    async fn decrement_user_count(&self, user_id: &str, counter: UserCounter) -> Result<u64>;
}

/// Repository for post operations.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn get_post(&self, post_id: &str) -> Result<Option<Post>>;

    async fn create_post(&self, post: &Post) -> Result<()>;

    /// Writes every attribute except the counters and the unviewed comment
    /// timestamp, which stream handlers own.
    async fn update_post(&self, post: &Post) -> Result<()>;

    async fn delete_post(&self, post_id: &str) -> Result<()>;

    /// Posts by a user, newest first, optionally restricted to one status.
    async fn list_posts_by_user(
        &self,
        user_id: &str,
        status: Option<PostStatus>,
    ) -> Result<Vec<Post>>;

    /// Posts in an album, by ascending album rank.
    async fn list_posts_by_album(&self, album_id: &str) -> Result<Vec<Post>>;

    /// Completed posts whose expiry is at or before `now`.
    async fn list_expired_posts(&self, now: DateTime<Utc>) -> Result<Vec<Post>>;

    async fn increment_post_count(&self, post_id: &str, counter: PostCounter) -> Result<u64>;

    async fn decrement_post_count(&self, post_id: &str, counter: PostCounter) -> Result<u64>;

    async fn set_last_unviewed_comment_at(
        &self,
        post_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Zeroes the unviewed comment count and removes its timestamp.
    async fn clear_unviewed_comments(&self, post_id: &str) -> Result<()>;
}

/// Repository for comment operations.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>>;

    async fn create_comment(&self, comment: &Comment) -> Result<()>;

    async fn delete_comment(&self, comment_id: &str) -> Result<()>;

    /// Comments on a post, oldest first.
    async fn list_comments_by_post(&self, post_id: &str) -> Result<Vec<Comment>>;

    async fn list_comments_by_user(&self, user_id: &str) -> Result<Vec<Comment>>;

    async fn increment_comment_count(
        &self,
        comment_id: &str,
        counter: CommentCounter,
    ) -> Result<u64>;

    async fn decrement_comment_count(
        &self,
        comment_id: &str,
        counter: CommentCounter,
    ) -> Result<u64>;
}

/// Repository for like operations.
#[async_trait]
pub trait LikeRepository: Send + Sync {
    async fn get_like(&self, liked_by_user_id: &str, post_id: &str) -> Result<Option<Like>>;

    async fn create_like(&self, like: &Like) -> Result<()>;

    async fn delete_like(&self, liked_by_user_id: &str, post_id: &str) -> Result<()>;

    /// Likes of a post in the order they were made.
    async fn list_likes_by_post(&self, post_id: &str) -> Result<Vec<Like>>;

    async fn list_likes_by_user(&self, liked_by_user_id: &str) -> Result<Vec<Like>>;

    /// Likes made by one user on posts of another.
    async fn list_likes_by_user_of_user(
        &self,
        liked_by_user_id: &str,
        posted_by_user_id: &str,
    ) -> Result<Vec<Like>>;
}

/// Repository for follow relationships.
#[async_trait]
pub trait FollowRepository: Send + Sync {
    async fn get_follow(
        &self,
        follower_user_id: &str,
        followed_user_id: &str,
    ) -> Result<Option<Follow>>;

    /// Inserts or replaces the follow item.
    async fn put_follow(&self, follow: &Follow) -> Result<()>;

    async fn delete_follow(&self, follower_user_id: &str, followed_user_id: &str) -> Result<()>;

    /// Follows pointing at `followed_user_id`.
    async fn list_followers(
        &self,
        followed_user_id: &str,
        status: Option<FollowStatus>,
    ) -> Result<Vec<Follow>>;

    /// Follows made by `follower_user_id`.
    async fn list_followeds(
        &self,
        follower_user_id: &str,
        status: Option<FollowStatus>,
    ) -> Result<Vec<Follow>>;
}

/// Repository for materialized feeds.
#[async_trait]
pub trait FeedRepository: Send + Sync {
    async fn put_feed_items(&self, items: &[FeedItem]) -> Result<()>;

    /// Deletes `(feed user id, post id)` pairs. Missing items are ignored.
    async fn delete_feed_items(&self, keys: &[(String, String)]) -> Result<()>;

    /// A user's feed, newest post first.
    async fn list_feed(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<FeedItem>>;

    async fn list_feed_by_post_owner(
        &self,
        user_id: &str,
        posted_by_user_id: &str,
    ) -> Result<Vec<FeedItem>>;
}

/// Repository for cards.
#[async_trait]
pub trait CardRepository: Send + Sync {
    async fn get_card(&self, card_id: &str) -> Result<Option<Card>>;

    async fn create_card(&self, card: &Card) -> Result<()>;

    async fn update_card(&self, card: &Card) -> Result<()>;

    async fn delete_card(&self, card_id: &str) -> Result<()>;

    /// A user's cards, newest first.
    async fn list_cards_by_user(&self, user_id: &str) -> Result<Vec<Card>>;
}

/// Repository for albums.
#[async_trait]
pub trait AlbumRepository: Send + Sync {
    async fn get_album(&self, album_id: &str) -> Result<Option<Album>>;

    async fn create_album(&self, album: &Album) -> Result<()>;

    /// Writes every attribute except the counters.
    async fn update_album(&self, album: &Album) -> Result<()>;

    async fn delete_album(&self, album_id: &str) -> Result<()>;

    async fn list_albums_by_user(&self, user_id: &str) -> Result<Vec<Album>>;

    async fn increment_album_count(&self, album_id: &str, counter: AlbumCounter) -> Result<u64>;

    async fn decrement_album_count(&self, album_id: &str, counter: AlbumCounter) -> Result<u64>;
}

/// Repository for per-user view tallies.
#[async_trait]
pub trait ViewRepository: Send + Sync {
    async fn get_view(&self, item_id: &str, user_id: &str) -> Result<Option<View>>;

    async fn create_view(&self, view: &View) -> Result<()>;

    /// Adds `view_count` views and moves `last_viewed_at` forward.
    async fn increment_view_count(
        &self,
        item_id: &str,
        user_id: &str,
        view_count: u64,
        viewed_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn list_views(&self, item_id: &str) -> Result<Vec<View>>;

    async fn delete_view(&self, item_id: &str, user_id: &str) -> Result<()>;
}

/// Repository for flags on posts and comments.
#[async_trait]
pub trait FlagRepository: Send + Sync {
    async fn get_flag(&self, item: &FlaggedItem, user_id: &str) -> Result<Option<Flag>>;

    async fn create_flag(&self, flag: &Flag) -> Result<()>;

    async fn delete_flag(&self, item: &FlaggedItem, user_id: &str) -> Result<()>;

    async fn list_flags_by_item(&self, item: &FlaggedItem) -> Result<Vec<Flag>>;

    async fn list_flags_by_user(&self, user_id: &str) -> Result<Vec<Flag>>;
}

/// Repository for blocks between users.
#[async_trait]
pub trait BlockRepository: Send + Sync {
    async fn get_block(&self, blocker_user_id: &str, blocked_user_id: &str)
        -> Result<Option<Block>>;

    async fn create_block(&self, block: &Block) -> Result<()>;

    async fn delete_block(&self, blocker_user_id: &str, blocked_user_id: &str) -> Result<()>;

    async fn list_blocks_by_blocker(&self, blocker_user_id: &str) -> Result<Vec<Block>>;

    async fn list_blocks_by_blocked(&self, blocked_user_id: &str) -> Result<Vec<Block>>;
}

/// A backend that stores every entity type.
pub trait Store:
    UserRepository
    + PostRepository
    + CommentRepository
    + LikeRepository
    + FollowRepository
    + FeedRepository
    + CardRepository
    + AlbumRepository
    + ViewRepository
    + FlagRepository
    + BlockRepository
{
}

impl<T> Store for T where
    T: UserRepository
        + PostRepository
        + CommentRepository
        + LikeRepository
        + FollowRepository
        + FeedRepository
        + CardRepository
        + AlbumRepository
        + ViewRepository
        + FlagRepository
        + BlockRepository
{
}
