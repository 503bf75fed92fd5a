//! DynamoDB key generation functions.
//!
//! Pure functions for the partition, sort and index keys of the single-table
//! design. Every item carries `partitionKey`/`sortKey`; secondary indexes
//! are sparse and only populated on the items that are queried through them.

use chrono::{DateTime, SecondsFormat, Utc};

use real_core::model::{
    Album, Block, Card, Comment, FeedItem, Flag, FlaggedItem, Follow, FollowStatus, Like, Post,
    PostStatus, User, View,
};

// ============================================================================
// Attribute names
// ============================================================================

pub const PARTITION_KEY: &str = "partitionKey";
pub const SORT_KEY: &str = "sortKey";
pub const ENTITY_TYPE: &str = "entityType";

/// Sort key of items that are alone in their partition.
pub const SINGLE_SK: &str = "-";

pub const USER_PROFILE_SK: &str = "profile";
pub const FOLLOWER_PREFIX: &str = "follower/";
pub const FEED_PREFIX: &str = "feed/";
pub const VIEW_PREFIX: &str = "view/";
pub const FLAG_PREFIX: &str = "flag/";
pub const CARD_PREFIX: &str = "card/";

/// Partition of completed posts that carry an expiry.
pub const EXPIRING_POSTS_PK: &str = "post/expiring";

// ============================================================================
// Secondary indexes
// ============================================================================

/// Global secondary indexes of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    A1,
    A2,
    A3,
    K1,
    K2,
    K3,
}

impl Index {
    pub const ALL: [Index; 6] = [
        Index::A1,
        Index::A2,
        Index::A3,
        Index::K1,
        Index::K2,
        Index::K3,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Index::A1 => "GSI-A1",
            Index::A2 => "GSI-A2",
            Index::A3 => "GSI-A3",
            Index::K1 => "GSI-K1",
            Index::K2 => "GSI-K2",
            Index::K3 => "GSI-K3",
        }
    }

    pub fn partition_key(&self) -> &'static str {
        match self {
            Index::A1 => "gsiA1PartitionKey",
            Index::A2 => "gsiA2PartitionKey",
            Index::A3 => "gsiA3PartitionKey",
            Index::K1 => "gsiK1PartitionKey",
            Index::K2 => "gsiK2PartitionKey",
            Index::K3 => "gsiK3PartitionKey",
        }
    }

    pub fn sort_key(&self) -> &'static str {
        match self {
            Index::A1 => "gsiA1SortKey",
            Index::A2 => "gsiA2SortKey",
            Index::A3 => "gsiA3SortKey",
            Index::K1 => "gsiK1SortKey",
            Index::K2 => "gsiK2SortKey",
            Index::K3 => "gsiK3SortKey",
        }
    }
}

/// Index sort keys are strings except for GSI-K3, which sorts numerically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortValue {
    Str(String),
    Num(i64),
}

impl From<String> for SortValue {
    fn from(value: String) -> Self {
        SortValue::Str(value)
    }
}

impl From<&str> for SortValue {
    fn from(value: &str) -> Self {
        SortValue::Str(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey {
    pub index: Index,
    pub pk: String,
    pub sk: SortValue,
}

/// Every key attribute of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemKeys {
    pub pk: String,
    pub sk: String,
    pub indexes: Vec<IndexKey>,
}

impl ItemKeys {
    fn new(pk: String, sk: impl Into<String>) -> Self {
        Self {
            pk,
            sk: sk.into(),
            indexes: Vec::new(),
        }
    }

    fn index(mut self, index: Index, pk: String, sk: impl Into<SortValue>) -> Self {
        self.indexes.push(IndexKey {
            index,
            pk,
            sk: sk.into(),
        });
        self
    }

    fn index_if(self, index: Index, key: Option<(String, SortValue)>) -> Self {
        match key {
            Some((pk, sk)) => self.index(index, pk, sk),
            None => self,
        }
    }

    pub fn get(&self, index: Index) -> Option<&IndexKey> {
        self.indexes.iter().find(|k| k.index == index)
    }
}

/// Timestamps in keys use a fixed width so they sort lexicographically.
///
/// Pattern: `2024-01-15T10:30:00.000000Z`
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ============================================================================
// Users
// ============================================================================

/// Pattern: `user/<user_id>`
pub fn user_pk(user_id: &str) -> String {
    format!("user/{user_id}")
}

/// Pattern: `username/<username>`
pub fn username_pk(username: &str) -> String {
    format!("username/{username}")
}

pub fn user_keys(user: &User) -> ItemKeys {
    ItemKeys::new(user_pk(&user.user_id), USER_PROFILE_SK).index(
        Index::A1,
        username_pk(&user.username),
        SINGLE_SK,
    )
}

// ============================================================================
// Posts
// ============================================================================

/// Pattern: `post/<post_id>`
pub fn post_pk(post_id: &str) -> String {
    format!("post/{post_id}")
}

/// Partition of a user's posts in GSI-A2 and GSI-A3.
///
/// Pattern: `post/<user_id>`
pub fn posts_by_user_pk(user_id: &str) -> String {
    format!("post/{user_id}")
}

/// Pattern: `<STATUS>/`
pub fn post_status_prefix(status: PostStatus) -> String {
    format!("{}/", status.as_str())
}

/// Partition of an album's posts in GSI-K3.
///
/// Pattern: `post/<album_id>`
pub fn posts_by_album_pk(album_id: &str) -> String {
    format!("post/{album_id}")
}

pub fn post_keys(post: &Post) -> ItemKeys {
    let expiring = match (post.post_status, post.expires_at) {
        (PostStatus::Completed, Some(at)) => {
            Some((EXPIRING_POSTS_PK.to_string(), SortValue::Str(timestamp(at))))
        }
        _ => None,
    };
    let unviewed = post.last_unviewed_comment_at.map(|at| {
        (
            posts_by_user_pk(&post.posted_by_user_id),
            SortValue::Str(timestamp(at)),
        )
    });
    let ranked = match (&post.album_id, post.album_rank) {
        (Some(album_id), Some(rank)) => Some((posts_by_album_pk(album_id), SortValue::Num(rank))),
        _ => None,
    };

    ItemKeys::new(post_pk(&post.post_id), SINGLE_SK)
        .index(
            Index::A2,
            posts_by_user_pk(&post.posted_by_user_id),
            format!(
                "{}{}",
                post_status_prefix(post.post_status),
                timestamp(post.posted_at)
            ),
        )
        .index_if(Index::A3, unviewed)
        .index_if(Index::K1, expiring)
        .index_if(Index::K3, ranked)
}

// ============================================================================
// Comments
// ============================================================================

/// Pattern: `comment/<comment_id>`
pub fn comment_pk(comment_id: &str) -> String {
    format!("comment/{comment_id}")
}

pub fn comment_keys(comment: &Comment) -> ItemKeys {
    let created_at = timestamp(comment.created_at);
    ItemKeys::new(comment_pk(&comment.comment_id), SINGLE_SK)
        .index(Index::A1, comment_pk(&comment.post_id), created_at.clone())
        .index(Index::A2, comment_pk(&comment.user_id), created_at)
}

// ============================================================================
// Likes
// ============================================================================

/// Pattern: `like/<liked_by_user_id>/<post_id>`
pub fn like_pk(liked_by_user_id: &str, post_id: &str) -> String {
    format!("like/{liked_by_user_id}/{post_id}")
}

/// Partition of the likes by a user (GSI-A1, GSI-K2) or on a post (GSI-A2).
///
/// Pattern: `like/<id>`
pub fn likes_pk(id: &str) -> String {
    format!("like/{id}")
}

pub fn like_keys(like: &Like) -> ItemKeys {
    let sk = format!("{}/{}", like.like_status.as_str(), timestamp(like.liked_at));
    ItemKeys::new(like_pk(&like.liked_by_user_id, &like.post_id), SINGLE_SK)
        .index(Index::A1, likes_pk(&like.liked_by_user_id), sk.clone())
        .index(Index::A2, likes_pk(&like.post_id), sk)
        .index(
            Index::K2,
            likes_pk(&like.liked_by_user_id),
            like.posted_by_user_id.as_str(),
        )
}

// ============================================================================
// Follows
// ============================================================================

/// Pattern: `follower/<follower_user_id>`
pub fn follower_sk(follower_user_id: &str) -> String {
    format!("{FOLLOWER_PREFIX}{follower_user_id}")
}

/// Pattern: `followed/<followed_user_id>`
pub fn followed_pk(followed_user_id: &str) -> String {
    format!("followed/{followed_user_id}")
}

/// Pattern: `<STATUS>/`
pub fn follow_status_prefix(status: FollowStatus) -> String {
    format!("{}/", status.as_str())
}

pub fn follow_keys(follow: &Follow) -> ItemKeys {
    let sk = format!(
        "{}{}",
        follow_status_prefix(follow.follow_status),
        timestamp(follow.followed_at)
    );
    ItemKeys::new(
        user_pk(&follow.followed_user_id),
        follower_sk(&follow.follower_user_id),
    )
    .index(Index::A1, follower_sk(&follow.follower_user_id), sk.clone())
    .index(Index::A2, followed_pk(&follow.followed_user_id), sk)
}

// ============================================================================
// Feed
// ============================================================================

/// Pattern: `feed/<post_id>`
pub fn feed_sk(post_id: &str) -> String {
    format!("{FEED_PREFIX}{post_id}")
}

/// Pattern: `feed/<user_id>`
pub fn feed_pk(user_id: &str) -> String {
    format!("{FEED_PREFIX}{user_id}")
}

/// Pattern: `feed/<user_id>/<posted_by_user_id>`
pub fn feed_by_owner_pk(user_id: &str, posted_by_user_id: &str) -> String {
    format!("{FEED_PREFIX}{user_id}/{posted_by_user_id}")
}

pub fn feed_keys(item: &FeedItem) -> ItemKeys {
    let posted_at = timestamp(item.posted_at);
    ItemKeys::new(user_pk(&item.user_id), feed_sk(&item.post_id))
        .index(Index::A1, feed_pk(&item.user_id), posted_at.clone())
        .index(
            Index::K2,
            feed_by_owner_pk(&item.user_id, &item.posted_by_user_id),
            posted_at,
        )
}

// ============================================================================
// Cards
// ============================================================================

/// Pattern: `card/<card_id>`
pub fn card_pk(card_id: &str) -> String {
    format!("{CARD_PREFIX}{card_id}")
}

pub fn card_keys(card: &Card) -> ItemKeys {
    ItemKeys::new(card_pk(&card.card_id), SINGLE_SK).index(
        Index::A1,
        user_pk(&card.user_id),
        format!("{CARD_PREFIX}{}", timestamp(card.created_at)),
    )
}

// ============================================================================
// Albums
// ============================================================================

/// Pattern: `album/<id>`
pub fn album_pk(id: &str) -> String {
    format!("album/{id}")
}

pub fn album_keys(album: &Album) -> ItemKeys {
    ItemKeys::new(album_pk(&album.album_id), SINGLE_SK).index(
        Index::A1,
        album_pk(&album.owned_by_user_id),
        timestamp(album.created_at),
    )
}

// ============================================================================
// Views
// ============================================================================

/// Pattern: `view/<user_id>`
pub fn view_sk(user_id: &str) -> String {
    format!("{VIEW_PREFIX}{user_id}")
}

pub fn view_keys(view: &View) -> ItemKeys {
    ItemKeys::new(post_pk(&view.item_id), view_sk(&view.user_id))
}

// ============================================================================
// Flags
// ============================================================================

/// Pattern: `post/<post_id>` or `comment/<comment_id>`
pub fn flagged_item_pk(item: &FlaggedItem) -> String {
    match item {
        FlaggedItem::Post(id) => post_pk(id),
        FlaggedItem::Comment(id) => comment_pk(id),
    }
}

/// Pattern: `flag/<user_id>`
pub fn flag_sk(user_id: &str) -> String {
    format!("{FLAG_PREFIX}{user_id}")
}

pub fn flag_keys(flag: &Flag) -> ItemKeys {
    ItemKeys::new(flagged_item_pk(&flag.item), flag_sk(&flag.user_id)).index(
        Index::K1,
        flag_sk(&flag.user_id),
        flag.item.type_name(),
    )
}

// ============================================================================
// Blocks
// ============================================================================

/// Pattern: `block/<blocker_user_id>/<blocked_user_id>`
pub fn block_pk(blocker_user_id: &str, blocked_user_id: &str) -> String {
    format!("block/{blocker_user_id}/{blocked_user_id}")
}

/// Pattern: `block/<user_id>`
pub fn blocks_pk(user_id: &str) -> String {
    format!("block/{user_id}")
}

pub fn block_keys(block: &Block) -> ItemKeys {
    let blocked_at = timestamp(block.blocked_at);
    ItemKeys::new(
        block_pk(&block.blocker_user_id, &block.blocked_user_id),
        SINGLE_SK,
    )
    .index(Index::A1, blocks_pk(&block.blocker_user_id), blocked_at.clone())
    .index(Index::A2, blocks_pk(&block.blocked_user_id), blocked_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use real_core::model::{LikeStatus, PostType};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_timestamp_is_fixed_width() {
        assert_eq!(timestamp(at()), "2024-01-15T10:30:00.000000Z");
        assert!(timestamp(at()) < timestamp(at() + Duration::microseconds(1)));
    }

    #[test]
    fn test_user_keys() {
        let keys = user_keys(&User::new("uid", "real.user", at()));
        assert_eq!(keys.pk, "user/uid");
        assert_eq!(keys.sk, "profile");
        let a1 = keys.get(Index::A1).unwrap();
        assert_eq!(a1.pk, "username/real.user");
        assert_eq!(a1.sk, SortValue::Str("-".to_string()));
    }

    #[test]
    fn test_pending_post_has_only_status_index() {
        let post = Post::new("pid", "uid", PostType::Image, at()).with_lifetime(Duration::hours(1));
        let keys = post_keys(&post);

        assert_eq!(keys.pk, "post/pid");
        assert_eq!(keys.sk, "-");
        assert_eq!(keys.indexes.len(), 1);
        assert_eq!(
            keys.get(Index::A2).unwrap().sk,
            SortValue::Str("PENDING/2024-01-15T10:30:00.000000Z".to_string())
        );
    }

    #[test]
    fn test_completed_post_populates_sparse_indexes() {
        let mut post =
            Post::new("pid", "uid", PostType::TextOnly, at()).with_lifetime(Duration::hours(1));
        post.post_status = PostStatus::Completed;
        post.album_id = Some("aid".to_string());
        post.album_rank = Some(3);
        post.last_unviewed_comment_at = Some(at());
        let keys = post_keys(&post);

        let k1 = keys.get(Index::K1).unwrap();
        assert_eq!(k1.pk, EXPIRING_POSTS_PK);
        assert_eq!(
            k1.sk,
            SortValue::Str("2024-01-15T11:30:00.000000Z".to_string())
        );
        let k3 = keys.get(Index::K3).unwrap();
        assert_eq!(k3.pk, "post/aid");
        assert_eq!(k3.sk, SortValue::Num(3));
        assert_eq!(keys.get(Index::A3).unwrap().pk, "post/uid");
    }

    #[test]
    fn test_archived_post_leaves_expiry_index() {
        let mut post =
            Post::new("pid", "uid", PostType::TextOnly, at()).with_lifetime(Duration::hours(1));
        post.post_status = PostStatus::Archived;
        assert!(post_keys(&post).get(Index::K1).is_none());
    }

    #[test]
    fn test_like_keys() {
        let like = Like {
            liked_by_user_id: "liker".to_string(),
            post_id: "pid".to_string(),
            posted_by_user_id: "owner".to_string(),
            like_status: LikeStatus::Anonymous,
            liked_at: at(),
        };
        let keys = like_keys(&like);

        assert_eq!(keys.pk, "like/liker/pid");
        assert_eq!(keys.get(Index::A1).unwrap().pk, "like/liker");
        assert_eq!(keys.get(Index::A2).unwrap().pk, "like/pid");
        assert_eq!(
            keys.get(Index::A2).unwrap().sk,
            SortValue::Str("ANONYMOUS/2024-01-15T10:30:00.000000Z".to_string())
        );
        assert_eq!(
            keys.get(Index::K2).unwrap().sk,
            SortValue::Str("owner".to_string())
        );
    }

    #[test]
    fn test_follow_keys_live_under_followed_user() {
        let follow = Follow {
            follower_user_id: "fan".to_string(),
            followed_user_id: "star".to_string(),
            follow_status: FollowStatus::Requested,
            followed_at: at(),
        };
        let keys = follow_keys(&follow);

        assert_eq!(keys.pk, "user/star");
        assert_eq!(keys.sk, "follower/fan");
        assert_eq!(keys.get(Index::A1).unwrap().pk, "follower/fan");
        assert_eq!(keys.get(Index::A2).unwrap().pk, "followed/star");
        assert!(matches!(
            &keys.get(Index::A2).unwrap().sk,
            SortValue::Str(sk) if sk.starts_with(&follow_status_prefix(FollowStatus::Requested))
        ));
    }

    #[test]
    fn test_feed_keys() {
        let item = FeedItem {
            user_id: "reader".to_string(),
            post_id: "pid".to_string(),
            posted_by_user_id: "owner".to_string(),
            posted_at: at(),
        };
        let keys = feed_keys(&item);

        assert_eq!(keys.pk, "user/reader");
        assert_eq!(keys.sk, "feed/pid");
        assert_eq!(keys.get(Index::A1).unwrap().pk, "feed/reader");
        assert_eq!(keys.get(Index::K2).unwrap().pk, "feed/reader/owner");
    }

    #[test]
    fn test_flag_keys_share_item_partition() {
        let flag = Flag {
            item: FlaggedItem::Comment("cid".to_string()),
            user_id: "uid".to_string(),
            flagged_at: at(),
        };
        let keys = flag_keys(&flag);

        assert_eq!(keys.pk, comment_pk("cid"));
        assert_eq!(keys.sk, "flag/uid");
        assert_eq!(
            keys.get(Index::K1).unwrap().sk,
            SortValue::Str("comment".to_string())
        );
    }

    #[test]
    fn test_block_keys() {
        let block = Block {
            blocker_user_id: "a".to_string(),
            blocked_user_id: "b".to_string(),
            blocked_at: at(),
        };
        let keys = block_keys(&block);

        assert_eq!(keys.pk, "block/a/b");
        assert_eq!(keys.get(Index::A1).unwrap().pk, "block/a");
        assert_eq!(keys.get(Index::A2).unwrap().pk, "block/b");
    }

    #[test]
    fn test_index_attribute_names() {
        assert_eq!(Index::K3.name(), "GSI-K3");
        assert_eq!(Index::A2.partition_key(), "gsiA2PartitionKey");
        assert_eq!(Index::K1.sort_key(), "gsiK1SortKey");
    }
}
