use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{
    DatingStatus, FollowStatus, Gender, LikeStatus, PostStatus, PostType, UserPrivacyStatus,
};

/// A registered user and their denormalized counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub privacy_status: UserPrivacyStatus,
    pub likes_disabled: bool,
    pub comments_disabled: bool,
    pub dating_status: DatingStatus,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub created_at: DateTime<Utc>,
    pub post_count: u64,
    pub post_archived_count: u64,
    pub follower_count: u64,
    pub followed_count: u64,
    pub followers_requested_count: u64,
    pub card_count: u64,
}

impl User {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            full_name: None,
            bio: None,
            privacy_status: UserPrivacyStatus::Public,
            likes_disabled: false,
            comments_disabled: false,
            dating_status: DatingStatus::Disabled,
            date_of_birth: None,
            gender: None,
            created_at: now,
            post_count: 0,
            post_archived_count: 0,
            follower_count: 0,
            followed_count: 0,
            followers_requested_count: 0,
            card_count: 0,
        }
    }

    pub fn is_private(&self) -> bool {
        self.privacy_status == UserPrivacyStatus::Private
    }
}

/// A post. Text-only posts complete on creation, image posts wait for
/// their upload to be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub post_id: String,
    pub posted_by_user_id: String,
    pub post_type: PostType,
    pub post_status: PostStatus,
    pub text: Option<String>,
    pub album_id: Option<String>,
    /// Position inside the album; `-1` once the post left it.
    pub album_rank: Option<i64>,
    pub likes_disabled: bool,
    pub comments_disabled: bool,
    pub posted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Set while the owner has comments they have not seen yet.
    pub last_unviewed_comment_at: Option<DateTime<Utc>>,
    pub onymous_like_count: u64,
    pub anonymous_like_count: u64,
    pub comment_count: u64,
    pub comments_unviewed_count: u64,
    pub flag_count: u64,
    pub viewed_by_count: u64,
}

impl Post {
    pub fn new(
        post_id: impl Into<String>,
        posted_by_user_id: impl Into<String>,
        post_type: PostType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            post_id: post_id.into(),
            posted_by_user_id: posted_by_user_id.into(),
            post_type,
            post_status: PostStatus::Pending,
            text: None,
            album_id: None,
            album_rank: None,
            likes_disabled: false,
            comments_disabled: false,
            posted_at: now,
            expires_at: None,
            last_unviewed_comment_at: None,
            onymous_like_count: 0,
            anonymous_like_count: 0,
            comment_count: 0,
            comments_unviewed_count: 0,
            flag_count: 0,
            viewed_by_count: 0,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.expires_at = Some(self.posted_at + lifetime);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.post_status == PostStatus::Completed
    }

    pub fn like_count(&self) -> u64 {
        self.onymous_like_count + self.anonymous_like_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub comment_id: String,
    pub post_id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub flag_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub liked_by_user_id: String,
    pub post_id: String,
    pub posted_by_user_id: String,
    pub like_status: LikeStatus,
    pub liked_at: DateTime<Utc>,
}

/// Follow relationship, stored under the followed user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub follower_user_id: String,
    pub followed_user_id: String,
    pub follow_status: FollowStatus,
    pub followed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub user_id: String,
    pub post_id: String,
    pub posted_by_user_id: String,
    pub posted_at: DateTime<Utc>,
}

impl FeedItem {
    pub fn for_post(feed_user_id: impl Into<String>, post: &Post) -> Self {
        Self {
            user_id: feed_user_id.into(),
            post_id: post.post_id.clone(),
            posted_by_user_id: post.posted_by_user_id.clone(),
            posted_at: post.posted_at,
        }
    }
}

/// An in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub card_id: String,
    pub user_id: String,
    pub title: String,
    pub action: String,
    pub created_at: DateTime<Utc>,
    pub notify_user_after: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub album_id: String,
    pub owned_by_user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub art_hash: Option<String>,
    pub post_count: u64,
    pub rank_count: u64,
}

/// Per-user view tally on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub item_id: String,
    pub user_id: String,
    pub view_count: u64,
    pub first_viewed_at: DateTime<Utc>,
    pub last_viewed_at: DateTime<Utc>,
}

/// The thing a flag points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "itemType", content = "itemId", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlaggedItem {
    Post(String),
    Comment(String),
}

impl FlaggedItem {
    pub fn id(&self) -> &str {
        match self {
            FlaggedItem::Post(id) | FlaggedItem::Comment(id) => id,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FlaggedItem::Post(_) => "post",
            FlaggedItem::Comment(_) => "comment",
        }
    }
}

impl std::fmt::Display for FlaggedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} `{}`", self.type_name(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    pub item: FlaggedItem,
    pub user_id: String,
    pub flagged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub blocker_user_id: String,
    pub blocked_user_id: String,
    pub blocked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_lifetime_sets_expiry() {
        let now = Utc::now();
        let post = Post::new("pid", "uid", PostType::TextOnly, now).with_lifetime(Duration::hours(1));
        assert_eq!(post.expires_at, Some(now + Duration::hours(1)));
        assert_eq!(post.post_status, PostStatus::Pending);
    }

    #[test]
    fn test_flagged_item_serializes_tagged() {
        let json = serde_json::to_value(FlaggedItem::Comment("cid".to_string())).unwrap();
        assert_eq!(json["itemType"], "COMMENT");
        assert_eq!(json["itemId"], "cid");
    }
}
