//! Deterministic card definitions.
//!
//! A card's id is derived from what it is about, so the same event always
//! addresses the same card: adding it twice updates it in place and removal
//! needs no lookup.

const COMMENT_ACTIVITY: &str = "COMMENT_ACTIVITY";
const POST_LIKES: &str = "POST_LIKES";
const POST_VIEWS: &str = "POST_VIEWS";
const REQUESTED_FOLLOWERS: &str = "REQUESTED_FOLLOWERS";

const APP_URL: &str = "https://real.app";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardSpec {
    /// Unviewed comments on one of the user's posts.
    CommentActivity {
        user_id: String,
        post_id: String,
        unviewed_comments_count: u64,
    },
    PostLikes {
        user_id: String,
        post_id: String,
    },
    PostViews {
        user_id: String,
        post_id: String,
    },
    RequestedFollowers {
        user_id: String,
        requested_followers_count: u64,
    },
}

impl CardSpec {
    pub fn comment_activity(
        user_id: impl Into<String>,
        post_id: impl Into<String>,
        unviewed_comments_count: u64,
    ) -> Self {
        CardSpec::CommentActivity {
            user_id: user_id.into(),
            post_id: post_id.into(),
            unviewed_comments_count,
        }
    }

    pub fn post_likes(user_id: impl Into<String>, post_id: impl Into<String>) -> Self {
        CardSpec::PostLikes {
            user_id: user_id.into(),
            post_id: post_id.into(),
        }
    }

    pub fn post_views(user_id: impl Into<String>, post_id: impl Into<String>) -> Self {
        CardSpec::PostViews {
            user_id: user_id.into(),
            post_id: post_id.into(),
        }
    }

    pub fn requested_followers(user_id: impl Into<String>, requested_followers_count: u64) -> Self {
        CardSpec::RequestedFollowers {
            user_id: user_id.into(),
            requested_followers_count,
        }
    }

    /// The three cards that hang off a single post.
    pub fn post_cards(user_id: &str, post_id: &str) -> [CardSpec; 3] {
        [
            CardSpec::comment_activity(user_id, post_id, 0),
            CardSpec::post_likes(user_id, post_id),
            CardSpec::post_views(user_id, post_id),
        ]
    }

    pub fn user_id(&self) -> &str {
        match self {
            CardSpec::CommentActivity { user_id, .. }
            | CardSpec::PostLikes { user_id, .. }
            | CardSpec::PostViews { user_id, .. }
            | CardSpec::RequestedFollowers { user_id, .. } => user_id,
        }
    }

    pub fn post_id(&self) -> Option<&str> {
        match self {
            CardSpec::CommentActivity { post_id, .. }
            | CardSpec::PostLikes { post_id, .. }
            | CardSpec::PostViews { post_id, .. } => Some(post_id),
            CardSpec::RequestedFollowers { .. } => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            CardSpec::CommentActivity { .. } => COMMENT_ACTIVITY,
            CardSpec::PostLikes { .. } => POST_LIKES,
            CardSpec::PostViews { .. } => POST_VIEWS,
            CardSpec::RequestedFollowers { .. } => REQUESTED_FOLLOWERS,
        }
    }

    pub fn card_id(&self) -> String {
        match self.post_id() {
            Some(post_id) => format!("{}:{}:{}", self.user_id(), self.kind(), post_id),
            None => format!("{}:{}", self.user_id(), self.kind()),
        }
    }

    pub fn title(&self) -> String {
        match self {
            CardSpec::CommentActivity {
                unviewed_comments_count: 1,
                ..
            } => "You have 1 new comment".to_string(),
            CardSpec::CommentActivity {
                unviewed_comments_count,
                ..
            } => format!("You have {unviewed_comments_count} new comments"),
            CardSpec::PostLikes { .. } => "You have new likes".to_string(),
            CardSpec::PostViews { .. } => "You have new views".to_string(),
            CardSpec::RequestedFollowers {
                requested_followers_count: 1,
                ..
            } => "You have 1 pending follow request".to_string(),
            CardSpec::RequestedFollowers {
                requested_followers_count,
                ..
            } => format!("You have {requested_followers_count} pending follow requests"),
        }
    }

    pub fn action(&self) -> String {
        let user_id = self.user_id();
        match self {
            CardSpec::CommentActivity { post_id, .. } => {
                format!("{APP_URL}/user/{user_id}/post/{post_id}/comments")
            }
            CardSpec::PostLikes { post_id, .. } => {
                format!("{APP_URL}/user/{user_id}/post/{post_id}/likes")
            }
            CardSpec::PostViews { post_id, .. } => {
                format!("{APP_URL}/user/{user_id}/post/{post_id}/views")
            }
            CardSpec::RequestedFollowers { .. } => {
                format!("{APP_URL}/user/{user_id}/followers?requested=true")
            }
        }
    }

    /// Recovers the spec a card id was built from.
    ///
    /// Counts are not part of the id and come back as zero. User ids may
    /// contain `:` so the kind marker is searched for rather than split on.
    pub fn from_card_id(card_id: &str) -> Option<CardSpec> {
        for kind in [COMMENT_ACTIVITY, POST_LIKES, POST_VIEWS] {
            let marker = format!(":{kind}:");
            if let Some((user_id, post_id)) = card_id.split_once(marker.as_str()) {
                if user_id.is_empty() || post_id.is_empty() {
                    return None;
                }
                return Some(match kind {
                    COMMENT_ACTIVITY => CardSpec::comment_activity(user_id, post_id, 0),
                    POST_LIKES => CardSpec::post_likes(user_id, post_id),
                    _ => CardSpec::post_views(user_id, post_id),
                });
            }
        }
        card_id
            .strip_suffix(&format!(":{REQUESTED_FOLLOWERS}"))
            .filter(|user_id| !user_id.is_empty())
            .map(|user_id| CardSpec::requested_followers(user_id, 0))
    }
}
