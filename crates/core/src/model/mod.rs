mod card_spec;
mod counters;
mod enums;
mod error;
mod rules;
mod types;

pub use card_spec::CardSpec;
pub use counters::{AlbumCounter, CommentCounter, PostCounter, UserCounter};
pub use enums::{
    CardNotificationType, DatingStatus, FollowStatus, Gender, LikeStatus, PostStatus, PostType,
    UserPrivacyStatus, ViewedStatus,
};
pub use error::{
    AlbumError, BlockError, CardError, CommentError, FlagError, FollowError, LikeError,
    ParseEnumError, PostError, UserError,
};
pub use rules::{
    age_on, follow_counter_deltas, is_comment_unviewed,
    is_crowdsourced_forced_removal_criteria_met, is_owner_view_increase, like_counter,
    post_status_counter_deltas, validate_dating_eligibility, validate_post_status_transition,
    validate_username, CounterDelta, POST_VIEWS_CARD_THRESHOLD,
};
pub use types::{
    Album, Block, Card, Comment, FeedItem, Flag, FlaggedItem, Follow, Like, Post, User, View,
};
