use thiserror::Error;

use super::enums::PostStatus;

/// A stored string did not name a known enum variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unrecognized {type_name}: `{value}`")]
pub struct ParseEnumError {
    pub type_name: &'static str,
    pub value: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserError {
    #[error("User `{0}` does not exist")]
    DoesNotExist(String),
    #[error("User `{0}` already exists")]
    AlreadyExists(String),
    #[error("Invalid username `{0}`")]
    InvalidUsername(String),
    #[error("Username `{0}` is already taken")]
    UsernameTaken(String),
    #[error("User `{user_id}` does not meet dating requirements: {reason}")]
    DatingRequirementsNotMet { user_id: String, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PostError {
    #[error("Post `{0}` does not exist")]
    DoesNotExist(String),
    #[error("Post `{0}` already exists")]
    AlreadyExists(String),
    #[error("Invalid post: {0}")]
    Invalid(String),
    #[error("Post `{post_id}` cannot move from {from} to {to}")]
    InvalidStatusTransition {
        post_id: String,
        from: PostStatus,
        to: PostStatus,
    },
    #[error("User `{user_id}` does not own post `{post_id}`")]
    NotOwner { post_id: String, user_id: String },
    #[error("User `{user_id}` does not have access to post `{post_id}`")]
    NoAccess { post_id: String, user_id: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommentError {
    #[error("Comment `{0}` does not exist")]
    DoesNotExist(String),
    #[error("Comment `{0}` already exists")]
    AlreadyExists(String),
    #[error("Cannot comment on post `{post_id}`: {reason}")]
    CannotComment { post_id: String, reason: String },
    #[error("User `{user_id}` does not have access to post `{post_id}`")]
    NoAccess { post_id: String, user_id: String },
    #[error("User `{user_id}` cannot delete comment `{comment_id}`")]
    NotAuthorized { comment_id: String, user_id: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LikeError {
    #[error("User `{user_id}` has already liked post `{post_id}`")]
    AlreadyLiked { user_id: String, post_id: String },
    #[error("User `{user_id}` has not liked post `{post_id}`")]
    NotLiked { user_id: String, post_id: String },
    #[error("Cannot like post `{post_id}`: {reason}")]
    CannotLike { post_id: String, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FollowError {
    #[error("User `{0}` cannot follow themselves")]
    CannotFollowSelf(String),
    #[error("User `{follower_user_id}` is already following or has requested `{followed_user_id}`")]
    AlreadyFollowing {
        follower_user_id: String,
        followed_user_id: String,
    },
    #[error("A block exists between `{follower_user_id}` and `{followed_user_id}`")]
    Blocked {
        follower_user_id: String,
        followed_user_id: String,
    },
    #[error("User `{follower_user_id}` does not follow `{followed_user_id}`")]
    DoesNotExist {
        follower_user_id: String,
        followed_user_id: String,
    },
    #[error("Cannot {action} a follow in status {status}")]
    InvalidTransition { action: &'static str, status: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("User `{0}` cannot block themselves")]
    CannotBlockSelf(String),
    #[error("User `{blocker_user_id}` has already blocked `{blocked_user_id}`")]
    AlreadyBlocked {
        blocker_user_id: String,
        blocked_user_id: String,
    },
    #[error("User `{blocker_user_id}` has not blocked `{blocked_user_id}`")]
    NotBlocked {
        blocker_user_id: String,
        blocked_user_id: String,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlagError {
    #[error("User `{user_id}` cannot flag their own {item}")]
    CannotFlagOwn { item: String, user_id: String },
    #[error("User `{user_id}` has already flagged {item}")]
    AlreadyFlagged { item: String, user_id: String },
    #[error("User `{user_id}` has not flagged {item}")]
    NotFlagged { item: String, user_id: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlbumError {
    #[error("Album `{0}` does not exist")]
    DoesNotExist(String),
    #[error("Album `{0}` already exists")]
    AlreadyExists(String),
    #[error("Album name cannot be empty")]
    EmptyName,
    #[error("User `{user_id}` does not own album `{album_id}`")]
    NotOwner { album_id: String, user_id: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CardError {
    #[error("Card `{0}` does not exist")]
    DoesNotExist(String),
    #[error("User `{user_id}` does not own card `{card_id}`")]
    NotOwner { card_id: String, user_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_no_access_display() {
        let err = CommentError::NoAccess {
            post_id: "pid".to_string(),
            user_id: "uid".to_string(),
        };
        assert!(err.to_string().contains("not have access"));
    }

    #[test]
    fn test_invalid_status_transition_display() {
        let err = PostError::InvalidStatusTransition {
            post_id: "pid".to_string(),
            from: PostStatus::Pending,
            to: PostStatus::Archived,
        };
        assert_eq!(err.to_string(), "Post `pid` cannot move from PENDING to ARCHIVED");
    }
}
