use thiserror::Error;

use real_core::model::{
    AlbumError, BlockError, CardError, CommentError, FlagError, FollowError, LikeError, PostError,
    UserError,
};
use real_core::storage::{repository_error_to_status_code, RepositoryError};

/// Errors surfaced by manager operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Post(#[from] PostError),
    #[error(transparent)]
    Comment(#[from] CommentError),
    #[error(transparent)]
    Like(#[from] LikeError),
    #[error(transparent)]
    Follow(#[from] FollowError),
    #[error(transparent)]
    Block(#[from] BlockError),
    #[error(transparent)]
    Flag(#[from] FlagError),
    #[error(transparent)]
    Album(#[from] AlbumError),
    #[error(transparent)]
    Card(#[from] CardError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type Result<T> = std::result::Result<T, ManagerError>;

/// Maps a [`ManagerError`] to an HTTP status code.
///
/// Missing things are 404, conflicting state 409, access denied 403 and
/// invalid input 400. Storage failures defer to
/// [`repository_error_to_status_code`].
pub fn manager_error_to_status_code(error: &ManagerError) -> u16 {
    match error {
        ManagerError::User(e) => match e {
            UserError::DoesNotExist(_) => 404,
            UserError::AlreadyExists(_) | UserError::UsernameTaken(_) => 409,
            UserError::InvalidUsername(_) | UserError::DatingRequirementsNotMet { .. } => 400,
        },
        ManagerError::Post(e) => match e {
            PostError::DoesNotExist(_) => 404,
            PostError::AlreadyExists(_) | PostError::InvalidStatusTransition { .. } => 409,
            PostError::Invalid(_) => 400,
            PostError::NotOwner { .. } | PostError::NoAccess { .. } => 403,
        },
        ManagerError::Comment(e) => match e {
            CommentError::DoesNotExist(_) => 404,
            CommentError::AlreadyExists(_) => 409,
            CommentError::CannotComment { .. }
            | CommentError::NoAccess { .. }
            | CommentError::NotAuthorized { .. } => 403,
        },
        ManagerError::Like(e) => match e {
            LikeError::AlreadyLiked { .. } => 409,
            LikeError::NotLiked { .. } => 404,
            LikeError::CannotLike { .. } => 403,
        },
        ManagerError::Follow(e) => match e {
            FollowError::CannotFollowSelf(_) => 400,
            FollowError::AlreadyFollowing { .. } | FollowError::InvalidTransition { .. } => 409,
            FollowError::Blocked { .. } => 403,
            FollowError::DoesNotExist { .. } => 404,
        },
        ManagerError::Block(e) => match e {
            BlockError::CannotBlockSelf(_) => 400,
            BlockError::AlreadyBlocked { .. } => 409,
            BlockError::NotBlocked { .. } => 404,
        },
        ManagerError::Flag(e) => match e {
            FlagError::CannotFlagOwn { .. } => 400,
            FlagError::AlreadyFlagged { .. } => 409,
            FlagError::NotFlagged { .. } => 404,
        },
        ManagerError::Album(e) => match e {
            AlbumError::DoesNotExist(_) => 404,
            AlbumError::AlreadyExists(_) => 409,
            AlbumError::EmptyName => 400,
            AlbumError::NotOwner { .. } => 403,
        },
        ManagerError::Card(e) => match e {
            CardError::DoesNotExist(_) => 404,
            CardError::NotOwner { .. } => 403,
        },
        ManagerError::Repository(e) => repository_error_to_status_code(e),
    }
}
