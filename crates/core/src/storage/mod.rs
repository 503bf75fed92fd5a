mod error;
mod http_mapping;
mod traits;

pub use error::{RepositoryError, Result};
pub use http_mapping::repository_error_to_status_code;
pub use traits::{
    AlbumRepository, BlockRepository, CardRepository, CommentRepository, FeedRepository,
    FlagRepository, FollowRepository, LikeRepository, PostRepository, Store, UserRepository,
    ViewRepository,
};
