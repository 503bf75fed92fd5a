pub mod albums;
pub mod cards;
pub mod comments;
pub mod error;
pub mod feed;
pub mod follows;
pub mod health;
pub mod posts;
#[cfg(feature = "dynamodb")]
pub mod stream;
pub mod users;

pub use error::AppError;
