//! Storage backend implementations.
//!
//! This module provides concrete implementations of the repository traits
//! defined in `real_core::storage`. The backend the binary runs on is
//! selected at compile time via feature flags.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): maps in process memory, with a change log that
//!   the stream worker drains
//! - `dynamodb`: AWS DynamoDB single-table backend using `aws-sdk-dynamodb`
//!
//! These features are mutually exclusive. The in-memory backend is always
//! compiled for tests.
//!
//! # Examples
//!
//! Build with DynamoDB:
//! ```bash
//! cargo build -p real --no-default-features --features dynamodb
//! ```

#[cfg(all(feature = "inmemory", feature = "dynamodb"))]
compile_error!(
    "Features 'inmemory' and 'dynamodb' are mutually exclusive. \
    Enable only one storage backend at a time."
);

#[cfg(not(any(feature = "inmemory", feature = "dynamodb")))]
compile_error!(
    "No storage backend selected. Enable 'inmemory' or 'dynamodb' feature. \
    Example: cargo build -p real --features dynamodb"
);

#[cfg(any(test, feature = "inmemory"))]
pub mod inmemory;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

#[cfg(any(test, feature = "inmemory"))]
pub use inmemory::InMemoryRepository;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbRepository;
