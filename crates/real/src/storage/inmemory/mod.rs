//! In-memory storage backend.
//!
//! Stores every entity in `BTreeMap`s behind tokio `RwLock`s and keeps a
//! change log in place of the store's change-data-capture stream. Used by
//! the default build and by every test.
//!
//! # Example
//!
//! ```rust,ignore
//! use real::storage::inmemory::InMemoryRepository;
//!
//! let repo = InMemoryRepository::new();
//! let changes = repo.take_changes().await;
//! ```

mod repository;
mod table;

pub use repository::InMemoryRepository;
