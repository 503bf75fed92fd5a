//! DynamoDB storage backend.
//!
//! Single-table design: every entity lives in one table keyed by
//! `partitionKey`/`sortKey`, with sparse global secondary indexes
//! `GSI-A1`..`GSI-A3` and `GSI-K1`..`GSI-K3` for the list queries.
//! Change records arrive from the table's stream, see
//! [`parse_stream_event`].

mod conversions;
mod error;
mod keys;
mod repository;
mod stream;

pub use repository::DynamoDbRepository;
pub use stream::parse_stream_event;
