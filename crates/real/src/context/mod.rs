//! Request-scoped context module.
//!
//! Provides the `RequestContext` extractor, which identifies the caller and
//! the request to complement application-scoped `AppState`.

mod extractor;
mod types;

pub use types::{RequestContext, RequestId, USER_ID_HEADER};
