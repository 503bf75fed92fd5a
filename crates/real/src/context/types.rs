//! Pure types for request-scoped context.

use uuid::Uuid;

/// Header carrying the authenticated user id, set by the identity layer in
/// front of this service.
pub const USER_ID_HEADER: &str = "x-real-user-id";

/// Unique identifier for a request, used for tracing and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request-scoped context available to every authenticated handler.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The calling user.
    pub user_id: String,
    pub request_id: RequestId,
}
