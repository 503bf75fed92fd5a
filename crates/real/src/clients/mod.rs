//! Outbound clients: card notifications and the dating service.

mod card_notifier;
mod dating;

pub use card_notifier::{CardEvent, CardNotifier, MemoryCardNotifier};
pub use dating::{DatingClient, HttpDatingClient, NoopDatingClient};

use thiserror::Error;

/// Errors raised by outbound clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request to `{url}` failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Request to `{url}` returned status {status}")]
    Status { url: String, status: u16 },
}

pub type Result<T> = std::result::Result<T, ClientError>;
