//! Application state shared by the request handlers.
//!
//! The state owns the wired-up managers, the stream dispatcher, and the card
//! notifier the SSE handler subscribes to. The storage backend is picked by
//! feature flag in the factory modules below.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{sync::broadcast, task::JoinHandle};

use crate::clients::{DatingClient, HttpDatingClient, MemoryCardNotifier, NoopDatingClient};
use crate::config::Config;
use crate::managers::{Clients, ManagerConfig, Managers, Repositories};
use crate::stream::StreamDispatcher;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub managers: Managers,
    /// Dispatches change records to the manager hooks.
    pub dispatcher: StreamDispatcher,
    /// Per-user card notification channels.
    pub card_notifier: MemoryCardNotifier,
    /// Shutdown signal sender for SSE connections and background tasks.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Wires the managers over the given repositories.
    fn build(repos: Repositories, config: &Config) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let card_notifier = MemoryCardNotifier::new(config.card_channel_capacity);

        let dating: Arc<dyn DatingClient> = match &config.dating_endpoint {
            Some(endpoint) => {
                tracing::info!(%endpoint, prefix = %config.dating_function_prefix, "Dating sync enabled");
                Arc::new(HttpDatingClient::new(
                    endpoint.as_str(),
                    config.dating_function_prefix.as_str(),
                ))
            }
            None => {
                tracing::info!("Dating sync disabled, REAL_DATING_ENDPOINT is not set");
                Arc::new(NoopDatingClient)
            }
        };

        let managers = Managers::new(
            repos,
            Clients {
                card_notifier: Arc::new(card_notifier.clone()),
                dating,
            },
            ManagerConfig {
                flag_admin_usernames: config.flag_admin_usernames.clone(),
            },
        );
        let dispatcher = StreamDispatcher::new(managers.clone());

        Self {
            managers,
            dispatcher,
            card_notifier,
            shutdown_tx,
        }
    }

    /// Archives posts past their expiry every `interval` until shutdown.
    pub fn spawn_expiry_sweep(&self, interval: Duration) -> JoinHandle<()> {
        let post = self.managers.post.clone();
        let mut shutdown_rx = self.subscribe_shutdown();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = post.archive_expired_posts(Utc::now()).await {
                            tracing::error!(error = %e, "Failed to archive expired posts");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Expiry sweep shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Subscribe to shutdown signal.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal all SSE connections and background tasks to shut down.
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

// ============================================================================
// Factory functions for the storage backends
// ============================================================================

#[cfg(feature = "inmemory")]
mod inmemory {
    use super::*;
    use crate::storage::InMemoryRepository;

    impl AppState {
        /// Creates AppState with in-memory storage.
        ///
        /// The change log is drained by a background worker, standing in for
        /// the table stream.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let store = Arc::new(InMemoryRepository::new());
            let state = Self::build(Repositories::from_store(store.clone()), config);

            state.dispatcher.clone().spawn_worker(
                store,
                config.stream_poll_interval(),
                state.subscribe_shutdown(),
            );
            state.spawn_expiry_sweep(config.expiry_sweep_interval());

            Ok(state)
        }
    }
}

#[cfg(feature = "dynamodb")]
mod dynamodb {
    use super::*;
    use crate::storage::DynamoDbRepository;

    impl AppState {
        /// Creates AppState with DynamoDB storage.
        ///
        /// Stream records arrive through `POST /internal/stream`.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let dynamodb_client = aws_sdk_dynamodb::Client::new(&aws_config);
            let dynamodb_repo = Arc::new(DynamoDbRepository::new(
                dynamodb_client,
                config.dynamodb_table_name.clone(),
            ));
            tracing::info!(table = dynamodb_repo.table_name(), "Using DynamoDB storage");

            let state = Self::build(Repositories::from_store(dynamodb_repo), config);
            state.spawn_expiry_sweep(config.expiry_sweep_interval());

            Ok(state)
        }
    }
}

// ============================================================================
// Test support
// ============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::storage::InMemoryRepository;

    impl AppState {
        /// State over the given store, without background tasks. Tests
        /// settle the change log themselves.
        pub fn with_store(store: Arc<InMemoryRepository>) -> Self {
            let config = Config {
                dynamodb_table_name: "real".to_string(),
                dating_endpoint: None,
                dating_function_prefix: "real-dating".to_string(),
                flag_admin_usernames: vec!["real.admin".to_string()],
                stream_poll_interval_ms: 100,
                expiry_sweep_interval_seconds: 60,
                card_channel_capacity: 16,
            };
            Self::build(Repositories::from_store(store), &config)
        }
    }

    impl Default for AppState {
        fn default() -> Self {
            Self::with_store(Arc::new(InMemoryRepository::new()))
        }
    }
}
