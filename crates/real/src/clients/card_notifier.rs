//! Card notifications fanned out to connected clients.
//!
//! Every card write is published on a per-user tokio broadcast channel.
//! The SSE handler subscribes to the caller's channel.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

use real_core::model::{Card, CardNotificationType};

use super::Result;

/// A card write as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardEvent {
    #[serde(rename = "type")]
    pub kind: CardNotificationType,
    pub card: Card,
}

#[async_trait]
pub trait CardNotifier: Send + Sync {
    async fn notify(&self, kind: CardNotificationType, card: &Card) -> Result<()>;
}

/// In-memory notifier backed by one broadcast channel per user.
#[derive(Debug, Clone)]
pub struct MemoryCardNotifier {
    capacity: usize,
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<CardEvent>>>>,
}

impl MemoryCardNotifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn get_or_create_channel(&self, user_id: &str) -> broadcast::Sender<CardEvent> {
        {
            let channels = self.channels.read().await;
            if let Some(sender) = channels.get(user_id) {
                return sender.clone();
            }
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    pub async fn subscribe(&self, user_id: &str) -> broadcast::Receiver<CardEvent> {
        self.get_or_create_channel(user_id).await.subscribe()
    }
}

#[async_trait]
impl CardNotifier for MemoryCardNotifier {
    async fn notify(&self, kind: CardNotificationType, card: &Card) -> Result<()> {
        let sender = self.get_or_create_channel(&card.user_id).await;
        // No receivers just means the user is not connected.
        let _ = sender.send(CardEvent {
            kind,
            card: card.clone(),
        });
        tracing::debug!(card_id = %card.card_id, user_id = %card.user_id, %kind, "Card notification published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn card(user_id: &str) -> Card {
        Card {
            card_id: format!("{user_id}:POST_LIKES:pid"),
            user_id: user_id.to_string(),
            title: "You have new likes".to_string(),
            action: "https://real.app/user/uid/post/pid/likes".to_string(),
            created_at: Utc::now(),
            notify_user_after: None,
        }
    }

    #[tokio::test]
    async fn test_notify_reaches_card_owner_only() {
        let notifier = MemoryCardNotifier::new(16);
        let mut owner = notifier.subscribe("uid").await;
        let mut other = notifier.subscribe("other").await;

        notifier
            .notify(CardNotificationType::Added, &card("uid"))
            .await
            .unwrap();

        let event = owner.recv().await.unwrap();
        assert_eq!(event.kind, CardNotificationType::Added);
        assert_eq!(event.card.user_id, "uid");
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_notify_without_subscribers() {
        let notifier = MemoryCardNotifier::new(16);
        let result = notifier
            .notify(CardNotificationType::Deleted, &card("uid"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_channel_reuse() {
        let notifier = MemoryCardNotifier::new(16);
        let _first = notifier.subscribe("uid").await;
        let _second = notifier.subscribe("uid").await;
        assert_eq!(notifier.channels.read().await.len(), 1);
    }
}
