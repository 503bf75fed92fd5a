use std::sync::Arc;

use chrono::Utc;

use real_core::model::{Card, CardError, CardNotificationType, CardSpec};

use super::{Repositories, Result};
use crate::clients::CardNotifier;

/// Manages cards, the in-app notifications.
///
/// Cards are addressed by [`CardSpec`], so adding the same spec twice updates
/// the existing card. Every write is pushed to the card notifier.
#[derive(Clone)]
pub struct CardManager {
    repos: Repositories,
    notifier: Arc<dyn CardNotifier>,
}

impl CardManager {
    pub fn new(repos: Repositories, notifier: Arc<dyn CardNotifier>) -> Self {
        Self { repos, notifier }
    }

    async fn notify(&self, kind: CardNotificationType, card: &Card) {
        if let Err(e) = self.notifier.notify(kind, card).await {
            tracing::warn!(card_id = %card.card_id, %kind, error = %e, "Failed to send card notification");
        }
    }

    pub async fn get_card(&self, card_id: &str) -> Result<Option<Card>> {
        Ok(self.repos.cards.get_card(card_id).await?)
    }

    /// Cards of a user, newest first.
    pub async fn list_cards(&self, user_id: &str) -> Result<Vec<Card>> {
        Ok(self.repos.cards.list_cards_by_user(user_id).await?)
    }

    pub async fn add_or_update_card_by_spec(&self, spec: &CardSpec) -> Result<Card> {
        let card_id = spec.card_id();
        let title = spec.title();
        let action = spec.action();

        if let Some(existing) = self.repos.cards.get_card(&card_id).await? {
            if existing.title == title && existing.action == action {
                return Ok(existing);
            }
            let card = Card {
                title,
                action,
                ..existing
            };
            self.repos.cards.update_card(&card).await?;
            tracing::debug!(%card_id, "Card updated");
            self.notify(CardNotificationType::Edited, &card).await;
            return Ok(card);
        }

        let card = Card {
            card_id: card_id.clone(),
            user_id: spec.user_id().to_string(),
            title,
            action,
            created_at: Utc::now(),
            notify_user_after: None,
        };
        self.repos.cards.create_card(&card).await?;
        tracing::debug!(%card_id, "Card added");
        self.notify(CardNotificationType::Added, &card).await;
        Ok(card)
    }

    /// Removes the card a spec addresses. Returns whether one existed.
    pub async fn remove_card_by_spec_if_exists(&self, spec: &CardSpec) -> Result<bool> {
        let Some(card) = self.repos.cards.get_card(&spec.card_id()).await? else {
            return Ok(false);
        };
        self.remove(&card).await
    }

    async fn remove(&self, card: &Card) -> Result<bool> {
        match self.repos.cards.delete_card(&card.card_id).await {
            Ok(()) => {
                self.notify(CardNotificationType::Deleted, card).await;
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Dismisses a card on behalf of its owner.
    pub async fn delete_card(&self, card_id: &str, user_id: &str) -> Result<()> {
        let card = self
            .repos
            .cards
            .get_card(card_id)
            .await?
            .ok_or_else(|| CardError::DoesNotExist(card_id.to_string()))?;
        if card.user_id != user_id {
            return Err(CardError::NotOwner {
                card_id: card_id.to_string(),
                user_id: user_id.to_string(),
            }
            .into());
        }
        self.remove(&card).await?;
        Ok(())
    }

    pub async fn delete_all_by_user(&self, user_id: &str) -> Result<()> {
        for card in self.repos.cards.list_cards_by_user(user_id).await? {
            self.remove(&card).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::Harness;
    use crate::managers::ManagerError;

    #[tokio::test]
    async fn test_add_then_update_by_spec() {
        let h = Harness::new();
        let mut events = h.notifier.subscribe("uid").await;
        let card = &h.managers.card;

        let added = card
            .add_or_update_card_by_spec(&CardSpec::comment_activity("uid", "pid", 1))
            .await
            .unwrap();
        assert_eq!(added.card_id, "uid:COMMENT_ACTIVITY:pid");
        assert_eq!(added.title, "You have 1 new comment");

        let updated = card
            .add_or_update_card_by_spec(&CardSpec::comment_activity("uid", "pid", 2))
            .await
            .unwrap();
        assert_eq!(updated.title, "You have 2 new comments");
        assert_eq!(updated.created_at, added.created_at);

        // Same title again, nothing to write.
        card.add_or_update_card_by_spec(&CardSpec::comment_activity("uid", "pid", 2))
            .await
            .unwrap();

        assert_eq!(events.recv().await.unwrap().kind, CardNotificationType::Added);
        assert_eq!(events.recv().await.unwrap().kind, CardNotificationType::Edited);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_by_spec_if_exists() {
        let h = Harness::new();
        let card = &h.managers.card;
        let spec = CardSpec::post_likes("uid", "pid");

        assert!(!card.remove_card_by_spec_if_exists(&spec).await.unwrap());
        card.add_or_update_card_by_spec(&spec).await.unwrap();
        assert!(card.remove_card_by_spec_if_exists(&spec).await.unwrap());
        assert!(card.get_card(&spec.card_id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_card_requires_owner() {
        let h = Harness::new();
        let card = &h.managers.card;
        let spec = CardSpec::post_views("uid", "pid");
        card.add_or_update_card_by_spec(&spec).await.unwrap();

        let result = card.delete_card(&spec.card_id(), "other").await;
        assert!(matches!(
            result,
            Err(ManagerError::Card(CardError::NotOwner { .. }))
        ));

        card.delete_card(&spec.card_id(), "uid").await.unwrap();
        let result = card.delete_card(&spec.card_id(), "uid").await;
        assert!(matches!(
            result,
            Err(ManagerError::Card(CardError::DoesNotExist(_)))
        ));
    }

    #[tokio::test]
    async fn test_card_count_follows_cards() {
        let h = Harness::new();
        h.user("uid").await;
        let card = &h.managers.card;

        card.add_or_update_card_by_spec(&CardSpec::post_likes("uid", "p1"))
            .await
            .unwrap();
        card.add_or_update_card_by_spec(&CardSpec::post_views("uid", "p1"))
            .await
            .unwrap();
        h.settle().await;
        assert_eq!(h.get_user("uid").await.card_count, 2);

        card.delete_all_by_user("uid").await.unwrap();
        h.settle().await;
        assert_eq!(h.get_user("uid").await.card_count, 0);
        assert!(card.list_cards("uid").await.unwrap().is_empty());
    }
}
