use chrono::Utc;

use real_core::model::{follow_counter_deltas, Follow, FollowError, FollowStatus, UserError};

use super::{apply_user_counter_deltas, Repositories, Result};

/// Manages follow relationships.
///
/// A follow request to a private user waits in `REQUESTED` until the
/// followed user accepts or denies it. Public users are followed at once.
#[derive(Clone)]
pub struct FollowerManager {
    repos: Repositories,
}

impl FollowerManager {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn get_follow(
        &self,
        follower_user_id: &str,
        followed_user_id: &str,
    ) -> Result<Option<Follow>> {
        Ok(self
            .repos
            .follows
            .get_follow(follower_user_id, followed_user_id)
            .await?)
    }

    /// The follow status, `NOT_FOLLOWING` when there is no follow item.
    pub async fn get_follow_status(
        &self,
        follower_user_id: &str,
        followed_user_id: &str,
    ) -> Result<FollowStatus> {
        Ok(self
            .get_follow(follower_user_id, followed_user_id)
            .await?
            .map(|f| f.follow_status)
            .unwrap_or_default())
    }

    pub async fn request_to_follow(
        &self,
        follower_user_id: &str,
        followed_user_id: &str,
    ) -> Result<Follow> {
        if follower_user_id == followed_user_id {
            return Err(FollowError::CannotFollowSelf(follower_user_id.to_string()).into());
        }
        let followed = self
            .repos
            .users
            .get_user(followed_user_id)
            .await?
            .ok_or_else(|| UserError::DoesNotExist(followed_user_id.to_string()))?;

        let blocked = self
            .repos
            .blocks
            .get_block(followed_user_id, follower_user_id)
            .await?
            .is_some()
            || self
                .repos
                .blocks
                .get_block(follower_user_id, followed_user_id)
                .await?
                .is_some();
        if blocked {
            return Err(FollowError::Blocked {
                follower_user_id: follower_user_id.to_string(),
                followed_user_id: followed_user_id.to_string(),
            }
            .into());
        }

        let status = self
            .get_follow_status(follower_user_id, followed_user_id)
            .await?;
        if matches!(status, FollowStatus::Following | FollowStatus::Requested) {
            return Err(FollowError::AlreadyFollowing {
                follower_user_id: follower_user_id.to_string(),
                followed_user_id: followed_user_id.to_string(),
            }
            .into());
        }

        let follow = Follow {
            follower_user_id: follower_user_id.to_string(),
            followed_user_id: followed_user_id.to_string(),
            follow_status: if followed.is_private() {
                FollowStatus::Requested
            } else {
                FollowStatus::Following
            },
            followed_at: Utc::now(),
        };
        self.repos.follows.put_follow(&follow).await?;
        tracing::info!(%follower_user_id, %followed_user_id, status = %follow.follow_status, "Follow requested");
        Ok(follow)
    }

    async fn existing(&self, follower_user_id: &str, followed_user_id: &str) -> Result<Follow> {
        self.get_follow(follower_user_id, followed_user_id)
            .await?
            .ok_or_else(|| {
                FollowError::DoesNotExist {
                    follower_user_id: follower_user_id.to_string(),
                    followed_user_id: followed_user_id.to_string(),
                }
                .into()
            })
    }

    async fn transition(
        &self,
        follow: Follow,
        action: &'static str,
        allowed_from: &[FollowStatus],
        to: FollowStatus,
    ) -> Result<Follow> {
        if !allowed_from.contains(&follow.follow_status) {
            return Err(FollowError::InvalidTransition {
                action,
                status: follow.follow_status.to_string(),
            }
            .into());
        }
        let follow = Follow {
            follow_status: to,
            ..follow
        };
        self.repos.follows.put_follow(&follow).await?;
        Ok(follow)
    }

    pub async fn unfollow(&self, follower_user_id: &str, followed_user_id: &str) -> Result<()> {
        let follow = self.existing(follower_user_id, followed_user_id).await?;
        if !matches!(
            follow.follow_status,
            FollowStatus::Following | FollowStatus::Requested
        ) {
            return Err(FollowError::InvalidTransition {
                action: "unfollow",
                status: follow.follow_status.to_string(),
            }
            .into());
        }
        self.repos
            .follows
            .delete_follow(follower_user_id, followed_user_id)
            .await?;
        Ok(())
    }

    /// Called by the followed user.
    pub async fn accept(&self, follower_user_id: &str, followed_user_id: &str) -> Result<Follow> {
        let follow = self.existing(follower_user_id, followed_user_id).await?;
        self.transition(
            follow,
            "accept",
            &[FollowStatus::Requested, FollowStatus::Denied],
            FollowStatus::Following,
        )
        .await
    }

    /// Called by the followed user.
    pub async fn deny(&self, follower_user_id: &str, followed_user_id: &str) -> Result<Follow> {
        let follow = self.existing(follower_user_id, followed_user_id).await?;
        self.transition(
            follow,
            "deny",
            &[FollowStatus::Requested, FollowStatus::Following],
            FollowStatus::Denied,
        )
        .await
    }

    /// Accepts every pending request, used when a user goes public.
    pub async fn accept_all_requested(&self, followed_user_id: &str) -> Result<()> {
        let requested = self
            .repos
            .follows
            .list_followers(followed_user_id, Some(FollowStatus::Requested))
            .await?;
        for follow in requested {
            self.transition(
                follow,
                "accept",
                &[FollowStatus::Requested],
                FollowStatus::Following,
            )
            .await?;
        }
        Ok(())
    }

    pub async fn list_follower_user_ids(&self, followed_user_id: &str) -> Result<Vec<String>> {
        let follows = self
            .repos
            .follows
            .list_followers(followed_user_id, Some(FollowStatus::Following))
            .await?;
        Ok(follows.into_iter().map(|f| f.follower_user_id).collect())
    }

    pub async fn list_followed_user_ids(&self, follower_user_id: &str) -> Result<Vec<String>> {
        let follows = self
            .repos
            .follows
            .list_followeds(follower_user_id, Some(FollowStatus::Following))
            .await?;
        Ok(follows.into_iter().map(|f| f.followed_user_id).collect())
    }

    /// Drops every follow to and from the user.
    pub async fn reset_follows_of_user(&self, user_id: &str) -> Result<()> {
        for follow in self.repos.follows.list_followeds(user_id, None).await? {
            self.repos
                .follows
                .delete_follow(user_id, &follow.followed_user_id)
                .await?;
        }
        for follow in self.repos.follows.list_followers(user_id, None).await? {
            self.repos
                .follows
                .delete_follow(&follow.follower_user_id, user_id)
                .await?;
        }
        Ok(())
    }

    pub async fn on_follow_change_sync_counts(
        &self,
        old: Option<&Follow>,
        new: Option<&Follow>,
    ) -> Result<()> {
        let Some(follow) = new.or(old) else {
            return Ok(());
        };
        let old_status = old.map(|f| f.follow_status).unwrap_or_default();
        let new_status = new.map(|f| f.follow_status).unwrap_or_default();
        let deltas = follow_counter_deltas(
            &follow.follower_user_id,
            &follow.followed_user_id,
            old_status,
            new_status,
        );
        apply_user_counter_deltas(self.repos.users.as_ref(), &deltas).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::Harness;
    use crate::managers::ManagerError;

    #[tokio::test]
    async fn test_follow_public_user() {
        let h = Harness::new();
        h.user("a").await;
        h.user("b").await;

        let follow = h.managers.follower.request_to_follow("a", "b").await.unwrap();
        assert_eq!(follow.follow_status, FollowStatus::Following);
        h.settle().await;

        assert_eq!(h.get_user("a").await.followed_count, 1);
        assert_eq!(h.get_user("b").await.follower_count, 1);
        assert_eq!(
            h.managers.follower.list_follower_user_ids("b").await.unwrap(),
            vec!["a".to_string()]
        );
        assert_eq!(
            h.managers.follower.list_followed_user_ids("a").await.unwrap(),
            vec!["b".to_string()]
        );

        let result = h.managers.follower.request_to_follow("a", "b").await;
        assert!(matches!(
            result,
            Err(ManagerError::Follow(FollowError::AlreadyFollowing { .. }))
        ));

        h.managers.follower.unfollow("a", "b").await.unwrap();
        h.settle().await;
        assert_eq!(h.get_user("a").await.followed_count, 0);
        assert_eq!(h.get_user("b").await.follower_count, 0);
    }

    #[tokio::test]
    async fn test_follow_private_user_accept_and_deny() {
        let h = Harness::new();
        h.user("a").await;
        h.private_user("b").await;
        let follower = &h.managers.follower;

        let follow = follower.request_to_follow("a", "b").await.unwrap();
        assert_eq!(follow.follow_status, FollowStatus::Requested);
        h.settle().await;
        assert_eq!(h.get_user("b").await.followers_requested_count, 1);
        assert_eq!(h.get_user("b").await.follower_count, 0);

        follower.accept("a", "b").await.unwrap();
        h.settle().await;
        let b = h.get_user("b").await;
        assert_eq!(b.followers_requested_count, 0);
        assert_eq!(b.follower_count, 1);

        follower.deny("a", "b").await.unwrap();
        h.settle().await;
        assert_eq!(h.get_user("b").await.follower_count, 0);
        assert_eq!(
            follower.get_follow_status("a", "b").await.unwrap(),
            FollowStatus::Denied
        );

        let result = follower.unfollow("a", "b").await;
        assert!(matches!(
            result,
            Err(ManagerError::Follow(FollowError::InvalidTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn test_cannot_follow_self_or_blocked() {
        let h = Harness::new();
        h.user("a").await;
        h.user("b").await;

        let result = h.managers.follower.request_to_follow("a", "a").await;
        assert!(matches!(
            result,
            Err(ManagerError::Follow(FollowError::CannotFollowSelf(_)))
        ));

        h.managers.block.block("b", "a").await.unwrap();
        let result = h.managers.follower.request_to_follow("a", "b").await;
        assert!(matches!(
            result,
            Err(ManagerError::Follow(FollowError::Blocked { .. }))
        ));
    }

    #[tokio::test]
    async fn test_reset_follows_of_user() {
        let h = Harness::new();
        for user_id in ["a", "b", "c"] {
            h.user(user_id).await;
        }
        let follower = &h.managers.follower;
        follower.request_to_follow("a", "b").await.unwrap();
        follower.request_to_follow("c", "a").await.unwrap();
        h.settle().await;

        follower.reset_follows_of_user("a").await.unwrap();
        h.settle().await;

        assert_eq!(h.get_user("b").await.follower_count, 0);
        assert_eq!(h.get_user("c").await.followed_count, 0);
        assert!(follower.list_follower_user_ids("a").await.unwrap().is_empty());
    }
}
