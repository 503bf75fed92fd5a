use chrono::Utc;

use real_core::model::{Block, BlockError, UserError};

use super::{LikeManager, Repositories, Result};

#[derive(Clone)]
pub struct BlockManager {
    repos: Repositories,
    like: LikeManager,
}

impl BlockManager {
    pub fn new(repos: Repositories, like: LikeManager) -> Self {
        Self { repos, like }
    }

    /// Blocks a user. Follows between the two users are dropped in both
    /// directions, as are the likes each left on the other's posts.
    pub async fn block(&self, blocker_user_id: &str, blocked_user_id: &str) -> Result<Block> {
        if blocker_user_id == blocked_user_id {
            return Err(BlockError::CannotBlockSelf(blocker_user_id.to_string()).into());
        }
        if self.repos.users.get_user(blocked_user_id).await?.is_none() {
            return Err(UserError::DoesNotExist(blocked_user_id.to_string()).into());
        }

        let block = Block {
            blocker_user_id: blocker_user_id.to_string(),
            blocked_user_id: blocked_user_id.to_string(),
            blocked_at: Utc::now(),
        };
        match self.repos.blocks.create_block(&block).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {
                return Err(BlockError::AlreadyBlocked {
                    blocker_user_id: blocker_user_id.to_string(),
                    blocked_user_id: blocked_user_id.to_string(),
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        }

        for (follower, followed) in [
            (blocker_user_id, blocked_user_id),
            (blocked_user_id, blocker_user_id),
        ] {
            match self.repos.follows.delete_follow(follower, followed).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.like
            .dislike_all_by_user_from_user(blocker_user_id, blocked_user_id)
            .await?;
        self.like
            .dislike_all_by_user_from_user(blocked_user_id, blocker_user_id)
            .await?;

        tracing::info!(%blocker_user_id, %blocked_user_id, "User blocked");
        Ok(block)
    }

    pub async fn unblock(&self, blocker_user_id: &str, blocked_user_id: &str) -> Result<()> {
        match self
            .repos
            .blocks
            .delete_block(blocker_user_id, blocked_user_id)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Err(BlockError::NotBlocked {
                blocker_user_id: blocker_user_id.to_string(),
                blocked_user_id: blocked_user_id.to_string(),
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn is_blocked(&self, blocker_user_id: &str, blocked_user_id: &str) -> Result<bool> {
        Ok(self
            .repos
            .blocks
            .get_block(blocker_user_id, blocked_user_id)
            .await?
            .is_some())
    }

    pub async fn block_exists_either_way(&self, user_id: &str, other_user_id: &str) -> Result<bool> {
        Ok(self.is_blocked(user_id, other_user_id).await?
            || self.is_blocked(other_user_id, user_id).await?)
    }

    /// Drops every block the user made or received.
    pub async fn unblock_all_by_user(&self, user_id: &str) -> Result<()> {
        for block in self.repos.blocks.list_blocks_by_blocker(user_id).await? {
            self.repos
                .blocks
                .delete_block(user_id, &block.blocked_user_id)
                .await?;
        }
        for block in self.repos.blocks.list_blocks_by_blocked(user_id).await? {
            self.repos
                .blocks
                .delete_block(&block.blocker_user_id, user_id)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::Harness;
    use crate::managers::ManagerError;
    use real_core::model::{FollowStatus, LikeStatus};

    #[tokio::test]
    async fn test_block_self_fails() {
        let h = Harness::new();
        let result = h.managers.block.block("uid", "uid").await;
        assert!(matches!(
            result,
            Err(ManagerError::Block(BlockError::CannotBlockSelf(_)))
        ));
    }

    #[tokio::test]
    async fn test_block_removes_follows_and_likes() {
        let h = Harness::new();
        h.user("a").await;
        h.user("b").await;
        h.post("pa", "a").await;
        h.post("pb", "b").await;
        h.managers.follower.request_to_follow("a", "b").await.unwrap();
        h.managers.follower.request_to_follow("b", "a").await.unwrap();
        h.managers
            .like
            .like_post("a", "pb", LikeStatus::OnymouslyLiked)
            .await
            .unwrap();
        h.managers
            .like
            .like_post("b", "pa", LikeStatus::OnymouslyLiked)
            .await
            .unwrap();
        h.settle().await;
        assert_eq!(h.get_user("a").await.follower_count, 1);

        h.managers.block.block("a", "b").await.unwrap();
        h.settle().await;

        assert!(h.managers.block.is_blocked("a", "b").await.unwrap());
        assert!(!h.managers.block.is_blocked("b", "a").await.unwrap());
        assert!(h
            .managers
            .block
            .block_exists_either_way("b", "a")
            .await
            .unwrap());
        assert_eq!(
            h.managers.follower.get_follow_status("a", "b").await.unwrap(),
            FollowStatus::NotFollowing
        );
        assert_eq!(h.get_user("a").await.follower_count, 0);
        assert_eq!(h.get_user("b").await.followed_count, 0);
        assert_eq!(h.get_post("pa").await.like_count(), 0);
        assert_eq!(h.get_post("pb").await.like_count(), 0);

        let result = h.managers.block.block("a", "b").await;
        assert!(matches!(
            result,
            Err(ManagerError::Block(BlockError::AlreadyBlocked { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unblock() {
        let h = Harness::new();
        h.user("a").await;
        h.user("b").await;
        h.user("c").await;

        let result = h.managers.block.unblock("a", "b").await;
        assert!(matches!(
            result,
            Err(ManagerError::Block(BlockError::NotBlocked { .. }))
        ));

        h.managers.block.block("a", "b").await.unwrap();
        h.managers.block.block("c", "a").await.unwrap();
        h.managers.block.unblock_all_by_user("a").await.unwrap();
        assert!(!h
            .managers
            .block
            .block_exists_either_way("a", "b")
            .await
            .unwrap());
        assert!(!h.managers.block.is_blocked("c", "a").await.unwrap());
    }
}
