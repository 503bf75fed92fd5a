use chrono::Utc;

use real_core::model::{Flag, FlagError, FlaggedItem};

use super::{Repositories, Result};

/// Manages flags raised against posts and comments.
///
/// Only the flag items live here. Their effect on the flagged item runs in
/// the post and comment managers' `on_flag_*` hooks.
#[derive(Clone)]
pub struct FlagManager {
    repos: Repositories,
}

impl FlagManager {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn flag(
        &self,
        item: FlaggedItem,
        user_id: &str,
        owner_user_id: &str,
    ) -> Result<Flag> {
        if user_id == owner_user_id {
            return Err(FlagError::CannotFlagOwn {
                item: item.type_name().to_string(),
                user_id: user_id.to_string(),
            }
            .into());
        }
        if self.repos.flags.get_flag(&item, user_id).await?.is_some() {
            return Err(FlagError::AlreadyFlagged {
                item: item.to_string(),
                user_id: user_id.to_string(),
            }
            .into());
        }

        let flag = Flag {
            item,
            user_id: user_id.to_string(),
            flagged_at: Utc::now(),
        };
        self.repos.flags.create_flag(&flag).await?;
        tracing::info!(item = %flag.item, %user_id, "Flag added");
        Ok(flag)
    }

    pub async fn unflag(&self, item: &FlaggedItem, user_id: &str) -> Result<()> {
        match self.repos.flags.delete_flag(item, user_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Err(FlagError::NotFlagged {
                item: item.to_string(),
                user_id: user_id.to_string(),
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn unflag_all_on_item(&self, item: &FlaggedItem) -> Result<()> {
        for flag in self.repos.flags.list_flags_by_item(item).await? {
            self.repos.flags.delete_flag(item, &flag.user_id).await?;
        }
        Ok(())
    }

    pub async fn unflag_all_by_user(&self, user_id: &str) -> Result<()> {
        for flag in self.repos.flags.list_flags_by_user(user_id).await? {
            self.repos.flags.delete_flag(&flag.item, user_id).await?;
        }
        Ok(())
    }

    pub async fn list_flags_of_item(&self, item: &FlaggedItem) -> Result<Vec<Flag>> {
        Ok(self.repos.flags.list_flags_by_item(item).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::Harness;
    use crate::managers::ManagerError;

    #[tokio::test]
    async fn test_cannot_flag_own_item() {
        let h = Harness::new();
        let result = h
            .managers
            .flag
            .flag(FlaggedItem::Post("pid".into()), "uid", "uid")
            .await;
        assert!(matches!(
            result,
            Err(ManagerError::Flag(FlagError::CannotFlagOwn { .. }))
        ));
    }

    #[tokio::test]
    async fn test_flag_twice_fails() {
        let h = Harness::new();
        let flag = &h.managers.flag;
        let item = FlaggedItem::Comment("cid".into());

        flag.flag(item.clone(), "uid", "owner").await.unwrap();
        let result = flag.flag(item.clone(), "uid", "owner").await;
        assert!(matches!(
            result,
            Err(ManagerError::Flag(FlagError::AlreadyFlagged { .. }))
        ));
        assert_eq!(flag.list_flags_of_item(&item).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unflag() {
        let h = Harness::new();
        let flag = &h.managers.flag;
        let item = FlaggedItem::Post("pid".into());

        let result = flag.unflag(&item, "uid").await;
        assert!(matches!(
            result,
            Err(ManagerError::Flag(FlagError::NotFlagged { .. }))
        ));

        flag.flag(item.clone(), "u1", "owner").await.unwrap();
        flag.flag(item.clone(), "u2", "owner").await.unwrap();
        flag.flag(FlaggedItem::Post("other".into()), "u1", "owner")
            .await
            .unwrap();

        flag.unflag(&item, "u2").await.unwrap();
        flag.unflag_all_by_user("u1").await.unwrap();
        assert!(flag.list_flags_of_item(&item).await.unwrap().is_empty());
    }
}
