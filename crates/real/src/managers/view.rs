use chrono::{DateTime, Utc};

use real_core::model::{Post, View, ViewedStatus};

use super::{Repositories, Result};

/// Manages per-user view tallies on posts.
#[derive(Clone)]
pub struct ViewManager {
    repos: Repositories,
}

impl ViewManager {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Adds `view_count` views by `user_id`. Returns whether this was the
    /// user's first view of the item.
    pub async fn record_view_count(
        &self,
        item_id: &str,
        user_id: &str,
        view_count: u64,
        viewed_at: DateTime<Utc>,
    ) -> Result<bool> {
        if self.repos.views.get_view(item_id, user_id).await?.is_some() {
            self.repos
                .views
                .increment_view_count(item_id, user_id, view_count, viewed_at)
                .await?;
            return Ok(false);
        }

        let view = View {
            item_id: item_id.to_string(),
            user_id: user_id.to_string(),
            view_count,
            first_viewed_at: viewed_at,
            last_viewed_at: viewed_at,
        };
        match self.repos.views.create_view(&view).await {
            Ok(()) => Ok(true),
            // Lost the race to a concurrent first view.
            Err(e) if e.is_already_exists() => {
                self.repos
                    .views
                    .increment_view_count(item_id, user_id, view_count, viewed_at)
                    .await?;
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_viewed_status(&self, post: &Post, user_id: &str) -> Result<ViewedStatus> {
        if post.posted_by_user_id == user_id {
            return Ok(ViewedStatus::Viewed);
        }
        let viewed = self
            .repos
            .views
            .get_view(&post.post_id, user_id)
            .await?
            .is_some();
        Ok(if viewed {
            ViewedStatus::Viewed
        } else {
            ViewedStatus::NotViewed
        })
    }

    pub async fn delete_views(&self, item_id: &str) -> Result<()> {
        for view in self.repos.views.list_views(item_id).await? {
            self.repos.views.delete_view(item_id, &view.user_id).await?;
        }
        Ok(())
    }
}
