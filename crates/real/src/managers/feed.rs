use real_core::model::{FeedItem, Follow, FollowStatus, Post, PostStatus};

use super::{Repositories, Result};

/// Maintains each user's feed: the completed posts of the users they
/// follow, plus their own.
#[derive(Clone)]
pub struct FeedManager {
    repos: Repositories,
}

impl FeedManager {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Adds every completed post of `posted_by_user_id` to one feed.
    pub async fn add_users_posts_to_feed(
        &self,
        feed_user_id: &str,
        posted_by_user_id: &str,
    ) -> Result<()> {
        let posts = self
            .repos
            .posts
            .list_posts_by_user(posted_by_user_id, Some(PostStatus::Completed))
            .await?;
        let items: Vec<FeedItem> = posts
            .iter()
            .map(|post| FeedItem::for_post(feed_user_id, post))
            .collect();
        self.repos.feed.put_feed_items(&items).await?;
        Ok(())
    }

    pub async fn delete_users_posts_from_feed(
        &self,
        feed_user_id: &str,
        posted_by_user_id: &str,
    ) -> Result<()> {
        let keys: Vec<(String, String)> = self
            .repos
            .feed
            .list_feed_by_post_owner(feed_user_id, posted_by_user_id)
            .await?
            .into_iter()
            .map(|item| (item.user_id, item.post_id))
            .collect();
        self.repos.feed.delete_feed_items(&keys).await?;
        Ok(())
    }

    /// Fans a post out to its poster and everyone following them.
    pub async fn add_post_to_followers_feeds(&self, followed_user_id: &str, post: &Post) -> Result<()> {
        let followers = self
            .repos
            .follows
            .list_followers(followed_user_id, Some(FollowStatus::Following))
            .await?;
        let items: Vec<FeedItem> = std::iter::once(followed_user_id.to_string())
            .chain(followers.into_iter().map(|f| f.follower_user_id))
            .map(|user_id| FeedItem::for_post(user_id, post))
            .collect();
        self.repos.feed.put_feed_items(&items).await?;
        tracing::debug!(post_id = %post.post_id, fanout = items.len(), "Post added to feeds");
        Ok(())
    }

    /// Removes a post from every feed it may be in. Followers in any status
    /// are included so a feed item left over from an earlier follow is
    /// still cleaned up.
    pub async fn delete_post_from_followers_feeds(
        &self,
        followed_user_id: &str,
        post_id: &str,
    ) -> Result<()> {
        let followers = self
            .repos
            .follows
            .list_followers(followed_user_id, None)
            .await?;
        let keys: Vec<(String, String)> = std::iter::once(followed_user_id.to_string())
            .chain(followers.into_iter().map(|f| f.follower_user_id))
            .map(|user_id| (user_id, post_id.to_string()))
            .collect();
        self.repos.feed.delete_feed_items(&keys).await?;
        Ok(())
    }

    /// The user's feed, newest first. Posts deleted since they were fanned
    /// out are skipped.
    pub async fn get_feed(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<Post>> {
        let items = self.repos.feed.list_feed(user_id, limit).await?;
        let mut posts = Vec::with_capacity(items.len());
        for item in items {
            match self.repos.posts.get_post(&item.post_id).await? {
                Some(post) => posts.push(post),
                None => tracing::warn!(%user_id, post_id = %item.post_id, "Feed item points at a missing post"),
            }
        }
        Ok(posts)
    }

    pub async fn on_user_follow_status_change_sync_feed(
        &self,
        old: Option<&Follow>,
        new: Option<&Follow>,
    ) -> Result<()> {
        let Some(follow) = new.or(old) else {
            return Ok(());
        };
        let was_following = old.is_some_and(|f| f.follow_status == FollowStatus::Following);
        let is_following = new.is_some_and(|f| f.follow_status == FollowStatus::Following);
        match (was_following, is_following) {
            (false, true) => {
                self.add_users_posts_to_feed(&follow.follower_user_id, &follow.followed_user_id)
                    .await
            }
            (true, false) => {
                self.delete_users_posts_from_feed(&follow.follower_user_id, &follow.followed_user_id)
                    .await
            }
            _ => Ok(()),
        }
    }

    pub async fn on_post_status_change_sync_feed(
        &self,
        old: Option<&Post>,
        new: Option<&Post>,
    ) -> Result<()> {
        let was_completed = old.is_some_and(Post::is_completed);
        let is_completed = new.is_some_and(Post::is_completed);
        match (was_completed, is_completed, new.or(old)) {
            (false, true, Some(post)) => {
                self.add_post_to_followers_feeds(&post.posted_by_user_id, post)
                    .await
            }
            (true, false, Some(post)) => {
                self.delete_post_from_followers_feeds(&post.posted_by_user_id, &post.post_id)
                    .await
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::managers::testing::Harness;
    use real_core::model::PostType;
    use real_core::storage::PostRepository;

    fn feed_ids(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.post_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_own_posts_land_in_own_feed() {
        let h = Harness::new();
        h.user("a").await;
        h.post("p1", "a").await;

        let feed = h.managers.feed.get_feed("a", None).await.unwrap();
        assert_eq!(feed_ids(&feed), vec!["p1"]);
    }

    #[tokio::test]
    async fn test_follow_adds_and_unfollow_removes_posts() {
        let h = Harness::new();
        h.user("a").await;
        h.user("b").await;
        let now = Utc::now();
        for (post_id, age) in [("old", 2), ("new", 1)] {
            let mut post = Post::new(post_id, "b", PostType::TextOnly, now - Duration::hours(age))
                .with_text("lore");
            post.post_status = PostStatus::Completed;
            h.store.create_post(&post).await.unwrap();
        }
        let pending = Post::new("pending", "b", PostType::Image, now);
        h.store.create_post(&pending).await.unwrap();
        h.settle().await;

        h.managers.follower.request_to_follow("a", "b").await.unwrap();
        h.settle().await;
        let feed = h.managers.feed.get_feed("a", None).await.unwrap();
        assert_eq!(feed_ids(&feed), vec!["new", "old"]);
        let feed = h.managers.feed.get_feed("a", Some(1)).await.unwrap();
        assert_eq!(feed_ids(&feed), vec!["new"]);

        h.managers.follower.unfollow("a", "b").await.unwrap();
        h.settle().await;
        assert!(h.managers.feed.get_feed("a", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_new_post_fans_out_and_archive_removes_it() {
        let h = Harness::new();
        h.user("a").await;
        h.user("b").await;
        h.user("c").await;
        h.managers.follower.request_to_follow("a", "b").await.unwrap();
        h.settle().await;

        let mut post = h.post("pb", "b").await;
        assert_eq!(feed_ids(&h.managers.feed.get_feed("a", None).await.unwrap()), vec!["pb"]);
        assert!(h.managers.feed.get_feed("c", None).await.unwrap().is_empty());

        post.post_status = PostStatus::Archived;
        h.store.update_post(&post).await.unwrap();
        h.settle().await;
        assert!(h.managers.feed.get_feed("a", None).await.unwrap().is_empty());
        assert!(h.managers.feed.get_feed("b", None).await.unwrap().is_empty());
    }
}
