use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use real_core::model::{
    post_status_counter_deltas, validate_dating_eligibility, validate_username, Card, CardSpec,
    DatingStatus, Gender, Post, User, UserCounter, UserError, UserPrivacyStatus,
};

use super::{
    apply_user_counter_deltas, fail_soft, AlbumManager, BlockManager, CardManager,
    CommentManager, FlagManager, FollowerManager, LikeManager, PostManager, Repositories, Result,
};
use crate::clients::DatingClient;

/// The managers a [`UserManager`] delegates to, mostly for cascading
/// deletes.
#[derive(Clone)]
pub struct UserDependencies {
    pub album: AlbumManager,
    pub block: BlockManager,
    pub card: CardManager,
    pub comment: CommentManager,
    pub flag: FlagManager,
    pub follower: FollowerManager,
    pub like: LikeManager,
    pub post: PostManager,
}

/// Profile fields a user may edit. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub likes_disabled: Option<bool>,
    pub comments_disabled: Option<bool>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
}

#[derive(Clone)]
pub struct UserManager {
    repos: Repositories,
    deps: UserDependencies,
    dating: Arc<dyn DatingClient>,
}

impl UserManager {
    pub fn new(
        repos: Repositories,
        deps: UserDependencies,
        dating: Arc<dyn DatingClient>,
    ) -> Self {
        Self { repos, deps, dating }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.repos.users.get_user(user_id).await?)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.repos.users.get_user_by_username(username).await?)
    }

    async fn existing(&self, user_id: &str) -> Result<User> {
        self.get_user(user_id)
            .await?
            .ok_or_else(|| UserError::DoesNotExist(user_id.to_string()).into())
    }

    async fn ensure_username_free(&self, user_id: &str, username: &str) -> Result<()> {
        match self.get_user_by_username(username).await? {
            Some(other) if other.user_id != user_id => {
                Err(UserError::UsernameTaken(username.to_string()).into())
            }
            _ => Ok(()),
        }
    }

    pub async fn create_user(
        &self,
        user_id: &str,
        username: &str,
        full_name: Option<String>,
    ) -> Result<User> {
        validate_username(username)?;
        if self.get_user(user_id).await?.is_some() {
            return Err(UserError::AlreadyExists(user_id.to_string()).into());
        }
        self.ensure_username_free(user_id, username).await?;

        let mut user = User::new(user_id, username, Utc::now());
        user.full_name = full_name.filter(|n| !n.trim().is_empty());
        match self.repos.users.create_user(&user).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {
                return Err(UserError::AlreadyExists(user_id.to_string()).into())
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(%user_id, %username, "User created");
        Ok(user)
    }

    pub async fn update_details(&self, user_id: &str, details: UserDetails) -> Result<User> {
        let mut user = self.existing(user_id).await?;
        if let Some(username) = details.username {
            if username != user.username {
                validate_username(&username)?;
                self.ensure_username_free(user_id, &username).await?;
                user.username = username;
            }
        }
        if let Some(full_name) = details.full_name {
            user.full_name = (!full_name.trim().is_empty()).then_some(full_name);
        }
        if let Some(bio) = details.bio {
            user.bio = (!bio.trim().is_empty()).then_some(bio);
        }
        if let Some(likes_disabled) = details.likes_disabled {
            user.likes_disabled = likes_disabled;
        }
        if let Some(comments_disabled) = details.comments_disabled {
            user.comments_disabled = comments_disabled;
        }
        if details.date_of_birth.is_some() {
            user.date_of_birth = details.date_of_birth;
        }
        if details.gender.is_some() {
            user.gender = details.gender;
        }
        // A profile that no longer qualifies leaves dating; the user stream
        // hook then removes it from the dating service.
        if user.dating_status == DatingStatus::Enabled {
            if let Err(e) = validate_dating_eligibility(&user, Utc::now()) {
                tracing::info!(%user_id, reason = %e, "Disabling dating after profile update");
                user.dating_status = DatingStatus::Disabled;
            }
        }

        self.repos.users.update_user(&user).await?;
        Ok(user)
    }

    /// Going public accepts every pending follow request.
    pub async fn set_privacy_status(
        &self,
        user_id: &str,
        privacy_status: UserPrivacyStatus,
    ) -> Result<User> {
        let mut user = self.existing(user_id).await?;
        if user.privacy_status == privacy_status {
            return Ok(user);
        }
        let going_public = user.is_private() && privacy_status == UserPrivacyStatus::Public;
        user.privacy_status = privacy_status;
        self.repos.users.update_user(&user).await?;
        if going_public {
            self.deps.follower.accept_all_requested(user_id).await?;
        }
        tracing::info!(%user_id, %privacy_status, "Privacy status changed");
        Ok(user)
    }

    pub async fn set_dating_status(
        &self,
        user_id: &str,
        dating_status: DatingStatus,
    ) -> Result<User> {
        let mut user = self.existing(user_id).await?;
        if dating_status == DatingStatus::Enabled {
            validate_dating_eligibility(&user, Utc::now())?;
        }
        user.dating_status = dating_status;
        self.repos.users.update_user(&user).await?;
        Ok(user)
    }

    /// Deletes a user along with everything they created or are part of.
    pub async fn delete_user(&self, user_id: &str) -> Result<User> {
        let user = self.existing(user_id).await?;

        for post in self.repos.posts.list_posts_by_user(user_id, None).await? {
            self.deps.post.delete(post).await?;
        }
        self.deps.comment.delete_all_by_user(user_id).await?;
        self.deps.like.dislike_all_by_user(user_id).await?;
        self.deps.follower.reset_follows_of_user(user_id).await?;
        self.deps.block.unblock_all_by_user(user_id).await?;
        self.deps.flag.unflag_all_by_user(user_id).await?;
        self.deps.card.delete_all_by_user(user_id).await?;
        self.deps.album.delete_all_by_user(user_id).await?;

        match self.repos.users.delete_user(user_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!(%user_id, "User deleted");
        Ok(user)
    }

    /// Keeps the dating service's copy of the user current.
    pub async fn on_user_change_sync_dating(
        &self,
        old: Option<&User>,
        new: Option<&User>,
    ) -> Result<()> {
        let was_enabled = old.is_some_and(|u| u.dating_status == DatingStatus::Enabled);
        let result = match new {
            Some(user) if user.dating_status == DatingStatus::Enabled => {
                self.dating.put_user(user).await
            }
            _ if was_enabled => match new.or(old) {
                Some(user) => self.dating.remove_user(&user.user_id).await,
                None => Ok(()),
            },
            _ => Ok(()),
        };
        if let Err(e) = result {
            let user_id = new.or(old).map(|u| u.user_id.as_str()).unwrap_or_default();
            tracing::warn!(%user_id, error = %e, "Failed to sync user to dating service");
        }
        Ok(())
    }

    pub async fn on_user_change_sync_requested_followers_card(
        &self,
        old: Option<&User>,
        new: Option<&User>,
    ) -> Result<()> {
        let old_count = old.map(|u| u.followers_requested_count);
        let Some(user) = new else {
            if let Some(user) = old {
                let spec = CardSpec::requested_followers(&user.user_id, 0);
                self.deps.card.remove_card_by_spec_if_exists(&spec).await?;
            }
            return Ok(());
        };
        if old_count == Some(user.followers_requested_count) {
            return Ok(());
        }

        let spec = CardSpec::requested_followers(&user.user_id, user.followers_requested_count);
        if user.followers_requested_count > 0 {
            self.deps.card.add_or_update_card_by_spec(&spec).await?;
        } else {
            self.deps.card.remove_card_by_spec_if_exists(&spec).await?;
        }
        Ok(())
    }

    pub async fn on_post_status_change_sync_counts(
        &self,
        old: Option<&Post>,
        new: Option<&Post>,
    ) -> Result<()> {
        let Some(post) = new.or(old) else {
            return Ok(());
        };
        let deltas = post_status_counter_deltas(
            &post.posted_by_user_id,
            old.map(|p| p.post_status),
            new.map(|p| p.post_status),
        );
        apply_user_counter_deltas(self.repos.users.as_ref(), &deltas).await
    }

    pub async fn on_card_change_sync_count(
        &self,
        old: Option<&Card>,
        new: Option<&Card>,
    ) -> Result<()> {
        let attribute = UserCounter::Card.attribute_name();
        match (old, new) {
            (None, Some(card)) => {
                match self
                    .repos
                    .users
                    .increment_user_count(&card.user_id, UserCounter::Card)
                    .await
                {
                    Ok(_) => {}
                    Err(e) if e.is_not_found() => {
                        tracing::warn!("Failed to increment {attribute} for user `{}`", card.user_id);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            (Some(card), None) => {
                let result = self
                    .repos
                    .users
                    .decrement_user_count(&card.user_id, UserCounter::Card)
                    .await;
                fail_soft(result, attribute, "user", &card.user_id)?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::clients;
    use crate::managers::testing::Harness;
    use crate::managers::ManagerError;
    use real_core::model::{FollowStatus, LikeStatus, PostStatus};

    #[derive(Default)]
    struct RecordingDatingClient {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DatingClient for RecordingDatingClient {
        async fn put_user(&self, user: &User) -> clients::Result<()> {
            self.calls.lock().unwrap().push(format!("put {}", user.user_id));
            Ok(())
        }

        async fn remove_user(&self, user_id: &str) -> clients::Result<()> {
            self.calls.lock().unwrap().push(format!("remove {user_id}"));
            Ok(())
        }
    }

    fn eligible_details() -> UserDetails {
        UserDetails {
            full_name: Some("Grant Ward".into()),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1),
            gender: Some(Gender::Male),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_user_validates() {
        let h = Harness::new();
        let users = &h.managers.user;

        let result = users.create_user("uid", "x", None).await;
        assert!(matches!(result, Err(ManagerError::User(UserError::InvalidUsername(_)))));

        users.create_user("uid", "grant", None).await.unwrap();
        let result = users.create_user("uid", "ward", None).await;
        assert!(matches!(result, Err(ManagerError::User(UserError::AlreadyExists(_)))));
        let result = users.create_user("other", "grant", None).await;
        assert!(matches!(result, Err(ManagerError::User(UserError::UsernameTaken(_)))));

        let user = users.get_user_by_username("grant").await.unwrap().unwrap();
        assert_eq!(user.user_id, "uid");
    }

    #[tokio::test]
    async fn test_update_details() {
        let h = Harness::new();
        h.user("uid").await;
        h.user("other").await;

        let details = UserDetails {
            username: Some("user.other".into()),
            ..Default::default()
        };
        let result = h.managers.user.update_details("uid", details).await;
        assert!(matches!(result, Err(ManagerError::User(UserError::UsernameTaken(_)))));

        let details = UserDetails {
            username: Some("renamed".into()),
            bio: Some("hello".into()),
            likes_disabled: Some(true),
            ..Default::default()
        };
        let user = h.managers.user.update_details("uid", details).await.unwrap();
        assert_eq!(user.username, "renamed");
        assert_eq!(user.bio.as_deref(), Some("hello"));
        assert!(user.likes_disabled);
        assert_eq!(h.get_user("uid").await, user);
    }

    #[tokio::test]
    async fn test_dating_requires_eligibility_and_syncs() {
        let dating = Arc::new(RecordingDatingClient::default());
        let h = Harness::with_dating(dating.clone());
        h.user("uid").await;
        let users = &h.managers.user;

        let result = users.set_dating_status("uid", DatingStatus::Enabled).await;
        assert!(matches!(
            result,
            Err(ManagerError::User(UserError::DatingRequirementsNotMet { .. }))
        ));

        users.update_details("uid", eligible_details()).await.unwrap();
        users.set_dating_status("uid", DatingStatus::Enabled).await.unwrap();
        h.settle().await;

        users.set_dating_status("uid", DatingStatus::Disabled).await.unwrap();
        h.settle().await;

        assert_eq!(
            *dating.calls.lock().unwrap(),
            vec!["put uid".to_string(), "remove uid".to_string()]
        );
    }

    #[tokio::test]
    async fn test_update_details_disables_ineligible_dating() {
        let dating = Arc::new(RecordingDatingClient::default());
        let h = Harness::with_dating(dating.clone());
        h.user("uid").await;
        let users = &h.managers.user;
        users.update_details("uid", eligible_details()).await.unwrap();
        users.set_dating_status("uid", DatingStatus::Enabled).await.unwrap();
        h.settle().await;

        let details = UserDetails {
            full_name: Some("".into()),
            bio: Some("still here".into()),
            ..Default::default()
        };
        let user = users.update_details("uid", details).await.unwrap();
        assert_eq!(user.dating_status, DatingStatus::Disabled);
        assert_eq!(user.full_name, None);
        assert_eq!(user.bio.as_deref(), Some("still here"));
        h.settle().await;

        assert_eq!(h.get_user("uid").await.dating_status, DatingStatus::Disabled);
        assert_eq!(
            *dating.calls.lock().unwrap(),
            vec!["put uid".to_string(), "remove uid".to_string()]
        );

        // Editing an eligible profile while dating is off leaves it off.
        users.update_details("uid", eligible_details()).await.unwrap();
        h.settle().await;
        assert_eq!(h.get_user("uid").await.dating_status, DatingStatus::Disabled);
        assert_eq!(dating.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_going_public_accepts_requests() {
        let h = Harness::new();
        h.private_user("uid").await;
        h.user("fan").await;
        h.managers.follower.request_to_follow("fan", "uid").await.unwrap();
        h.settle().await;
        let card = CardSpec::requested_followers("uid", 0);
        assert!(h.managers.card.get_card(&card.card_id()).await.unwrap().is_some());
        assert_eq!(h.get_user("uid").await.card_count, 1);

        h.managers
            .user
            .set_privacy_status("uid", UserPrivacyStatus::Public)
            .await
            .unwrap();
        h.settle().await;

        assert_eq!(
            h.managers.follower.get_follow_status("fan", "uid").await.unwrap(),
            FollowStatus::Following
        );
        let user = h.get_user("uid").await;
        assert_eq!(user.follower_count, 1);
        assert_eq!(user.followers_requested_count, 0);
        assert!(h.managers.card.get_card(&card.card_id()).await.unwrap().is_none());
        assert_eq!(user.card_count, 0);
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let h = Harness::new();
        h.user("uid").await;
        h.user("friend").await;
        h.post("mine", "uid").await;
        h.post("theirs", "friend").await;
        h.managers.follower.request_to_follow("uid", "friend").await.unwrap();
        h.managers.follower.request_to_follow("friend", "uid").await.unwrap();
        h.managers
            .like
            .like_post("uid", "theirs", LikeStatus::OnymouslyLiked)
            .await
            .unwrap();
        h.managers
            .comment
            .add_comment("uid", "theirs", "nice")
            .await
            .unwrap();
        h.managers.album.add_album("uid", "Mine", None).await.unwrap();
        h.settle().await;

        h.managers.user.delete_user("uid").await.unwrap();
        h.settle().await;

        assert!(h.managers.user.get_user("uid").await.unwrap().is_none());
        assert!(h.managers.post.get_post("mine").await.unwrap().is_none());
        assert!(h.managers.album.list_albums("uid").await.unwrap().is_empty());

        let friend = h.get_user("friend").await;
        assert_eq!(friend.follower_count, 0);
        assert_eq!(friend.followed_count, 0);
        let theirs = h.get_post("theirs").await;
        assert_eq!(theirs.like_count(), 0);
        assert_eq!(theirs.comment_count, 0);
        let feed = h.managers.feed.get_feed("friend", None).await.unwrap();
        assert!(feed.iter().all(|p| p.post_id != "mine"));
    }

    #[tokio::test]
    async fn test_card_count_tolerates_missing_user() {
        let h = Harness::new();
        let card = Card {
            card_id: "ghost:POST_LIKES:pid".into(),
            user_id: "ghost".into(),
            title: "t".into(),
            action: "a".into(),
            created_at: Utc::now(),
            notify_user_after: None,
        };
        h.managers
            .user
            .on_card_change_sync_count(None, Some(&card))
            .await
            .unwrap();
        h.managers
            .user
            .on_card_change_sync_count(Some(&card), None)
            .await
            .unwrap();

        h.user("uid").await;
        let deltas = post_status_counter_deltas("uid", None, Some(PostStatus::Archived));
        apply_user_counter_deltas(h.store.as_ref(), &deltas).await.unwrap();
        assert_eq!(UserCounter::PostArchived.get(&h.get_user("uid").await), 1);
    }
}
