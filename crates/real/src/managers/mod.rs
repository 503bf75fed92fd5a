//! Business rules, one manager per entity type.
//!
//! Managers are cheap to clone and hold shared handles to the repositories
//! and to the managers below them. Dependencies only point downwards:
//!
//! ```text
//! user -> post -> comment -> flag
//!      |       -> like
//!      |       -> view, card
//!      -> follower, block -> like, album, feed
//! ```
//!
//! Cross-entity effects of a write are not applied inline. They run in the
//! `on_*` hooks, which the stream dispatcher calls for each change record.

mod album;
mod block;
mod card;
mod comment;
mod error;
mod feed;
mod flag;
mod follower;
mod like;
mod post;
mod user;
mod view;

use std::sync::Arc;

pub use album::AlbumManager;
pub use block::BlockManager;
pub use card::CardManager;
pub use comment::CommentManager;
pub use error::{manager_error_to_status_code, ManagerError, Result};
pub use feed::FeedManager;
pub use flag::FlagManager;
pub use follower::FollowerManager;
pub use like::LikeManager;
pub use post::{NewPost, PostDetails, PostManager};
pub use user::{UserDetails, UserManager};
pub use view::ViewManager;

use real_core::model::{CounterDelta, FollowStatus, User};
use real_core::storage::{
    AlbumRepository, BlockRepository, CardRepository, CommentRepository, FeedRepository,
    FlagRepository, FollowRepository, LikeRepository, PostRepository, RepositoryError, Store,
    UserRepository, ViewRepository,
};

use crate::clients::{CardNotifier, DatingClient};

/// Shared handles to every repository.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub likes: Arc<dyn LikeRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub feed: Arc<dyn FeedRepository>,
    pub cards: Arc<dyn CardRepository>,
    pub albums: Arc<dyn AlbumRepository>,
    pub views: Arc<dyn ViewRepository>,
    pub flags: Arc<dyn FlagRepository>,
    pub blocks: Arc<dyn BlockRepository>,
}

impl Repositories {
    /// Uses one backend for every entity type.
    pub fn from_store<S: Store + 'static>(store: Arc<S>) -> Self {
        Self {
            users: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            likes: store.clone(),
            follows: store.clone(),
            feed: store.clone(),
            cards: store.clone(),
            albums: store.clone(),
            views: store.clone(),
            flags: store.clone(),
            blocks: store,
        }
    }
}

/// Settings the managers read.
#[derive(Debug, Clone, Default)]
pub struct ManagerConfig {
    /// Users whose flags remove content without review.
    pub flag_admin_usernames: Vec<String>,
}

impl ManagerConfig {
    pub fn is_flag_admin(&self, username: &str) -> bool {
        self.flag_admin_usernames.iter().any(|u| u == username)
    }
}

/// Outbound clients the managers call.
#[derive(Clone)]
pub struct Clients {
    pub card_notifier: Arc<dyn CardNotifier>,
    pub dating: Arc<dyn DatingClient>,
}

/// Every manager, wired together.
#[derive(Clone)]
pub struct Managers {
    pub album: AlbumManager,
    pub block: BlockManager,
    pub card: CardManager,
    pub comment: CommentManager,
    pub feed: FeedManager,
    pub flag: FlagManager,
    pub follower: FollowerManager,
    pub like: LikeManager,
    pub post: PostManager,
    pub user: UserManager,
    pub view: ViewManager,
}

impl Managers {
    pub fn new(repos: Repositories, clients: Clients, config: ManagerConfig) -> Self {
        let config = Arc::new(config);

        let card = CardManager::new(repos.clone(), clients.card_notifier);
        let view = ViewManager::new(repos.clone());
        let flag = FlagManager::new(repos.clone());
        let like = LikeManager::new(repos.clone());
        let feed = FeedManager::new(repos.clone());
        let album = AlbumManager::new(repos.clone());
        let follower = FollowerManager::new(repos.clone());
        let block = BlockManager::new(repos.clone(), like.clone());
        let comment = CommentManager::new(repos.clone(), flag.clone(), config.clone());
        let post = PostManager::new(
            repos.clone(),
            post::PostDependencies {
                card: card.clone(),
                comment: comment.clone(),
                flag: flag.clone(),
                like: like.clone(),
                view: view.clone(),
            },
            config,
        );
        let user = UserManager::new(
            repos,
            user::UserDependencies {
                album: album.clone(),
                block: block.clone(),
                card: card.clone(),
                comment: comment.clone(),
                flag: flag.clone(),
                follower: follower.clone(),
                like: like.clone(),
                post: post.clone(),
            },
            clients.dating,
        );

        Self {
            album,
            block,
            card,
            comment,
            feed,
            flag,
            follower,
            like,
            post,
            user,
            view,
        }
    }
}

/// Turns a counter decrement that hit zero into a warning.
///
/// Stream hooks may replay or race each other, so a decrement that finds
/// the counter at zero (or the item gone) is logged and skipped.
pub(crate) fn fail_soft(
    result: std::result::Result<u64, RepositoryError>,
    attribute: &str,
    entity: &str,
    id: &str,
) -> std::result::Result<Option<u64>, RepositoryError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(RepositoryError::ConditionFailed { .. }) => {
            tracing::warn!("Failed to decrement {attribute} for {entity} `{id}`");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Applies user counter changes computed by the pure rules.
///
/// Users deleted in the meantime are skipped with a warning.
pub(crate) async fn apply_user_counter_deltas(
    users: &dyn UserRepository,
    deltas: &[CounterDelta],
) -> Result<()> {
    for delta in deltas {
        let attribute = delta.counter.attribute_name();
        if delta.increment {
            match users.increment_user_count(&delta.user_id, delta.counter).await {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {
                    tracing::warn!("Failed to increment {attribute} for user `{}`", delta.user_id);
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            let result = users.decrement_user_count(&delta.user_id, delta.counter).await;
            fail_soft(result, attribute, "user", &delta.user_id)?;
        }
    }
    Ok(())
}

/// Why `user_id` may not interact with content owned by `owner`, if
/// anything stops them.
pub(crate) async fn access_denial(
    repos: &Repositories,
    user_id: &str,
    owner: &User,
) -> Result<Option<&'static str>> {
    if user_id == owner.user_id {
        return Ok(None);
    }
    if repos.blocks.get_block(&owner.user_id, user_id).await?.is_some()
        || repos.blocks.get_block(user_id, &owner.user_id).await?.is_some()
    {
        return Ok(Some("a block exists between the users"));
    }
    if owner.is_private() {
        let following = repos
            .follows
            .get_follow(user_id, &owner.user_id)
            .await?
            .is_some_and(|f| f.follow_status == FollowStatus::Following);
        if !following {
            return Ok(Some("the owner is private"));
        }
    }
    Ok(None)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the manager tests.

    use std::io;
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use tracing::subscriber::DefaultGuard;

    use real_core::model::{Post, PostStatus, PostType, User};
    use real_core::storage::{PostRepository, UserRepository};

    use super::*;
    use crate::clients::{MemoryCardNotifier, NoopDatingClient};
    use crate::storage::InMemoryRepository;
    use crate::stream::StreamDispatcher;

    pub const ADMIN_USERNAME: &str = "real.admin";

    /// Formatted log output of the current thread, for asserting on
    /// warnings.
    #[derive(Clone, Default)]
    pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        /// Routes this thread's warnings into a buffer until the guard drops.
        pub fn capture() -> (Self, DefaultGuard) {
            let buffer = Self::default();
            let writer = buffer.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::WARN)
                .finish();
            (buffer, tracing::subscriber::set_default(subscriber))
        }

        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub struct Harness {
        pub store: Arc<InMemoryRepository>,
        pub managers: Managers,
        pub dispatcher: StreamDispatcher,
        pub notifier: MemoryCardNotifier,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_dating(Arc::new(NoopDatingClient))
        }

        pub fn with_dating(dating: Arc<dyn DatingClient>) -> Self {
            let store = Arc::new(InMemoryRepository::new());
            let notifier = MemoryCardNotifier::new(64);
            let managers = Managers::new(
                Repositories::from_store(store.clone()),
                Clients {
                    card_notifier: Arc::new(notifier.clone()),
                    dating,
                },
                ManagerConfig {
                    flag_admin_usernames: vec![ADMIN_USERNAME.to_string()],
                },
            );
            let dispatcher = StreamDispatcher::new(managers.clone());
            Self {
                store,
                managers,
                dispatcher,
                notifier,
            }
        }

        /// Runs every pending stream hook.
        pub async fn settle(&self) {
            self.dispatcher.settle(self.store.as_ref()).await;
        }

        pub async fn user(&self, user_id: &str) -> User {
            let user = User::new(user_id, format!("user.{user_id}"), Utc::now());
            self.store.create_user(&user).await.unwrap();
            user
        }

        pub async fn private_user(&self, user_id: &str) -> User {
            let mut user = self.user(user_id).await;
            user.privacy_status = real_core::model::UserPrivacyStatus::Private;
            self.store.update_user(&user).await.unwrap();
            user
        }

        pub async fn admin(&self, user_id: &str) -> User {
            let user = User::new(user_id, ADMIN_USERNAME, Utc::now());
            self.store.create_user(&user).await.unwrap();
            user
        }

        /// A completed text post, with its stream effects applied.
        pub async fn post(&self, post_id: &str, user_id: &str) -> Post {
            let mut post = Post::new(post_id, user_id, PostType::TextOnly, Utc::now())
                .with_text("lore ipsum");
            post.post_status = PostStatus::Completed;
            self.store.create_post(&post).await.unwrap();
            self.settle().await;
            post
        }

        pub async fn get_user(&self, user_id: &str) -> User {
            self.store.get_user(user_id).await.unwrap().unwrap()
        }

        pub async fn get_post(&self, post_id: &str) -> Post {
            self.store.get_post(post_id).await.unwrap().unwrap()
        }
    }
}
