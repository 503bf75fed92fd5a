//! Change records emitted by the store's change-data-capture stream.
//!
//! A record carries the item image before and after a write. Inserts have
//! only a new image, removals only an old one.

use crate::model::{Album, Block, Card, Comment, FeedItem, Flag, Follow, Like, Post, User, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Modify,
    Remove,
}

/// Any item the store holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    User(User),
    Post(Post),
    Comment(Comment),
    Like(Like),
    Follow(Follow),
    FeedItem(FeedItem),
    Card(Card),
    Album(Album),
    View(View),
    Flag(Flag),
    Block(Block),
}

impl Entity {
    pub fn type_name(&self) -> &'static str {
        match self {
            Entity::User(_) => "User",
            Entity::Post(_) => "Post",
            Entity::Comment(_) => "Comment",
            Entity::Like(_) => "Like",
            Entity::Follow(_) => "Follow",
            Entity::FeedItem(_) => "FeedItem",
            Entity::Card(_) => "Card",
            Entity::Album(_) => "Album",
            Entity::View(_) => "View",
            Entity::Flag(_) => "Flag",
            Entity::Block(_) => "Block",
        }
    }

    /// Human readable key, used in logs.
    pub fn key(&self) -> String {
        match self {
            Entity::User(user) => user.user_id.clone(),
            Entity::Post(post) => post.post_id.clone(),
            Entity::Comment(comment) => comment.comment_id.clone(),
            Entity::Like(like) => format!("{}/{}", like.liked_by_user_id, like.post_id),
            Entity::Follow(follow) => {
                format!("{}/{}", follow.follower_user_id, follow.followed_user_id)
            }
            Entity::FeedItem(item) => format!("{}/{}", item.user_id, item.post_id),
            Entity::Card(card) => card.card_id.clone(),
            Entity::Album(album) => album.album_id.clone(),
            Entity::View(view) => format!("{}/{}", view.item_id, view.user_id),
            Entity::Flag(flag) => format!("{}/{}", flag.item.id(), flag.user_id),
            Entity::Block(block) => format!("{}/{}", block.blocker_user_id, block.blocked_user_id),
        }
    }
}

/// Borrowing an entity variant by its inner type.
pub trait EntityImage: Sized {
    fn from_entity(entity: &Entity) -> Option<&Self>;
}

macro_rules! entity_image {
    ($($variant:ident),* $(,)?) => {
        $(
            impl EntityImage for $variant {
                fn from_entity(entity: &Entity) -> Option<&Self> {
                    match entity {
                        Entity::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$variant> for Entity {
                fn from(inner: $variant) -> Self {
                    Entity::$variant(inner)
                }
            }
        )*
    };
}

entity_image!(User, Post, Comment, Like, Follow, FeedItem, Card, Album, View, Flag, Block);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub old: Option<Entity>,
    pub new: Option<Entity>,
}

impl ChangeRecord {
    pub fn new(old: Option<Entity>, new: Option<Entity>) -> Self {
        Self { old, new }
    }

    pub fn insert(new: impl Into<Entity>) -> Self {
        Self::new(None, Some(new.into()))
    }

    pub fn modify(old: impl Into<Entity>, new: impl Into<Entity>) -> Self {
        Self::new(Some(old.into()), Some(new.into()))
    }

    pub fn remove(old: impl Into<Entity>) -> Self {
        Self::new(Some(old.into()), None)
    }

    /// The kind of write. A record with neither image is treated as a removal.
    pub fn kind(&self) -> ChangeKind {
        match (&self.old, &self.new) {
            (None, Some(_)) => ChangeKind::Insert,
            (Some(_), Some(_)) => ChangeKind::Modify,
            _ => ChangeKind::Remove,
        }
    }

    fn entity(&self) -> Option<&Entity> {
        self.new.as_ref().or(self.old.as_ref())
    }

    pub fn type_name(&self) -> &'static str {
        self.entity().map(Entity::type_name).unwrap_or("Unknown")
    }

    pub fn key(&self) -> String {
        self.entity().map(Entity::key).unwrap_or_default()
    }

    /// Both images typed as `T`, or `None` when the record is about another
    /// entity type.
    pub fn images<T: EntityImage>(&self) -> Option<(Option<&T>, Option<&T>)> {
        let old = self.old.as_ref().map(T::from_entity);
        let new = self.new.as_ref().map(T::from_entity);
        match (old, new) {
            (Some(None), _) | (_, Some(None)) | (None, None) => None,
            (old, new) => Some((old.flatten(), new.flatten())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PostType;
    use chrono::Utc;

    #[test]
    fn test_change_kind() {
        let post = Post::new("pid", "uid", PostType::TextOnly, Utc::now());
        assert_eq!(ChangeRecord::insert(post.clone()).kind(), ChangeKind::Insert);
        assert_eq!(
            ChangeRecord::modify(post.clone(), post.clone()).kind(),
            ChangeKind::Modify
        );
        assert_eq!(ChangeRecord::remove(post).kind(), ChangeKind::Remove);
    }

    #[test]
    fn test_images_typed_by_entity() {
        let post = Post::new("pid", "uid", PostType::TextOnly, Utc::now());
        let record = ChangeRecord::remove(post.clone());
        let (old, new) = record.images::<Post>().unwrap();
        assert_eq!(old, Some(&post));
        assert!(new.is_none());
        assert!(record.images::<User>().is_none());
        assert_eq!(record.type_name(), "Post");
        assert_eq!(record.key(), "pid");
    }
}
