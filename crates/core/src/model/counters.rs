//! Denormalized counters kept on users, posts, comments and albums.
//!
//! Each variant maps to the stored attribute name so the storage layer can
//! issue atomic `ADD` updates without knowing about the entity structs.

use super::types::{Album, Comment, Post, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserCounter {
    Post,
    PostArchived,
    Follower,
    Followed,
    FollowersRequested,
    Card,
}

impl UserCounter {
    pub fn attribute_name(&self) -> &'static str {
        match self {
            UserCounter::Post => "postCount",
            UserCounter::PostArchived => "postArchivedCount",
            UserCounter::Follower => "followerCount",
            UserCounter::Followed => "followedCount",
            UserCounter::FollowersRequested => "followersRequestedCount",
            UserCounter::Card => "cardCount",
        }
    }

    pub fn get(&self, user: &User) -> u64 {
        match self {
            UserCounter::Post => user.post_count,
            UserCounter::PostArchived => user.post_archived_count,
            UserCounter::Follower => user.follower_count,
            UserCounter::Followed => user.followed_count,
            UserCounter::FollowersRequested => user.followers_requested_count,
            UserCounter::Card => user.card_count,
        }
    }

    pub fn field_mut<'a>(&self, user: &'a mut User) -> &'a mut u64 {
        match self {
            UserCounter::Post => &mut user.post_count,
            UserCounter::PostArchived => &mut user.post_archived_count,
            UserCounter::Follower => &mut user.follower_count,
            UserCounter::Followed => &mut user.followed_count,
            UserCounter::FollowersRequested => &mut user.followers_requested_count,
            UserCounter::Card => &mut user.card_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostCounter {
    OnymousLike,
    AnonymousLike,
    Comment,
    CommentsUnviewed,
    Flag,
    ViewedBy,
}

impl PostCounter {
    pub fn attribute_name(&self) -> &'static str {
        match self {
            PostCounter::OnymousLike => "onymousLikeCount",
            PostCounter::AnonymousLike => "anonymousLikeCount",
            PostCounter::Comment => "commentCount",
            PostCounter::CommentsUnviewed => "commentsUnviewedCount",
            PostCounter::Flag => "flagCount",
            PostCounter::ViewedBy => "viewedByCount",
        }
    }

    pub fn get(&self, post: &Post) -> u64 {
        match self {
            PostCounter::OnymousLike => post.onymous_like_count,
            PostCounter::AnonymousLike => post.anonymous_like_count,
            PostCounter::Comment => post.comment_count,
            PostCounter::CommentsUnviewed => post.comments_unviewed_count,
            PostCounter::Flag => post.flag_count,
            PostCounter::ViewedBy => post.viewed_by_count,
        }
    }

    pub fn field_mut<'a>(&self, post: &'a mut Post) -> &'a mut u64 {
        match self {
            PostCounter::OnymousLike => &mut post.onymous_like_count,
            PostCounter::AnonymousLike => &mut post.anonymous_like_count,
            PostCounter::Comment => &mut post.comment_count,
            PostCounter::CommentsUnviewed => &mut post.comments_unviewed_count,
            PostCounter::Flag => &mut post.flag_count,
            PostCounter::ViewedBy => &mut post.viewed_by_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentCounter {
    Flag,
}

impl CommentCounter {
    pub fn attribute_name(&self) -> &'static str {
        match self {
            CommentCounter::Flag => "flagCount",
        }
    }

    pub fn field_mut<'a>(&self, comment: &'a mut Comment) -> &'a mut u64 {
        match self {
            CommentCounter::Flag => &mut comment.flag_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlbumCounter {
    Post,
    Rank,
}

impl AlbumCounter {
    pub fn attribute_name(&self) -> &'static str {
        match self {
            AlbumCounter::Post => "postCount",
            AlbumCounter::Rank => "rankCount",
        }
    }

    pub fn field_mut<'a>(&self, album: &'a mut Album) -> &'a mut u64 {
        match self {
            AlbumCounter::Post => &mut album.post_count,
            AlbumCounter::Rank => &mut album.rank_count,
        }
    }
}
