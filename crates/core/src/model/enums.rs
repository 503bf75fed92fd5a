use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ParseEnumError;

/// Implements `as_str`, `Display` and `FromStr` over the wire names of a
/// fieldless enum.
macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// Returns the stored/wire representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        type_name: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserPrivacyStatus {
    #[default]
    Public,
    Private,
}

wire_enum!(UserPrivacyStatus { Public => "PUBLIC", Private => "PRIVATE" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatingStatus {
    Enabled,
    #[default]
    Disabled,
}

wire_enum!(DatingStatus { Enabled => "ENABLED", Disabled => "DISABLED" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
}

wire_enum!(Gender { Male => "MALE", Female => "FEMALE" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostType {
    TextOnly,
    Image,
}

wire_enum!(PostType { TextOnly => "TEXT_ONLY", Image => "IMAGE" });

/// Lifecycle of a post.
///
/// Only `Completed` posts are visible in feeds, counted on the poster and
/// open to likes, comments and views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    Pending,
    Completed,
    Archived,
    Deleting,
}

wire_enum!(PostStatus {
    Pending => "PENDING",
    Completed => "COMPLETED",
    Archived => "ARCHIVED",
    Deleting => "DELETING",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LikeStatus {
    OnymouslyLiked,
    AnonymouslyLiked,
}

wire_enum!(LikeStatus {
    OnymouslyLiked => "ONYMOUSLY_LIKED",
    AnonymouslyLiked => "ANONYMOUSLY_LIKED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FollowStatus {
    #[default]
    NotFollowing,
    Requested,
    Following,
    Denied,
}

wire_enum!(FollowStatus {
    NotFollowing => "NOT_FOLLOWING",
    Requested => "REQUESTED",
    Following => "FOLLOWING",
    Denied => "DENIED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewedStatus {
    Viewed,
    NotViewed,
}

wire_enum!(ViewedStatus { Viewed => "VIEWED", NotViewed => "NOT_VIEWED" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardNotificationType {
    Added,
    Edited,
    Deleted,
}

wire_enum!(CardNotificationType {
    Added => "ADDED",
    Edited => "EDITED",
    Deleted => "DELETED",
});
