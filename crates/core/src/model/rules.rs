use chrono::{DateTime, Datelike, NaiveDate, Utc};

use super::counters::{PostCounter, UserCounter};
use super::enums::{FollowStatus, LikeStatus, PostStatus};
use super::error::{PostError, UserError};
use super::types::{Comment, User, View};

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 30;

pub const DATING_MIN_AGE: i32 = 18;
pub const DATING_MAX_AGE: i32 = 100;

/// Number of distinct viewers at which the owner gets a views card.
pub const POST_VIEWS_CARD_THRESHOLD: u64 = 5;

/// Validates a username: 3 to 30 characters of letters, digits, `_` and `.`.
pub fn validate_username(username: &str) -> Result<(), UserError> {
    let length_ok = (USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&username.chars().count());
    let chars_ok = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if length_ok && chars_ok {
        Ok(())
    } else {
        Err(UserError::InvalidUsername(username.to_string()))
    }
}

/// A signed change to one user's counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterDelta {
    pub user_id: String,
    pub counter: UserCounter,
    pub increment: bool,
}

impl CounterDelta {
    fn incr(user_id: &str, counter: UserCounter) -> Self {
        Self {
            user_id: user_id.to_string(),
            counter,
            increment: true,
        }
    }

    fn decr(user_id: &str, counter: UserCounter) -> Self {
        Self {
            user_id: user_id.to_string(),
            counter,
            increment: false,
        }
    }
}

/// Counter changes implied by a follow moving between statuses.
///
/// A missing follow item counts as `NotFollowing`.
pub fn follow_counter_deltas(
    follower_user_id: &str,
    followed_user_id: &str,
    old_status: FollowStatus,
    new_status: FollowStatus,
) -> Vec<CounterDelta> {
    let mut deltas = Vec::new();

    let was_following = old_status == FollowStatus::Following;
    let is_following = new_status == FollowStatus::Following;
    if !was_following && is_following {
        deltas.push(CounterDelta::incr(follower_user_id, UserCounter::Followed));
        deltas.push(CounterDelta::incr(followed_user_id, UserCounter::Follower));
    }
    if was_following && !is_following {
        deltas.push(CounterDelta::decr(follower_user_id, UserCounter::Followed));
        deltas.push(CounterDelta::decr(followed_user_id, UserCounter::Follower));
    }

    let was_requested = old_status == FollowStatus::Requested;
    let is_requested = new_status == FollowStatus::Requested;
    if !was_requested && is_requested {
        deltas.push(CounterDelta::incr(
            followed_user_id,
            UserCounter::FollowersRequested,
        ));
    }
    if was_requested && !is_requested {
        deltas.push(CounterDelta::decr(
            followed_user_id,
            UserCounter::FollowersRequested,
        ));
    }

    deltas
}

/// Counter changes on the poster implied by a post status change.
pub fn post_status_counter_deltas(
    user_id: &str,
    old_status: Option<PostStatus>,
    new_status: Option<PostStatus>,
) -> Vec<CounterDelta> {
    let mut deltas = Vec::new();
    if old_status == new_status {
        return deltas;
    }
    match old_status {
        Some(PostStatus::Completed) => deltas.push(CounterDelta::decr(user_id, UserCounter::Post)),
        Some(PostStatus::Archived) => {
            deltas.push(CounterDelta::decr(user_id, UserCounter::PostArchived))
        }
        _ => {}
    }
    match new_status {
        Some(PostStatus::Completed) => deltas.push(CounterDelta::incr(user_id, UserCounter::Post)),
        Some(PostStatus::Archived) => {
            deltas.push(CounterDelta::incr(user_id, UserCounter::PostArchived))
        }
        _ => {}
    }
    deltas
}

/// The post counter that tracks likes of the given status.
pub fn like_counter(status: LikeStatus) -> PostCounter {
    match status {
        LikeStatus::OnymouslyLiked => PostCounter::OnymousLike,
        LikeStatus::AnonymouslyLiked => PostCounter::AnonymousLike,
    }
}

/// Whether enough viewers flagged an item to remove it without review.
///
/// The threshold is one flag per ten viewers; items nobody viewed are never
/// removed by the crowd.
pub fn is_crowdsourced_forced_removal_criteria_met(flag_count: u64, viewed_by_count: u64) -> bool {
    viewed_by_count > 0 && flag_count > 0 && flag_count * 10 >= viewed_by_count
}

/// Whether a view record shows the post owner looking at the post again.
pub fn is_owner_view_increase(owner_user_id: &str, old: Option<&View>, new: Option<&View>) -> bool {
    let Some(new) = new else {
        return false;
    };
    if new.user_id != owner_user_id {
        return false;
    }
    let old_count = old.map(|v| v.view_count).unwrap_or(0);
    new.view_count > old_count
}

/// Whether a comment is still unseen by the post owner.
///
/// Owner comments are always seen. Other comments are unseen unless the
/// owner viewed the post after the comment was made.
pub fn is_comment_unviewed(post_owner_id: &str, comment: &Comment, owner_view: Option<&View>) -> bool {
    if comment.user_id == post_owner_id {
        return false;
    }
    owner_view.is_none_or(|view| view.last_viewed_at < comment.created_at)
}

pub fn validate_post_status_transition(
    post_id: &str,
    from: PostStatus,
    to: PostStatus,
) -> Result<(), PostError> {
    let allowed = matches!(
        (from, to),
        (PostStatus::Pending, PostStatus::Completed)
            | (PostStatus::Completed, PostStatus::Archived)
            | (PostStatus::Archived, PostStatus::Completed)
            | (_, PostStatus::Deleting)
    );
    if allowed {
        Ok(())
    } else {
        Err(PostError::InvalidStatusTransition {
            post_id: post_id.to_string(),
            from,
            to,
        })
    }
}

/// Age in whole years on `today`.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

/// Checks the profile fields required to appear in dating.
pub fn validate_dating_eligibility(user: &User, now: DateTime<Utc>) -> Result<(), UserError> {
    let fail = |reason: &str| UserError::DatingRequirementsNotMet {
        user_id: user.user_id.clone(),
        reason: reason.to_string(),
    };
    if user.full_name.as_deref().is_none_or(|n| n.trim().is_empty()) {
        return Err(fail("full name is required"));
    }
    if user.gender.is_none() {
        return Err(fail("gender is required"));
    }
    let Some(date_of_birth) = user.date_of_birth else {
        return Err(fail("date of birth is required"));
    };
    let age = age_on(date_of_birth, now.date_naive());
    if !(DATING_MIN_AGE..=DATING_MAX_AGE).contains(&age) {
        return Err(fail("age must be between 18 and 100"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::enums::Gender;
    use chrono::Duration;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("real_user.1").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(31)).is_err());
    }

    #[test]
    fn test_follow_deltas_start_following() {
        let deltas = follow_counter_deltas(
            "follower",
            "followed",
            FollowStatus::NotFollowing,
            FollowStatus::Following,
        );
        assert_eq!(
            deltas,
            vec![
                CounterDelta::incr("follower", UserCounter::Followed),
                CounterDelta::incr("followed", UserCounter::Follower),
            ]
        );
    }

    #[test]
    fn test_follow_deltas_request_accepted() {
        let deltas = follow_counter_deltas(
            "follower",
            "followed",
            FollowStatus::Requested,
            FollowStatus::Following,
        );
        assert_eq!(
            deltas,
            vec![
                CounterDelta::incr("follower", UserCounter::Followed),
                CounterDelta::incr("followed", UserCounter::Follower),
                CounterDelta::decr("followed", UserCounter::FollowersRequested),
            ]
        );
    }

    #[test]
    fn test_follow_deltas_unchanged_status() {
        assert!(follow_counter_deltas("a", "b", FollowStatus::Denied, FollowStatus::Denied).is_empty());
        assert!(
            follow_counter_deltas("a", "b", FollowStatus::Following, FollowStatus::Following)
                .is_empty()
        );
    }

    #[test]
    fn test_post_status_deltas() {
        let deltas = post_status_counter_deltas(
            "uid",
            Some(PostStatus::Completed),
            Some(PostStatus::Archived),
        );
        assert_eq!(
            deltas,
            vec![
                CounterDelta::decr("uid", UserCounter::Post),
                CounterDelta::incr("uid", UserCounter::PostArchived),
            ]
        );
        assert!(post_status_counter_deltas("uid", Some(PostStatus::Pending), Some(PostStatus::Deleting)).is_empty());
        assert_eq!(
            post_status_counter_deltas("uid", Some(PostStatus::Completed), None),
            vec![CounterDelta::decr("uid", UserCounter::Post)]
        );
    }

    #[test]
    fn test_crowdsourced_criteria() {
        assert!(!is_crowdsourced_forced_removal_criteria_met(1, 0));
        assert!(is_crowdsourced_forced_removal_criteria_met(1, 6));
        assert!(is_crowdsourced_forced_removal_criteria_met(1, 10));
        assert!(!is_crowdsourced_forced_removal_criteria_met(1, 11));
        assert!(!is_crowdsourced_forced_removal_criteria_met(0, 5));
    }

    fn view(user_id: &str, view_count: u64, at: DateTime<Utc>) -> View {
        View {
            item_id: "pid".to_string(),
            user_id: user_id.to_string(),
            view_count,
            first_viewed_at: at,
            last_viewed_at: at,
        }
    }

    #[test]
    fn test_owner_view_increase() {
        let now = Utc::now();
        let old = view("owner", 2, now);
        let new = view("owner", 3, now);
        assert!(is_owner_view_increase("owner", Some(&old), Some(&new)));
        assert!(!is_owner_view_increase("owner", Some(&new), Some(&old)));
        assert!(is_owner_view_increase("owner", None, Some(&new)));
        assert!(!is_owner_view_increase("owner", None, Some(&view("other", 1, now))));
        assert!(!is_owner_view_increase("owner", Some(&old), None));
    }

    #[test]
    fn test_comment_unviewed() {
        let now = Utc::now();
        let comment = Comment {
            comment_id: "cid".to_string(),
            post_id: "pid".to_string(),
            user_id: "other".to_string(),
            text: "lore".to_string(),
            created_at: now,
            flag_count: 0,
        };
        assert!(is_comment_unviewed("owner", &comment, None));
        let before = view("owner", 1, now - Duration::minutes(1));
        assert!(is_comment_unviewed("owner", &comment, Some(&before)));
        let after = view("owner", 1, now + Duration::minutes(1));
        assert!(!is_comment_unviewed("owner", &comment, Some(&after)));
        assert!(!is_comment_unviewed("other", &comment, None));
    }

    #[test]
    fn test_status_transitions() {
        assert!(validate_post_status_transition("p", PostStatus::Pending, PostStatus::Completed).is_ok());
        assert!(validate_post_status_transition("p", PostStatus::Archived, PostStatus::Completed).is_ok());
        assert!(validate_post_status_transition("p", PostStatus::Pending, PostStatus::Deleting).is_ok());
        assert!(validate_post_status_transition("p", PostStatus::Pending, PostStatus::Archived).is_err());
        assert!(validate_post_status_transition("p", PostStatus::Deleting, PostStatus::Completed).is_err());
    }

    #[test]
    fn test_dating_eligibility() {
        let now = Utc::now();
        let mut user = User::new("uid", "uname", now);
        assert!(validate_dating_eligibility(&user, now).is_err());

        user.full_name = Some("Grant".to_string());
        user.gender = Some(Gender::Male);
        user.date_of_birth = NaiveDate::from_ymd_opt(1990, 1, 1);
        assert!(validate_dating_eligibility(&user, now).is_ok());

        user.date_of_birth = Some(now.date_naive());
        assert!(validate_dating_eligibility(&user, now).is_err());
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let dob = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap();
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2018, 6, 14).unwrap()), 17);
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2018, 6, 15).unwrap()), 18);
    }
}
