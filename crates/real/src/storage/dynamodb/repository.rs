//! DynamoDB repository implementation.
//!
//! Implements the repository traits from `real_core::storage` over a single
//! table. Writes are conditional the same way as the in-memory backend, so
//! both return the same errors.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, PutRequest, ReturnValue, WriteRequest};
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use real_core::model::{
    Album, AlbumCounter, Block, Card, Comment, CommentCounter, FeedItem, Flag, FlaggedItem, Follow,
    FollowStatus, Like, Post, PostCounter, PostStatus, User, UserCounter, View,
};
use real_core::storage::{
    AlbumRepository, BlockRepository, CardRepository, CommentRepository, FeedRepository,
    FlagRepository, FollowRepository, LikeRepository, PostRepository, RepositoryError, Result,
    UserRepository, ViewRepository,
};

use super::conversions::{
    from_item, from_items, get_count, to_attributes, to_item, update_parts, Item,
};
use super::error::{
    map_batch_write_error, map_delete_item_error, map_get_item_error, map_put_item_error,
    map_query_error, map_update_item_error,
};
use super::keys::{self, Index, ItemKeys, PARTITION_KEY, SINGLE_SK, SORT_KEY};

/// Maximum number of requests in one BatchWriteItem call.
const BATCH_WRITE_LIMIT: usize = 25;
const BATCH_WRITE_RETRIES: u32 = 5;
const BATCH_WRITE_BACKOFF: Duration = Duration::from_millis(50);

const ITEM_EXISTS: &str = "attribute_exists(partitionKey)";
const ITEM_NOT_EXISTS: &str = "attribute_not_exists(partitionKey)";

/// DynamoDB-based repository implementation.
///
/// Provides async access to DynamoDB storage for all entity types.
pub struct DynamoDbRepository {
    client: Client,
    table_name: String,
}

impl DynamoDbRepository {
    /// Creates a new repository with the given DynamoDB client and table name.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Get the table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn get_entity<T: DeserializeOwned>(
        &self,
        entity_type: &'static str,
        id: &str,
        pk: String,
        sk: impl Into<String>,
    ) -> Result<Option<T>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(item_key(pk, sk)))
            .send()
            .await
            .map_err(|e| map_get_item_error(e, entity_type, id))?;

        match result.item {
            Some(item) => Ok(Some(from_item(&item)?)),
            None => Ok(None),
        }
    }

    /// Puts an item that must not exist yet.
    async fn create_entity<T: Serialize>(
        &self,
        entity_type: &'static str,
        id: &str,
        value: &T,
        keys: &ItemKeys,
    ) -> Result<()> {
        let item = to_item(entity_type, value, keys)?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression(ITEM_NOT_EXISTS)
            .send()
            .await
            .map_err(|e| map_put_item_error(e, entity_type, id))?;

        Ok(())
    }

    /// Puts an item, replacing any existing one.
    async fn put_entity<T: Serialize>(
        &self,
        entity_type: &'static str,
        id: &str,
        value: &T,
        keys: &ItemKeys,
    ) -> Result<()> {
        let item = to_item(entity_type, value, keys)?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, entity_type, id))?;

        Ok(())
    }

    /// Rewrites an existing item's attributes, leaving `preserve` untouched.
    async fn update_entity<T: Serialize>(
        &self,
        entity_type: &'static str,
        id: &str,
        value: &T,
        keys: &ItemKeys,
        preserve: &[&str],
    ) -> Result<()> {
        let parts = update_parts(to_attributes(value)?, keys, preserve);

        self.client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(item_key(keys.pk.clone(), keys.sk.clone())))
            .update_expression(parts.expression)
            .condition_expression(ITEM_EXISTS)
            .set_expression_attribute_names(Some(parts.names))
            .set_expression_attribute_values((!parts.values.is_empty()).then_some(parts.values))
            .send()
            .await
            .map_err(|e| map_update_item_error(e, || RepositoryError::not_found(entity_type, id)))?;

        Ok(())
    }

    async fn delete_entity(
        &self,
        entity_type: &'static str,
        id: &str,
        pk: String,
        sk: impl Into<String>,
    ) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(item_key(pk, sk)))
            .condition_expression(ITEM_EXISTS)
            .send()
            .await
            .map_err(|e| map_delete_item_error(e, entity_type, id))?;

        Ok(())
    }

    async fn increment(
        &self,
        entity_type: &'static str,
        id: &str,
        pk: String,
        sk: impl Into<String>,
        attribute: &'static str,
    ) -> Result<u64> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(item_key(pk, sk)))
            .update_expression("ADD #c :one")
            .condition_expression(ITEM_EXISTS)
            .expression_attribute_names("#c", attribute)
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await
            .map_err(|e| map_update_item_error(e, || RepositoryError::not_found(entity_type, id)))?;

        get_count(&result.attributes.unwrap_or_default(), attribute)
    }

    /// Decrements a counter, refusing to go below zero.
    async fn decrement(
        &self,
        entity_type: &'static str,
        id: &str,
        pk: String,
        sk: impl Into<String>,
        attribute: &'static str,
    ) -> Result<u64> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(item_key(pk, sk)))
            .update_expression("ADD #c :minus_one")
            .condition_expression("attribute_exists(partitionKey) AND #c > :zero")
            .expression_attribute_names("#c", attribute)
            .expression_attribute_values(":minus_one", AttributeValue::N("-1".to_string()))
            .expression_attribute_values(":zero", AttributeValue::N("0".to_string()))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await
            .map_err(|e| {
                map_update_item_error(e, || {
                    RepositoryError::condition_failed(entity_type, id, format!("{attribute} > 0"))
                })
            })?;

        get_count(&result.attributes.unwrap_or_default(), attribute)
    }

    /// Runs a key query, following pagination until exhausted or `limit`
    /// items were read.
    async fn query(&self, query: KeyQuery) -> Result<Vec<Item>> {
        let (pk_name, sk_name) = match query.index {
            Some(index) => (index.partition_key(), index.sort_key()),
            None => (PARTITION_KEY, SORT_KEY),
        };
        let key_condition = match &query.sk {
            None => "#pk = :pk".to_string(),
            Some(SortCondition::BeginsWith(_)) => "#pk = :pk AND begins_with(#sk, :sk)".to_string(),
            Some(SortCondition::Equals(_)) => "#pk = :pk AND #sk = :sk".to_string(),
            Some(SortCondition::AtMost(_)) => "#pk = :pk AND #sk <= :sk".to_string(),
        };

        let mut items = Vec::new();
        let mut start_key = None;
        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .set_index_name(query.index.map(|index| index.name().to_string()))
                .key_condition_expression(&key_condition)
                .expression_attribute_names("#pk", pk_name)
                .expression_attribute_values(":pk", AttributeValue::S(query.pk.clone()))
                .scan_index_forward(query.forward)
                .set_exclusive_start_key(start_key.take());
            if let Some(condition) = &query.sk {
                request = request
                    .expression_attribute_names("#sk", sk_name)
                    .expression_attribute_values(":sk", AttributeValue::S(condition.value().to_string()));
            }
            if let Some(limit) = query.limit {
                let remaining = limit.saturating_sub(items.len());
                request = request.limit(i32::try_from(remaining).unwrap_or(i32::MAX));
            }

            let result = request.send().await.map_err(map_query_error)?;
            items.extend(result.items.unwrap_or_default());

            match result.last_evaluated_key {
                Some(key) if query.limit.is_none_or(|limit| items.len() < limit) => {
                    start_key = Some(key)
                }
                _ => break,
            }
        }

        Ok(items)
    }

    async fn query_as<T: DeserializeOwned>(&self, query: KeyQuery) -> Result<Vec<T>> {
        from_items(&self.query(query).await?)
    }

    /// Writes requests in batches, retrying unprocessed items.
    async fn batch_write(&self, requests: Vec<WriteRequest>) -> Result<()> {
        for chunk in requests.chunks(BATCH_WRITE_LIMIT) {
            let mut pending = chunk.to_vec();
            let mut attempt = 0;

            while !pending.is_empty() {
                let result = self
                    .client
                    .batch_write_item()
                    .request_items(&self.table_name, pending)
                    .send()
                    .await
                    .map_err(map_batch_write_error)?;

                pending = result
                    .unprocessed_items
                    .and_then(|mut unprocessed| unprocessed.remove(&self.table_name))
                    .unwrap_or_default();

                if !pending.is_empty() {
                    attempt += 1;
                    if attempt > BATCH_WRITE_RETRIES {
                        return Err(RepositoryError::QueryFailed(format!(
                            "{} batch writes left unprocessed",
                            pending.len()
                        )));
                    }
                    tracing::debug!(
                        unprocessed = pending.len(),
                        attempt,
                        "Retrying unprocessed batch writes"
                    );
                    tokio::time::sleep(BATCH_WRITE_BACKOFF * attempt).await;
                }
            }
        }

        Ok(())
    }
}

fn item_key(pk: String, sk: impl Into<String>) -> Item {
    Item::from([
        (PARTITION_KEY.to_string(), AttributeValue::S(pk)),
        (SORT_KEY.to_string(), AttributeValue::S(sk.into())),
    ])
}

fn pair_key(a: &str, b: &str) -> String {
    format!("{a}/{b}")
}

fn invalid_request(err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::InvalidData(err.to_string())
}

/// Timestamps stored as attributes use the same format as serde.
fn datetime_attribute(at: DateTime<Utc>) -> AttributeValue {
    AttributeValue::S(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

enum SortCondition {
    BeginsWith(String),
    Equals(String),
    AtMost(String),
}

impl SortCondition {
    fn value(&self) -> &str {
        match self {
            SortCondition::BeginsWith(v) | SortCondition::Equals(v) | SortCondition::AtMost(v) => v,
        }
    }
}

/// A query over the table or one of its indexes.
struct KeyQuery {
    index: Option<Index>,
    pk: String,
    sk: Option<SortCondition>,
    forward: bool,
    limit: Option<usize>,
}

impl KeyQuery {
    fn table(pk: String) -> Self {
        Self {
            index: None,
            pk,
            sk: None,
            forward: true,
            limit: None,
        }
    }

    fn index(index: Index, pk: String) -> Self {
        Self {
            index: Some(index),
            ..Self::table(pk)
        }
    }

    fn begins_with(mut self, prefix: impl Into<String>) -> Self {
        self.sk = Some(SortCondition::BeginsWith(prefix.into()));
        self
    }

    fn begins_with_opt(self, prefix: Option<String>) -> Self {
        match prefix {
            Some(prefix) => self.begins_with(prefix),
            None => self,
        }
    }

    fn equals(mut self, value: impl Into<String>) -> Self {
        self.sk = Some(SortCondition::Equals(value.into()));
        self
    }

    fn at_most(mut self, value: impl Into<String>) -> Self {
        self.sk = Some(SortCondition::AtMost(value.into()));
        self
    }

    fn newest_first(mut self) -> Self {
        self.forward = false;
        self
    }

    fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

fn user_preserved() -> Vec<&'static str> {
    [
        UserCounter::Post,
        UserCounter::PostArchived,
        UserCounter::Follower,
        UserCounter::Followed,
        UserCounter::FollowersRequested,
        UserCounter::Card,
    ]
    .iter()
    .map(UserCounter::attribute_name)
    .collect()
}

/// Counters and the unviewed comment marker belong to the stream handlers.
fn post_preserved() -> Vec<&'static str> {
    let mut preserved: Vec<&'static str> = [
        PostCounter::OnymousLike,
        PostCounter::AnonymousLike,
        PostCounter::Comment,
        PostCounter::CommentsUnviewed,
        PostCounter::Flag,
        PostCounter::ViewedBy,
    ]
    .iter()
    .map(PostCounter::attribute_name)
    .collect();
    preserved.extend([
        LAST_UNVIEWED_COMMENT_AT,
        Index::A3.partition_key(),
        Index::A3.sort_key(),
    ]);
    preserved
}

fn album_preserved() -> Vec<&'static str> {
    [AlbumCounter::Post, AlbumCounter::Rank]
        .iter()
        .map(AlbumCounter::attribute_name)
        .collect()
}

const LAST_UNVIEWED_COMMENT_AT: &str = "lastUnviewedCommentAt";

// ============================================================================
// UserRepository implementation
// ============================================================================

#[async_trait]
impl UserRepository for DynamoDbRepository {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.get_entity("User", user_id, keys::user_pk(user_id), keys::USER_PROFILE_SK)
            .await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users: Vec<User> = self
            .query_as(KeyQuery::index(Index::A1, keys::username_pk(username)).limit(Some(1)))
            .await?;
        Ok(users.into_iter().next())
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        self.create_entity("User", &user.user_id, user, &keys::user_keys(user))
            .await
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        self.update_entity(
            "User",
            &user.user_id,
            user,
            &keys::user_keys(user),
            &user_preserved(),
        )
        .await
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.delete_entity("User", user_id, keys::user_pk(user_id), keys::USER_PROFILE_SK)
            .await
    }

    async fn increment_user_count(&self, user_id: &str, counter: UserCounter) -> Result<u64> {
        self.increment(
            "User",
            user_id,
            keys::user_pk(user_id),
            keys::USER_PROFILE_SK,
            counter.attribute_name(),
        )
        .await
    }

    async fn decrement_user_count(&self, user_id: &str, counter: UserCounter) -> Result<u64> {
        self.decrement(
            "User",
            user_id,
            keys::user_pk(user_id),
            keys::USER_PROFILE_SK,
            counter.attribute_name(),
        )
        .await
    }
}

// ============================================================================
// PostRepository implementation
// ============================================================================

#[async_trait]
impl PostRepository for DynamoDbRepository {
    async fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        self.get_entity("Post", post_id, keys::post_pk(post_id), SINGLE_SK)
            .await
    }

    async fn create_post(&self, post: &Post) -> Result<()> {
        self.create_entity("Post", &post.post_id, post, &keys::post_keys(post))
            .await
    }

    async fn update_post(&self, post: &Post) -> Result<()> {
        self.update_entity(
            "Post",
            &post.post_id,
            post,
            &keys::post_keys(post),
            &post_preserved(),
        )
        .await
    }

    async fn delete_post(&self, post_id: &str) -> Result<()> {
        self.delete_entity("Post", post_id, keys::post_pk(post_id), SINGLE_SK)
            .await
    }

    async fn list_posts_by_user(
        &self,
        user_id: &str,
        status: Option<PostStatus>,
    ) -> Result<Vec<Post>> {
        let query = KeyQuery::index(Index::A2, keys::posts_by_user_pk(user_id))
            .begins_with_opt(status.map(keys::post_status_prefix))
            .newest_first();
        let mut posts: Vec<Post> = self.query_as(query).await?;
        // Without a status filter the index is grouped by status first.
        posts.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        Ok(posts)
    }

    async fn list_posts_by_album(&self, album_id: &str) -> Result<Vec<Post>> {
        self.query_as(KeyQuery::index(Index::K3, keys::posts_by_album_pk(album_id)))
            .await
    }

    async fn list_expired_posts(&self, now: DateTime<Utc>) -> Result<Vec<Post>> {
        let query = KeyQuery::index(Index::K1, keys::EXPIRING_POSTS_PK.to_string())
            .at_most(keys::timestamp(now));
        self.query_as(query).await
    }

    async fn increment_post_count(&self, post_id: &str, counter: PostCounter) -> Result<u64> {
        self.increment(
            "Post",
            post_id,
            keys::post_pk(post_id),
            SINGLE_SK,
            counter.attribute_name(),
        )
        .await
    }

    async fn decrement_post_count(&self, post_id: &str, counter: PostCounter) -> Result<u64> {
        self.decrement(
            "Post",
            post_id,
            keys::post_pk(post_id),
            SINGLE_SK,
            counter.attribute_name(),
        )
        .await
    }

    async fn set_last_unviewed_comment_at(
        &self,
        post_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(item_key(keys::post_pk(post_id), SINGLE_SK)))
            .condition_expression(ITEM_EXISTS)
            .expression_attribute_names("#at", LAST_UNVIEWED_COMMENT_AT)
            .expression_attribute_names("#a3pk", Index::A3.partition_key())
            .expression_attribute_names("#a3sk", Index::A3.sort_key());

        // GSI-A3 shares its partition with GSI-A2, the posts of the owner.
        let request = match at {
            Some(at) => request
                .update_expression("SET #at = :at, #a3pk = #a2pk, #a3sk = :sk")
                .expression_attribute_names("#a2pk", Index::A2.partition_key())
                .expression_attribute_values(":at", datetime_attribute(at))
                .expression_attribute_values(":sk", AttributeValue::S(keys::timestamp(at))),
            None => request.update_expression("REMOVE #at, #a3pk, #a3sk"),
        };

        request
            .send()
            .await
            .map_err(|e| map_update_item_error(e, || RepositoryError::not_found("Post", post_id)))?;

        Ok(())
    }

    async fn clear_unviewed_comments(&self, post_id: &str) -> Result<()> {
        self.client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(item_key(keys::post_pk(post_id), SINGLE_SK)))
            .update_expression("SET #count = :zero REMOVE #at, #a3pk, #a3sk")
            .condition_expression(ITEM_EXISTS)
            .expression_attribute_names("#count", PostCounter::CommentsUnviewed.attribute_name())
            .expression_attribute_names("#at", LAST_UNVIEWED_COMMENT_AT)
            .expression_attribute_names("#a3pk", Index::A3.partition_key())
            .expression_attribute_names("#a3sk", Index::A3.sort_key())
            .expression_attribute_values(":zero", AttributeValue::N("0".to_string()))
            .send()
            .await
            .map_err(|e| map_update_item_error(e, || RepositoryError::not_found("Post", post_id)))?;

        Ok(())
    }
}

// ============================================================================
// CommentRepository implementation
// ============================================================================

#[async_trait]
impl CommentRepository for DynamoDbRepository {
    async fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>> {
        self.get_entity("Comment", comment_id, keys::comment_pk(comment_id), SINGLE_SK)
            .await
    }

    async fn create_comment(&self, comment: &Comment) -> Result<()> {
        self.create_entity(
            "Comment",
            &comment.comment_id,
            comment,
            &keys::comment_keys(comment),
        )
        .await
    }

    async fn delete_comment(&self, comment_id: &str) -> Result<()> {
        self.delete_entity("Comment", comment_id, keys::comment_pk(comment_id), SINGLE_SK)
            .await
    }

    async fn list_comments_by_post(&self, post_id: &str) -> Result<Vec<Comment>> {
        self.query_as(KeyQuery::index(Index::A1, keys::comment_pk(post_id)))
            .await
    }

    async fn list_comments_by_user(&self, user_id: &str) -> Result<Vec<Comment>> {
        self.query_as(KeyQuery::index(Index::A2, keys::comment_pk(user_id)))
            .await
    }

    async fn increment_comment_count(
        &self,
        comment_id: &str,
        counter: CommentCounter,
    ) -> Result<u64> {
        self.increment(
            "Comment",
            comment_id,
            keys::comment_pk(comment_id),
            SINGLE_SK,
            counter.attribute_name(),
        )
        .await
    }

    async fn decrement_comment_count(
        &self,
        comment_id: &str,
        counter: CommentCounter,
    ) -> Result<u64> {
        self.decrement(
            "Comment",
            comment_id,
            keys::comment_pk(comment_id),
            SINGLE_SK,
            counter.attribute_name(),
        )
        .await
    }
}

// ============================================================================
// LikeRepository implementation
// ============================================================================

#[async_trait]
impl LikeRepository for DynamoDbRepository {
    async fn get_like(&self, liked_by_user_id: &str, post_id: &str) -> Result<Option<Like>> {
        self.get_entity(
            "Like",
            &pair_key(liked_by_user_id, post_id),
            keys::like_pk(liked_by_user_id, post_id),
            SINGLE_SK,
        )
        .await
    }

    async fn create_like(&self, like: &Like) -> Result<()> {
        self.create_entity(
            "Like",
            &pair_key(&like.liked_by_user_id, &like.post_id),
            like,
            &keys::like_keys(like),
        )
        .await
    }

    async fn delete_like(&self, liked_by_user_id: &str, post_id: &str) -> Result<()> {
        self.delete_entity(
            "Like",
            &pair_key(liked_by_user_id, post_id),
            keys::like_pk(liked_by_user_id, post_id),
            SINGLE_SK,
        )
        .await
    }

    async fn list_likes_by_post(&self, post_id: &str) -> Result<Vec<Like>> {
        let mut likes: Vec<Like> = self
            .query_as(KeyQuery::index(Index::A2, keys::likes_pk(post_id)))
            .await?;
        likes.sort_by(|a, b| a.liked_at.cmp(&b.liked_at));
        Ok(likes)
    }

    async fn list_likes_by_user(&self, liked_by_user_id: &str) -> Result<Vec<Like>> {
        let mut likes: Vec<Like> = self
            .query_as(KeyQuery::index(Index::A1, keys::likes_pk(liked_by_user_id)))
            .await?;
        likes.sort_by(|a, b| a.liked_at.cmp(&b.liked_at));
        Ok(likes)
    }

    async fn list_likes_by_user_of_user(
        &self,
        liked_by_user_id: &str,
        posted_by_user_id: &str,
    ) -> Result<Vec<Like>> {
        self.query_as(
            KeyQuery::index(Index::K2, keys::likes_pk(liked_by_user_id)).equals(posted_by_user_id),
        )
        .await
    }
}

// ============================================================================
// FollowRepository implementation
// ============================================================================

#[async_trait]
impl FollowRepository for DynamoDbRepository {
    async fn get_follow(
        &self,
        follower_user_id: &str,
        followed_user_id: &str,
    ) -> Result<Option<Follow>> {
        self.get_entity(
            "Follow",
            &pair_key(follower_user_id, followed_user_id),
            keys::user_pk(followed_user_id),
            keys::follower_sk(follower_user_id),
        )
        .await
    }

    async fn put_follow(&self, follow: &Follow) -> Result<()> {
        self.put_entity(
            "Follow",
            &pair_key(&follow.follower_user_id, &follow.followed_user_id),
            follow,
            &keys::follow_keys(follow),
        )
        .await
    }

    async fn delete_follow(&self, follower_user_id: &str, followed_user_id: &str) -> Result<()> {
        self.delete_entity(
            "Follow",
            &pair_key(follower_user_id, followed_user_id),
            keys::user_pk(followed_user_id),
            keys::follower_sk(follower_user_id),
        )
        .await
    }

    async fn list_followers(
        &self,
        followed_user_id: &str,
        status: Option<FollowStatus>,
    ) -> Result<Vec<Follow>> {
        let query = KeyQuery::index(Index::A2, keys::followed_pk(followed_user_id))
            .begins_with_opt(status.map(keys::follow_status_prefix));
        self.query_as(query).await
    }

    async fn list_followeds(
        &self,
        follower_user_id: &str,
        status: Option<FollowStatus>,
    ) -> Result<Vec<Follow>> {
        let query = KeyQuery::index(Index::A1, keys::follower_sk(follower_user_id))
            .begins_with_opt(status.map(keys::follow_status_prefix));
        self.query_as(query).await
    }
}

// ============================================================================
// FeedRepository implementation
// ============================================================================

#[async_trait]
impl FeedRepository for DynamoDbRepository {
    async fn put_feed_items(&self, items: &[FeedItem]) -> Result<()> {
        let requests = items
            .iter()
            .map(|item| {
                let put = PutRequest::builder()
                    .set_item(Some(to_item("FeedItem", item, &keys::feed_keys(item))?))
                    .build()
                    .map_err(invalid_request)?;
                Ok(WriteRequest::builder().put_request(put).build())
            })
            .collect::<Result<Vec<_>>>()?;

        self.batch_write(requests).await
    }

    async fn delete_feed_items(&self, pairs: &[(String, String)]) -> Result<()> {
        let requests = pairs
            .iter()
            .map(|(user_id, post_id)| {
                let delete = DeleteRequest::builder()
                    .set_key(Some(item_key(
                        keys::user_pk(user_id),
                        keys::feed_sk(post_id),
                    )))
                    .build()
                    .map_err(invalid_request)?;
                Ok(WriteRequest::builder().delete_request(delete).build())
            })
            .collect::<Result<Vec<_>>>()?;

        self.batch_write(requests).await
    }

    async fn list_feed(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<FeedItem>> {
        let query = KeyQuery::index(Index::A1, keys::feed_pk(user_id))
            .newest_first()
            .limit(limit);
        self.query_as(query).await
    }

    async fn list_feed_by_post_owner(
        &self,
        user_id: &str,
        posted_by_user_id: &str,
    ) -> Result<Vec<FeedItem>> {
        self.query_as(KeyQuery::index(
            Index::K2,
            keys::feed_by_owner_pk(user_id, posted_by_user_id),
        ))
        .await
    }
}

// ============================================================================
// CardRepository implementation
// ============================================================================

#[async_trait]
impl CardRepository for DynamoDbRepository {
    async fn get_card(&self, card_id: &str) -> Result<Option<Card>> {
        self.get_entity("Card", card_id, keys::card_pk(card_id), SINGLE_SK)
            .await
    }

    async fn create_card(&self, card: &Card) -> Result<()> {
        self.create_entity("Card", &card.card_id, card, &keys::card_keys(card))
            .await
    }

    async fn update_card(&self, card: &Card) -> Result<()> {
        self.update_entity("Card", &card.card_id, card, &keys::card_keys(card), &[])
            .await
    }

    async fn delete_card(&self, card_id: &str) -> Result<()> {
        self.delete_entity("Card", card_id, keys::card_pk(card_id), SINGLE_SK)
            .await
    }

    async fn list_cards_by_user(&self, user_id: &str) -> Result<Vec<Card>> {
        let query = KeyQuery::index(Index::A1, keys::user_pk(user_id))
            .begins_with(keys::CARD_PREFIX)
            .newest_first();
        self.query_as(query).await
    }
}

// ============================================================================
// AlbumRepository implementation
// ============================================================================

#[async_trait]
impl AlbumRepository for DynamoDbRepository {
    async fn get_album(&self, album_id: &str) -> Result<Option<Album>> {
        self.get_entity("Album", album_id, keys::album_pk(album_id), SINGLE_SK)
            .await
    }

    async fn create_album(&self, album: &Album) -> Result<()> {
        self.create_entity("Album", &album.album_id, album, &keys::album_keys(album))
            .await
    }

    async fn update_album(&self, album: &Album) -> Result<()> {
        self.update_entity(
            "Album",
            &album.album_id,
            album,
            &keys::album_keys(album),
            &album_preserved(),
        )
        .await
    }

    async fn delete_album(&self, album_id: &str) -> Result<()> {
        self.delete_entity("Album", album_id, keys::album_pk(album_id), SINGLE_SK)
            .await
    }

    async fn list_albums_by_user(&self, user_id: &str) -> Result<Vec<Album>> {
        self.query_as(KeyQuery::index(Index::A1, keys::album_pk(user_id)))
            .await
    }

    async fn increment_album_count(&self, album_id: &str, counter: AlbumCounter) -> Result<u64> {
        self.increment(
            "Album",
            album_id,
            keys::album_pk(album_id),
            SINGLE_SK,
            counter.attribute_name(),
        )
        .await
    }

    async fn decrement_album_count(&self, album_id: &str, counter: AlbumCounter) -> Result<u64> {
        self.decrement(
            "Album",
            album_id,
            keys::album_pk(album_id),
            SINGLE_SK,
            counter.attribute_name(),
        )
        .await
    }
}

// ============================================================================
// ViewRepository implementation
// ============================================================================

#[async_trait]
impl ViewRepository for DynamoDbRepository {
    async fn get_view(&self, item_id: &str, user_id: &str) -> Result<Option<View>> {
        self.get_entity(
            "View",
            &pair_key(item_id, user_id),
            keys::post_pk(item_id),
            keys::view_sk(user_id),
        )
        .await
    }

    async fn create_view(&self, view: &View) -> Result<()> {
        self.create_entity(
            "View",
            &pair_key(&view.item_id, &view.user_id),
            view,
            &keys::view_keys(view),
        )
        .await
    }

    async fn increment_view_count(
        &self,
        item_id: &str,
        user_id: &str,
        view_count: u64,
        viewed_at: DateTime<Utc>,
    ) -> Result<()> {
        // Views are recorded as they happen, so the latest write is the
        // latest view.
        self.client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(item_key(keys::post_pk(item_id), keys::view_sk(user_id))))
            .update_expression("ADD #count :count SET #at = :at")
            .condition_expression(ITEM_EXISTS)
            .expression_attribute_names("#count", "viewCount")
            .expression_attribute_names("#at", "lastViewedAt")
            .expression_attribute_values(":count", AttributeValue::N(view_count.to_string()))
            .expression_attribute_values(":at", datetime_attribute(viewed_at))
            .send()
            .await
            .map_err(|e| {
                map_update_item_error(e, || {
                    RepositoryError::not_found("View", pair_key(item_id, user_id))
                })
            })?;

        Ok(())
    }

    async fn list_views(&self, item_id: &str) -> Result<Vec<View>> {
        self.query_as(KeyQuery::table(keys::post_pk(item_id)).begins_with(keys::VIEW_PREFIX))
            .await
    }

    async fn delete_view(&self, item_id: &str, user_id: &str) -> Result<()> {
        self.delete_entity(
            "View",
            &pair_key(item_id, user_id),
            keys::post_pk(item_id),
            keys::view_sk(user_id),
        )
        .await
    }
}

// ============================================================================
// FlagRepository implementation
// ============================================================================

#[async_trait]
impl FlagRepository for DynamoDbRepository {
    async fn get_flag(&self, item: &FlaggedItem, user_id: &str) -> Result<Option<Flag>> {
        self.get_entity(
            "Flag",
            &pair_key(item.id(), user_id),
            keys::flagged_item_pk(item),
            keys::flag_sk(user_id),
        )
        .await
    }

    async fn create_flag(&self, flag: &Flag) -> Result<()> {
        self.create_entity(
            "Flag",
            &pair_key(flag.item.id(), &flag.user_id),
            flag,
            &keys::flag_keys(flag),
        )
        .await
    }

    async fn delete_flag(&self, item: &FlaggedItem, user_id: &str) -> Result<()> {
        self.delete_entity(
            "Flag",
            &pair_key(item.id(), user_id),
            keys::flagged_item_pk(item),
            keys::flag_sk(user_id),
        )
        .await
    }

    async fn list_flags_by_item(&self, item: &FlaggedItem) -> Result<Vec<Flag>> {
        self.query_as(KeyQuery::table(keys::flagged_item_pk(item)).begins_with(keys::FLAG_PREFIX))
            .await
    }

    async fn list_flags_by_user(&self, user_id: &str) -> Result<Vec<Flag>> {
        self.query_as(KeyQuery::index(Index::K1, keys::flag_sk(user_id)))
            .await
    }
}

// ============================================================================
// BlockRepository implementation
// ============================================================================

#[async_trait]
impl BlockRepository for DynamoDbRepository {
    async fn get_block(
        &self,
        blocker_user_id: &str,
        blocked_user_id: &str,
    ) -> Result<Option<Block>> {
        self.get_entity(
            "Block",
            &pair_key(blocker_user_id, blocked_user_id),
            keys::block_pk(blocker_user_id, blocked_user_id),
            SINGLE_SK,
        )
        .await
    }

    async fn create_block(&self, block: &Block) -> Result<()> {
        self.create_entity(
            "Block",
            &pair_key(&block.blocker_user_id, &block.blocked_user_id),
            block,
            &keys::block_keys(block),
        )
        .await
    }

    async fn delete_block(&self, blocker_user_id: &str, blocked_user_id: &str) -> Result<()> {
        self.delete_entity(
            "Block",
            &pair_key(blocker_user_id, blocked_user_id),
            keys::block_pk(blocker_user_id, blocked_user_id),
            SINGLE_SK,
        )
        .await
    }

    async fn list_blocks_by_blocker(&self, blocker_user_id: &str) -> Result<Vec<Block>> {
        self.query_as(KeyQuery::index(Index::A1, keys::blocks_pk(blocker_user_id)))
            .await
    }

    async fn list_blocks_by_blocked(&self, blocked_user_id: &str) -> Result<Vec<Block>> {
        self.query_as(KeyQuery::index(Index::A2, keys::blocks_pk(blocked_user_id)))
            .await
    }
}
