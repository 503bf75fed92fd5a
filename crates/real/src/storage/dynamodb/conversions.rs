//! DynamoDB attribute conversion functions.
//!
//! Entities are stored through their serde representation: JSON values map
//! one to one onto attribute values, `null` fields are left out of the item.
//! The key attributes from [`keys`] are added alongside the entity's own
//! attributes and ignored again when decoding.
//!
//! These are testable in isolation without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use real_core::model::{
    Album, Block, Card, Comment, FeedItem, Flag, Follow, Like, Post, User, View,
};
use real_core::storage::RepositoryError;
use real_core::stream::Entity;

use super::keys::{self, ItemKeys, SortValue, ENTITY_TYPE, PARTITION_KEY, SORT_KEY};

pub type Item = HashMap<String, AttributeValue>;

/// An entity's attributes split into the ones present and the optional ones
/// currently unset.
#[derive(Debug, Default)]
pub struct Attributes {
    pub present: Item,
    pub absent: Vec<String>,
}

// ============================================================================
// JSON <-> AttributeValue
// ============================================================================

pub fn json_to_attribute(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(values) => {
            AttributeValue::L(values.into_iter().map(json_to_attribute).collect())
        }
        Value::Object(map) => AttributeValue::M(
            map.into_iter()
                .map(|(k, v)| (k, json_to_attribute(v)))
                .collect(),
        ),
    }
}

pub fn attribute_to_json(value: &AttributeValue) -> Result<Value, RepositoryError> {
    Ok(match value {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::N(n) => Value::Number(parse_number(n)?),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::L(values) => Value::Array(
            values
                .iter()
                .map(attribute_to_json)
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::M(map) => Value::Object(item_to_json(map)?),
        AttributeValue::Ss(values) => {
            Value::Array(values.iter().cloned().map(Value::String).collect())
        }
        other => {
            return Err(RepositoryError::InvalidData(format!(
                "Unsupported attribute value: {other:?}"
            )))
        }
    })
}

/// Parses a DynamoDB number, preferring integers.
pub fn parse_number(n: &str) -> Result<Number, RepositoryError> {
    if let Ok(i) = n.parse::<i64>() {
        return Ok(Number::from(i));
    }
    if let Ok(u) = n.parse::<u64>() {
        return Ok(Number::from(u));
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| RepositoryError::InvalidData(format!("Invalid number: {n}")))
}

fn item_to_json(item: &Item) -> Result<Map<String, Value>, RepositoryError> {
    item.iter()
        .map(|(k, v)| Ok((k.clone(), attribute_to_json(v)?)))
        .collect()
}

// ============================================================================
// Entities
// ============================================================================

/// Serializes an entity into its own attributes, without keys.
pub fn to_attributes<T: Serialize>(value: &T) -> Result<Attributes, RepositoryError> {
    let json =
        serde_json::to_value(value).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    let Value::Object(map) = json else {
        return Err(RepositoryError::Serialization(
            "Entity did not serialize to an object".to_string(),
        ));
    };

    let mut attributes = Attributes::default();
    for (name, value) in map {
        if value.is_null() {
            attributes.absent.push(name);
        } else {
            attributes.present.insert(name, json_to_attribute(value));
        }
    }
    Ok(attributes)
}

/// Writes the key attributes of an item.
pub fn insert_keys(item: &mut Item, entity_type: &str, keys: &ItemKeys) {
    item.insert(PARTITION_KEY.to_string(), AttributeValue::S(keys.pk.clone()));
    item.insert(SORT_KEY.to_string(), AttributeValue::S(keys.sk.clone()));
    item.insert(
        ENTITY_TYPE.to_string(),
        AttributeValue::S(entity_type.to_string()),
    );
    for key in &keys.indexes {
        item.insert(
            key.index.partition_key().to_string(),
            AttributeValue::S(key.pk.clone()),
        );
        item.insert(key.index.sort_key().to_string(), sort_value(&key.sk));
    }
}

pub fn sort_value(sk: &SortValue) -> AttributeValue {
    match sk {
        SortValue::Str(s) => AttributeValue::S(s.clone()),
        SortValue::Num(n) => AttributeValue::N(n.to_string()),
    }
}

/// Builds the full item for a put.
pub fn to_item<T: Serialize>(
    entity_type: &str,
    value: &T,
    keys: &ItemKeys,
) -> Result<Item, RepositoryError> {
    let mut item = to_attributes(value)?.present;
    insert_keys(&mut item, entity_type, keys);
    Ok(item)
}

/// Decodes an item into an entity. Key attributes are ignored.
pub fn from_item<T: DeserializeOwned>(item: &Item) -> Result<T, RepositoryError> {
    from_json(Value::Object(item_to_json(item)?))
}

pub fn from_json<T: DeserializeOwned>(value: Value) -> Result<T, RepositoryError> {
    serde_json::from_value(value).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

pub fn from_items<T: DeserializeOwned>(items: &[Item]) -> Result<Vec<T>, RepositoryError> {
    items.iter().map(from_item).collect()
}

/// Decodes an item of any type by its `entityType` attribute.
///
/// Returns `None` for items this service does not model.
pub fn json_to_entity(mut value: Value) -> Result<Option<Entity>, RepositoryError> {
    let entity_type = match value.get_mut(ENTITY_TYPE).map(Value::take) {
        Some(Value::String(s)) => s,
        _ => {
            return Err(RepositoryError::InvalidData(format!(
                "Missing field: {ENTITY_TYPE}"
            )))
        }
    };

    let entity = match entity_type.as_str() {
        "User" => Entity::User(from_json::<User>(value)?),
        "Post" => Entity::Post(from_json::<Post>(value)?),
        "Comment" => Entity::Comment(from_json::<Comment>(value)?),
        "Like" => Entity::Like(from_json::<Like>(value)?),
        "Follow" => Entity::Follow(from_json::<Follow>(value)?),
        "FeedItem" => Entity::FeedItem(from_json::<FeedItem>(value)?),
        "Card" => Entity::Card(from_json::<Card>(value)?),
        "Album" => Entity::Album(from_json::<Album>(value)?),
        "View" => Entity::View(from_json::<View>(value)?),
        "Flag" => Entity::Flag(from_json::<Flag>(value)?),
        "Block" => Entity::Block(from_json::<Block>(value)?),
        _ => return Ok(None),
    };
    Ok(Some(entity))
}

/// Builds the item of any entity, keyed for its type.
pub fn entity_to_item(entity: &Entity) -> Result<Item, RepositoryError> {
    let entity_type = entity.type_name();
    match entity {
        Entity::User(v) => to_item(entity_type, v, &keys::user_keys(v)),
        Entity::Post(v) => to_item(entity_type, v, &keys::post_keys(v)),
        Entity::Comment(v) => to_item(entity_type, v, &keys::comment_keys(v)),
        Entity::Like(v) => to_item(entity_type, v, &keys::like_keys(v)),
        Entity::Follow(v) => to_item(entity_type, v, &keys::follow_keys(v)),
        Entity::FeedItem(v) => to_item(entity_type, v, &keys::feed_keys(v)),
        Entity::Card(v) => to_item(entity_type, v, &keys::card_keys(v)),
        Entity::Album(v) => to_item(entity_type, v, &keys::album_keys(v)),
        Entity::View(v) => to_item(entity_type, v, &keys::view_keys(v)),
        Entity::Flag(v) => to_item(entity_type, v, &keys::flag_keys(v)),
        Entity::Block(v) => to_item(entity_type, v, &keys::block_keys(v)),
    }
}

// ============================================================================
// Update expressions
// ============================================================================

/// A `SET`/`REMOVE` update over named attributes.
#[derive(Debug, Default, PartialEq)]
pub struct UpdateParts {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

/// Builds an update writing every attribute of `attributes` plus the index
/// keys, and removing unset optional attributes and unused index keys.
/// Attributes in `preserve` are neither set nor removed.
pub fn update_parts(attributes: Attributes, keys: &ItemKeys, preserve: &[&str]) -> UpdateParts {
    let mut set: Vec<(String, AttributeValue)> = attributes.present.into_iter().collect();
    let mut remove = attributes.absent;

    for index in keys::Index::ALL {
        match keys.get(index) {
            Some(key) => {
                set.push((
                    index.partition_key().to_string(),
                    AttributeValue::S(key.pk.clone()),
                ));
                set.push((index.sort_key().to_string(), sort_value(&key.sk)));
            }
            None => {
                remove.push(index.partition_key().to_string());
                remove.push(index.sort_key().to_string());
            }
        }
    }

    set.retain(|(name, _)| !preserve.contains(&name.as_str()));
    remove.retain(|name| !preserve.contains(&name.as_str()));
    set.sort_by(|a, b| a.0.cmp(&b.0));
    remove.sort();

    let mut parts = UpdateParts::default();
    let mut set_clauses = Vec::with_capacity(set.len());
    for (i, (name, value)) in set.into_iter().enumerate() {
        set_clauses.push(format!("#s{i} = :s{i}"));
        parts.names.insert(format!("#s{i}"), name);
        parts.values.insert(format!(":s{i}"), value);
    }
    let mut remove_clauses = Vec::with_capacity(remove.len());
    for (i, name) in remove.into_iter().enumerate() {
        remove_clauses.push(format!("#r{i}"));
        parts.names.insert(format!("#r{i}"), name);
    }

    let mut expression = Vec::new();
    if !set_clauses.is_empty() {
        expression.push(format!("SET {}", set_clauses.join(", ")));
    }
    if !remove_clauses.is_empty() {
        expression.push(format!("REMOVE {}", remove_clauses.join(", ")));
    }
    parts.expression = expression.join(" ");
    parts
}

// ============================================================================
// Helper functions
// ============================================================================

/// Read a numeric attribute as a counter value.
pub fn get_count(item: &Item, key: &str) -> Result<u64, RepositoryError> {
    match item.get(key) {
        Some(AttributeValue::N(n)) => n
            .parse()
            .map_err(|_| RepositoryError::InvalidData(format!("Invalid counter {key}: {n}"))),
        _ => Err(RepositoryError::InvalidData(format!("Missing field: {key}"))),
    }
}
