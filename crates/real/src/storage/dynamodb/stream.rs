//! DynamoDB stream event parsing.
//!
//! Stream records carry item images in DynamoDB JSON, e.g.
//! `{"postId": {"S": "pid"}, "commentCount": {"N": "3"}}`. Images are
//! decoded through the `entityType` attribute into [`ChangeRecord`]s.

use serde::Deserialize;
use serde_json::{Map, Value};

use real_core::storage::RepositoryError;
use real_core::stream::{ChangeRecord, Entity};

use super::conversions::{json_to_entity, parse_number};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StreamEvent {
    records: Vec<StreamEventRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamEventRecord {
    event_name: Option<String>,
    dynamodb: StreamRecordImages,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StreamRecordImages {
    new_image: Option<Map<String, Value>>,
    old_image: Option<Map<String, Value>>,
}

/// Parses a stream event into change records.
///
/// Records about items this service does not model are dropped.
pub fn parse_stream_event(body: &[u8]) -> Result<Vec<ChangeRecord>, RepositoryError> {
    let event: StreamEvent =
        serde_json::from_slice(body).map_err(|e| RepositoryError::Serialization(e.to_string()))?;

    let mut records = Vec::with_capacity(event.records.len());
    for record in event.records {
        let old = image_to_entity(record.dynamodb.old_image)?;
        let new = image_to_entity(record.dynamodb.new_image)?;
        if old.is_none() && new.is_none() {
            tracing::debug!(event_name = ?record.event_name, "Skipping stream record without a known image");
            continue;
        }
        records.push(ChangeRecord::new(old, new));
    }

    Ok(records)
}

fn image_to_entity(image: Option<Map<String, Value>>) -> Result<Option<Entity>, RepositoryError> {
    match image {
        Some(image) => json_to_entity(Value::Object(image_to_json(image)?)),
        None => Ok(None),
    }
}

fn image_to_json(image: Map<String, Value>) -> Result<Map<String, Value>, RepositoryError> {
    image
        .into_iter()
        .map(|(name, value)| Ok((name, typed_to_json(value)?)))
        .collect()
}

/// Converts one `{"<type>": <value>}` attribute into plain JSON.
fn typed_to_json(value: Value) -> Result<Value, RepositoryError> {
    let invalid = |value: &Value| RepositoryError::InvalidData(format!("Invalid attribute: {value}"));

    let mut typed = match value {
        Value::Object(typed) => typed,
        other => return Err(invalid(&other)),
    };
    let Some((tag, inner)) = typed.iter_mut().next().map(|(k, v)| (k.clone(), v.take())) else {
        return Err(invalid(&Value::Object(typed)));
    };

    match (tag.as_str(), inner) {
        ("S", Value::String(s)) => Ok(Value::String(s)),
        ("N", Value::String(n)) => Ok(Value::Number(parse_number(&n)?)),
        ("BOOL", Value::Bool(b)) => Ok(Value::Bool(b)),
        ("NULL", _) => Ok(Value::Null),
        ("M", Value::Object(map)) => Ok(Value::Object(image_to_json(map)?)),
        ("L", Value::Array(values)) => Ok(Value::Array(
            values
                .into_iter()
                .map(typed_to_json)
                .collect::<Result<_, _>>()?,
        )),
        ("SS", Value::Array(values)) => Ok(Value::Array(values)),
        ("NS", Value::Array(values)) => Ok(Value::Array(
            values
                .into_iter()
                .map(|n| match n {
                    Value::String(n) => Ok(Value::Number(parse_number(&n)?)),
                    other => Err(invalid(&other)),
                })
                .collect::<Result<_, _>>()?,
        )),
        (_, inner) => Err(invalid(&inner)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use real_core::model::{Post, PostStatus};
    use real_core::stream::ChangeKind;

    fn post_image(status: &str, comment_count: &str) -> Value {
        serde_json::json!({
            "partitionKey": { "S": "post/pid" },
            "sortKey": { "S": "-" },
            "entityType": { "S": "Post" },
            "postId": { "S": "pid" },
            "postedByUserId": { "S": "uid" },
            "postType": { "S": "TEXT_ONLY" },
            "postStatus": { "S": status },
            "text": { "S": "hello" },
            "likesDisabled": { "BOOL": false },
            "commentsDisabled": { "BOOL": false },
            "postedAt": { "S": "2024-01-15T10:30:00Z" },
            "onymousLikeCount": { "N": "0" },
            "anonymousLikeCount": { "N": "0" },
            "commentCount": { "N": comment_count },
            "commentsUnviewedCount": { "N": "0" },
            "flagCount": { "N": "0" },
            "viewedByCount": { "N": "0" }
        })
    }

    #[test]
    fn test_parse_modify_record() {
        let event = serde_json::json!({
            "Records": [{
                "eventName": "MODIFY",
                "dynamodb": {
                    "OldImage": post_image("PENDING", "0"),
                    "NewImage": post_image("COMPLETED", "2")
                }
            }]
        });
        let records = parse_stream_event(event.to_string().as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind(), ChangeKind::Modify);
        let (old, new) = records[0].images::<Post>().unwrap();
        assert_eq!(old.unwrap().post_status, PostStatus::Pending);
        let new = new.unwrap();
        assert_eq!(new.post_status, PostStatus::Completed);
        assert_eq!(new.comment_count, 2);
        assert_eq!(new.text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_parse_remove_record() {
        let event = serde_json::json!({
            "Records": [{
                "eventName": "REMOVE",
                "dynamodb": { "OldImage": post_image("COMPLETED", "1") }
            }]
        });
        let records = parse_stream_event(event.to_string().as_bytes()).unwrap();
        assert_eq!(records[0].kind(), ChangeKind::Remove);
        assert_eq!(records[0].key(), "pid");
    }

    #[test]
    fn test_unknown_items_are_dropped() {
        let event = serde_json::json!({
            "Records": [{
                "eventName": "INSERT",
                "dynamodb": {
                    "NewImage": {
                        "entityType": { "S": "ChatMessage" },
                        "messageId": { "S": "mid" }
                    }
                }
            }]
        });
        assert!(parse_stream_event(event.to_string().as_bytes())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_typed_values() {
        let value = typed_to_json(serde_json::json!({
            "M": {
                "itemType": { "S": "POST" },
                "tags": { "L": [{ "N": "1" }, { "NULL": true }] }
            }
        }))
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "itemType": "POST", "tags": [1, null] })
        );
        assert!(typed_to_json(serde_json::json!({ "N": "x" })).is_err());
        assert!(typed_to_json(serde_json::json!("bare")).is_err());
    }

    #[test]
    fn test_malformed_event() {
        assert!(matches!(
            parse_stream_event(b"not json"),
            Err(RepositoryError::Serialization(_))
        ));
    }
}
