//! Change event decoder implementation.
//!
//! Parses the JSON change record envelope published by the upstream
//! change-data-capture producer:
//!
//! ```json
//! { "version": 1, "op": "update", "id": 1, "data": { "content": "...", "tags": [] } }
//! ```
//!
//! The operation always comes from the explicit `op` marker. It is never
//! inferred from which fields are present, so "set to empty" and "not
//! changed" stay distinguishable.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::consumer::{ChangeEvent, LogRecord, Operation, SourceOffset};
use crate::errors::DecodeError;
use review_indexer_shared::ReviewFields;

/// The change record envelope version this decoder understands.
pub const CHANGE_RECORD_VERSION: u32 = 1;

/// The change record envelope, before the payload is interpreted.
#[derive(Debug, Deserialize)]
struct ChangeRecord {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    op: Option<String>,
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    data: Option<Value>,
}

/// Decoder that turns raw log records into change events.
///
/// Decoding is a pure function of the record bytes: the decoder holds no
/// state and has no side effects.
#[derive(Debug, Clone, Default)]
pub struct ChangeEventDecoder {}

impl ChangeEventDecoder {
    /// Create a new change event decoder.
    pub fn new() -> Self {
        Self {}
    }

    /// Decode a record read from the log.
    pub fn decode_record(&self, record: &LogRecord) -> Result<ChangeEvent, DecodeError> {
        self.decode(record.key.as_deref(), record.value.as_deref(), record.source())
    }

    /// Decode raw key and value bytes into a change event.
    ///
    /// # Arguments
    ///
    /// * `key` - The record key; when it is a decimal integer it must match the review id
    /// * `value` - The JSON change record
    /// * `source` - Where the record was read from
    ///
    /// # Returns
    ///
    /// * `Ok(ChangeEvent)` - The decoded event
    /// * `Err(DecodeError)` - If the record is malformed or its operation is unsupported
    #[instrument(skip(self, key, value, source), fields(source = %source))]
    pub fn decode(
        &self,
        key: Option<&[u8]>,
        value: Option<&[u8]>,
        source: SourceOffset,
    ) -> Result<ChangeEvent, DecodeError> {
        let value = match value {
            Some(v) if !v.is_empty() => v,
            _ => return Err(DecodeError::malformed("Record has an empty payload")),
        };

        let record: ChangeRecord = serde_json::from_slice(value)
            .map_err(|e| DecodeError::malformed(format!("Invalid change record: {}", e)))?;

        let version = record.version.unwrap_or(CHANGE_RECORD_VERSION);
        if version != CHANGE_RECORD_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }

        let marker = record.op.as_deref().ok_or(DecodeError::MissingField("op"))?;
        let operation = parse_operation(marker)?;
        let key_id = parse_key(key);

        match operation {
            Operation::Delete => {
                let data_id = match &record.data {
                    Some(Value::Object(object)) => data_id(object)?,
                    _ => None,
                };
                let review_id = resolve_review_id(record.id, data_id, key_id)?;
                Ok(ChangeEvent::delete(review_id, source))
            }
            Operation::Create | Operation::Update => {
                let mut object = match record.data {
                    Some(Value::Object(object)) => object,
                    Some(_) => return Err(DecodeError::malformed("'data' must be an object")),
                    None => return Err(DecodeError::MissingField("data")),
                };
                let review_id = resolve_review_id(record.id, data_id(&object)?, key_id)?;
                object.insert("id".to_string(), Value::from(review_id));

                let fields: ReviewFields = serde_json::from_value(Value::Object(object))
                    .map_err(|e| DecodeError::malformed(format!("Invalid review data: {}", e)))?;

                Ok(ChangeEvent::with_fields(operation, fields, source))
            }
        }
    }

    /// Best-effort review id for a record that may not decode.
    ///
    /// Used to attach the review id to dead-letter logs.
    pub fn review_id_hint(&self, record: &LogRecord) -> Option<i64> {
        if let Some(id) = parse_key(record.key.as_deref()) {
            return Some(id);
        }
        let value: Value = serde_json::from_slice(record.value.as_deref()?).ok()?;
        value
            .get("id")
            .and_then(Value::as_i64)
            .or_else(|| value.get("data")?.get("id")?.as_i64())
    }
}

/// Map the `op` marker to an operation.
///
/// Accepts the long names plus the single-letter and SQL spellings used by
/// common CDC producers, case-insensitively.
fn parse_operation(marker: &str) -> Result<Operation, DecodeError> {
    match marker.to_ascii_lowercase().as_str() {
        "create" | "c" | "insert" => Ok(Operation::Create),
        "update" | "u" => Ok(Operation::Update),
        "delete" | "d" => Ok(Operation::Delete),
        _ => Err(DecodeError::UnsupportedOperation(marker.to_string())),
    }
}

/// Parse a record key holding a decimal review id. Other keys are ignored.
fn parse_key(key: Option<&[u8]>) -> Option<i64> {
    std::str::from_utf8(key?).ok()?.trim().parse().ok()
}

fn data_id(object: &Map<String, Value>) -> Result<Option<i64>, DecodeError> {
    match object.get("id") {
        None | Some(Value::Null) => Ok(None),
        Some(id) => id
            .as_i64()
            .map(Some)
            .ok_or_else(|| DecodeError::malformed("'data.id' must be an integer")),
    }
}

/// Pick the review id from the envelope, the payload, and the key, which must all agree.
fn resolve_review_id(
    envelope_id: Option<i64>,
    data_id: Option<i64>,
    key_id: Option<i64>,
) -> Result<i64, DecodeError> {
    let review_id = match (envelope_id, data_id) {
        (Some(a), Some(b)) if a != b => {
            return Err(DecodeError::malformed(format!(
                "Envelope id {} does not match data id {}",
                a, b
            )))
        }
        (Some(id), _) | (None, Some(id)) => id,
        (None, None) => key_id.ok_or(DecodeError::MissingField("id"))?,
    };

    match key_id {
        Some(key) if key != review_id => Err(DecodeError::KeyMismatch { key, review_id }),
        _ => Ok(review_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use review_indexer_shared::{ReviewStatus, Tag};

    fn source() -> SourceOffset {
        SourceOffset::new("review.changes", 0, 7)
    }

    fn decode(key: Option<&str>, value: &str) -> Result<ChangeEvent, DecodeError> {
        ChangeEventDecoder::new().decode(key.map(str::as_bytes), Some(value.as_bytes()), source())
    }

    #[test]
    fn test_decode_create() {
        let event = decode(
            Some("1"),
            r#"{"version":1,"op":"create","id":1,"data":{
                "user_id":147982601,"score":5,"content":"这是一个好评！",
                "tags":[{"id":1000,"name":"好评"},{"id":9000,"name":"有图"}],
                "status":2,"publish_time":"2024-05-01T12:00:00Z"}}"#,
        )
        .unwrap();

        assert_eq!(event.operation, Operation::Create);
        assert_eq!(event.key, 1);
        assert_eq!(event.source, source());

        let fields = event.payload.unwrap();
        assert_eq!(fields.score, Some(5));
        assert_eq!(fields.content.as_deref(), Some("这是一个好评！"));
        assert_eq!(fields.user_id, Some(147982601));
        assert_eq!(fields.status, Some(ReviewStatus::Published));
        assert_eq!(
            fields.tags,
            Some(vec![Tag::new(1000, "好评"), Tag::new(9000, "有图")])
        );
        assert_eq!(
            fields.publish_time,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_decode_update_keeps_absent_fields_absent() {
        let event = decode(None, r#"{"op":"update","id":1,"data":{"content":"修改后的好评"}}"#)
            .unwrap();

        assert_eq!(event.operation, Operation::Update);
        let fields = event.payload.unwrap();
        assert_eq!(fields.content.as_deref(), Some("修改后的好评"));
        assert!(fields.score.is_none());
        assert!(fields.tags.is_none());
    }

    #[test]
    fn test_decode_update_with_empty_values() {
        let event = decode(None, r#"{"op":"u","id":3,"data":{"content":"","tags":[]}}"#).unwrap();

        let fields = event.payload.unwrap();
        assert_eq!(fields.content.as_deref(), Some(""));
        assert_eq!(fields.tags, Some(vec![]));
    }

    #[test]
    fn test_decode_delete_without_data() {
        let event = decode(Some("9"), r#"{"op":"delete","id":9}"#).unwrap();

        assert_eq!(event.operation, Operation::Delete);
        assert_eq!(event.key, 9);
        assert!(event.payload.is_none());
    }

    #[test]
    fn test_decode_delete_id_from_key() {
        let event = decode(Some("12"), r#"{"op":"d"}"#).unwrap();
        assert_eq!(event.key, 12);
    }

    #[test]
    fn test_id_from_data() {
        let event = decode(None, r#"{"op":"INSERT","data":{"id":4,"score":1}}"#).unwrap();
        assert_eq!(event.operation, Operation::Create);
        assert_eq!(event.key, 4);
    }

    #[test]
    fn test_operation_is_never_inferred() {
        let result = decode(None, r#"{"id":1,"data":{"score":5}}"#);
        assert_eq!(result, Err(DecodeError::MissingField("op")));
    }

    #[test]
    fn test_unsupported_operation() {
        let result = decode(None, r#"{"op":"truncate","id":1}"#);
        assert_eq!(
            result,
            Err(DecodeError::UnsupportedOperation("truncate".to_string()))
        );
    }

    #[test]
    fn test_unsupported_version() {
        let result = decode(None, r#"{"version":2,"op":"create","id":1,"data":{}}"#);
        assert_eq!(result, Err(DecodeError::UnsupportedVersion(2)));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(decode(None, "not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(
            decode(None, r#"{"op":"create","id":1,"data":[1,2]}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode(None, r#"{"op":"update","id":1,"data":{"score":"five"}}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode(None, r#"{"op":"update","id":1,"data":{"status":42}}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode(None, r#"{"op":"update","id":1,"data":{"id":2}}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_payload() {
        let decoder = ChangeEventDecoder::new();
        assert!(matches!(
            decoder.decode(Some(b"1"), None, source()),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decoder.decode(Some(b"1"), Some(b""), source()),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_data_and_id() {
        assert_eq!(
            decode(None, r#"{"op":"create","id":1}"#),
            Err(DecodeError::MissingField("data"))
        );
        assert_eq!(
            decode(None, r#"{"op":"update","data":{"score":1}}"#),
            Err(DecodeError::MissingField("id"))
        );
    }

    #[test]
    fn test_key_mismatch() {
        let result = decode(Some("2"), r#"{"op":"delete","id":1}"#);
        assert_eq!(result, Err(DecodeError::KeyMismatch { key: 2, review_id: 1 }));
    }

    #[test]
    fn test_non_numeric_key_is_ignored() {
        let event = decode(Some(r#"{"id":1}"#), r#"{"op":"delete","id":1}"#).unwrap();
        assert_eq!(event.key, 1);
    }

    #[test]
    fn test_review_id_hint() {
        let decoder = ChangeEventDecoder::new();
        let mut record = LogRecord {
            topic: "review.changes".to_string(),
            partition: 0,
            offset: 1,
            key: None,
            value: Some(br#"{"op":"explode","id":77}"#.to_vec()),
        };
        assert_eq!(decoder.review_id_hint(&record), Some(77));

        record.value = Some(br#"{"op":"explode","data":{"id":78}}"#.to_vec());
        assert_eq!(decoder.review_id_hint(&record), Some(78));

        record.key = Some(b"79".to_vec());
        assert_eq!(decoder.review_id_hint(&record), Some(79));

        record.key = None;
        record.value = Some(b"garbage".to_vec());
        assert_eq!(decoder.review_id_hint(&record), None);
    }
}
