//! OpenSearch index settings and mappings for the review index.

use serde_json::{json, Value};

use crate::config::IndexConfig;

/// Get the index settings, mappings, and alias for a new review index.
///
/// The configuration includes:
/// - **text**: `content` for full-text search, with a `raw` keyword sub-field
/// - **nested**: `tags` so that tag id and name match within the same tag
/// - **numeric/date**: ids, score, status, and publish time for filtering and sorting
///
/// The alias is attached at creation time so the index is never reachable
/// without it.
///
/// # Arguments
///
/// * `config` - The index configuration supplying sharding and the alias name
pub fn get_index_body(config: &IndexConfig) -> Value {
    json!({
        "settings": {
            "number_of_shards": config.number_of_shards,
            "number_of_replicas": config.number_of_replicas
        },
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": {
                    "type": "long"
                },
                "user_id": {
                    "type": "long"
                },
                "score": {
                    "type": "integer"
                },
                "content": {
                    "type": "text",
                    "fields": {
                        "raw": {
                            "type": "keyword",
                            "ignore_above": 256
                        }
                    }
                },
                "tags": {
                    "type": "nested",
                    "properties": {
                        "id": {
                            "type": "long"
                        },
                        "name": {
                            "type": "keyword"
                        }
                    }
                },
                "status": {
                    "type": "byte"
                },
                "publish_time": {
                    "type": "date"
                }
            }
        },
        "aliases": {
            config.alias.as_str(): {}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use review_indexer_shared::{Review, ReviewFields, ReviewStatus, Tag};

    #[test]
    fn test_index_body_structure() {
        let config = IndexConfig::new("reviews", 0).with_sharding(2, 0);
        let body = get_index_body(&config);

        assert_eq!(body["settings"]["number_of_shards"], 2);
        assert_eq!(body["settings"]["number_of_replicas"], 0);
        assert!(body["aliases"]["reviews"].is_object());

        assert_eq!(body["mappings"]["properties"]["content"]["type"], "text");
        assert_eq!(body["mappings"]["properties"]["tags"]["type"], "nested");
        assert_eq!(body["mappings"]["properties"]["publish_time"]["type"], "date");
    }

    #[test]
    fn test_every_review_field_is_mapped() {
        let review = Review {
            id: 1,
            user_id: 2,
            score: 5,
            content: "好评".to_string(),
            tags: vec![Tag::new(9000, "有图")],
            status: ReviewStatus::Published,
            publish_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let document = serde_json::to_value(ReviewFields::from(review)).unwrap();
        let body = get_index_body(&IndexConfig::new("reviews", 0));
        let properties = &body["mappings"]["properties"];

        for key in document.as_object().unwrap().keys() {
            assert!(
                properties[key].is_object(),
                "field '{}' has no mapping",
                key
            );
        }
    }
}
