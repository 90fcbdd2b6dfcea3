//! Partial review representation carried by change events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::review::{Review, ReviewStatus, Tag};

/// A review in which every field except `id` may be absent.
///
/// Absent fields are omitted when serialized, so the JSON body of a partial
/// update only touches the fields the source actually changed. A fully
/// populated value is equivalent to a [`Review`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReviewFields {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReviewStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<DateTime<Utc>>,
}

impl ReviewFields {
    /// Create an empty field set for the given review id.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// The document id used in the search index.
    pub fn document_id(&self) -> String {
        self.id.to_string()
    }

}

impl From<Review> for ReviewFields {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            user_id: Some(review.user_id),
            score: Some(review.score),
            content: Some(review.content),
            tags: Some(review.tags),
            status: Some(review.status),
            publish_time: Some(review.publish_time),
        }
    }
}
