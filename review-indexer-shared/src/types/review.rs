//! Review entity types.
//!
//! This module defines the review as it exists in the source-of-truth database.
//! The same shape is used as the document body in the search index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A lightweight tag attached to a review.
///
/// Tag ids are not guaranteed to be unique within a review; duplicates are kept
/// exactly as the source sends them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

impl Tag {
    /// Create a new tag.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Moderation status of a review.
///
/// Serialized as its numeric code, matching the source database column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum ReviewStatus {
    /// Awaiting moderation.
    Pending,
    /// Visible to readers.
    Published,
    /// Hidden by moderation or by the author.
    Hidden,
}

impl ReviewStatus {
    /// The numeric code stored in the database and the index.
    pub fn code(self) -> u8 {
        match self {
            Self::Pending => 1,
            Self::Published => 2,
            Self::Hidden => 3,
        }
    }
}

impl TryFrom<u8> for ReviewStatus {
    type Error = UnknownStatus;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Pending),
            2 => Ok(Self::Published),
            3 => Ok(Self::Hidden),
            other => Err(UnknownStatus(other)),
        }
    }
}

impl From<ReviewStatus> for u8 {
    fn from(status: ReviewStatus) -> Self {
        status.code()
    }
}

/// Error returned when a status code does not map to a [`ReviewStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown review status code {0}")]
pub struct UnknownStatus(pub u8);

/// A review as stored in the source database.
///
/// # Fields
///
/// - `id`: Stable primary key; also used as the search index document id
/// - `user_id`: Author of the review
/// - `score`: Integer rating
/// - `content`: Review text
/// - `tags`: Ordered tags, duplicates allowed
/// - `status`: Moderation status
/// - `publish_time`: When the review was published
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub score: i32,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub status: ReviewStatus,
    pub publish_time: DateTime<Utc>,
}
