use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};

use crate::api::client::ApiError;

pub type NotificationId = i64;

/// Semantic type of a notification, drives navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationCategory {
    Follow,
    Like,
    Comment,
    Match,
    Diary,
    Recap,
    Coin,
    /// Anything the server sends that this client does not know about yet
    Unknown(String),
}

impl NotificationCategory {
    pub fn from_str(category: &str) -> Self {
        match category.trim().to_uppercase().as_str() {
            "FOLLOW" => NotificationCategory::Follow,
            "LIKE" => NotificationCategory::Like,
            "COMMENT" => NotificationCategory::Comment,
            "MATCH" => NotificationCategory::Match,
            "DIARY" => NotificationCategory::Diary,
            "RECAP" => NotificationCategory::Recap,
            "COIN" => NotificationCategory::Coin,
            _ => NotificationCategory::Unknown(category.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NotificationCategory::Follow => "FOLLOW",
            NotificationCategory::Like => "LIKE",
            NotificationCategory::Comment => "COMMENT",
            NotificationCategory::Match => "MATCH",
            NotificationCategory::Diary => "DIARY",
            NotificationCategory::Recap => "RECAP",
            NotificationCategory::Coin => "COIN",
            NotificationCategory::Unknown(other) => other,
        }
    }
}

impl Default for NotificationCategory {
    fn default() -> Self {
        NotificationCategory::Unknown(String::new())
    }
}

impl<'de> Deserialize<'de> for NotificationCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .map(|category| NotificationCategory::from_str(&category))
            .unwrap_or_default())
    }
}

/// Opaque navigation reference; a user id, feed id, ... depending on category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetId(pub String);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for TargetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawTarget {
            Text(String),
            Number(i64),
        }

        Ok(match RawTarget::deserialize(deserializer)? {
            RawTarget::Text(text) => TargetId(text),
            RawTarget::Number(number) => TargetId(number.to_string()),
        })
    }
}

/// Notification exactly as the API returns it.
///
/// The read flag shows up as either `read` or `isRead` depending on the
/// endpoint version; both are kept here and folded together in
/// [`Notification::from`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: NotificationId,
    #[serde(rename = "type", alias = "category", default)]
    pub category: NotificationCategory,
    #[serde(default)]
    pub target_id: Option<TargetId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "content")]
    pub body: Option<String>,
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub is_read: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationListResponse {
    #[serde(default)]
    pub notifications: Vec<NotificationRecord>,
}

/// Normalized notification held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub category: NotificationCategory,
    pub target_id: Option<TargetId>,
    pub title: String,
    pub body: String,
    /// Server-reported read flag
    pub read: bool,
    /// Server wall clock, before the display offset is applied
    pub created_at: Option<NaiveDateTime>,
}

impl From<NotificationRecord> for Notification {
    fn from(record: NotificationRecord) -> Self {
        // Either spelling counts; a record never reads as unread if one says read.
        let read = record.read.unwrap_or(false) || record.is_read.unwrap_or(false);

        Notification {
            id: record.id,
            category: record.category,
            target_id: record.target_id,
            title: record.title.unwrap_or_default(),
            body: record.body.unwrap_or_default(),
            read,
            created_at: record.created_at.as_deref().and_then(parse_server_timestamp),
        }
    }
}

impl NotificationListResponse {
    pub fn into_notifications(self) -> Vec<Notification> {
        self.notifications.into_iter().map(Notification::from).collect()
    }
}

const SERVER_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

// Naive strings are the documented format. RFC 3339 is accepted for robustness
// and reduced to its UTC wall clock.
fn parse_server_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    SERVER_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|timestamp| timestamp.naive_utc())
        })
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("API error: {0}")]
    ApiError(#[from] ApiError),

    #[error("Notification {0} is not in the current view")]
    NotFound(NotificationId),
}
