use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PinTag {
    Ally,
    Enemy,
    General,
}

impl PinTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinTag::Ally => "Ally",
            PinTag::Enemy => "Enemy",
            PinTag::General => "General",
        }
    }
}

/// A point annotation on one map surface. Immutable once created; it leaves
/// the shared store through the expiry sweep or an explicit removal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub id: String,
    pub map_id: String,
    pub x_ratio: f64,
    pub y_ratio: f64,
    pub tag: PinTag,
    /// Client-assigned creation time, stored as epoch milliseconds. Expiry is
    /// always evaluated against the sweeping client's own clock.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Pin {
    pub fn new(x_ratio: f64, y_ratio: f64, tag: PinTag, map_id: &str) -> Self {
        let created_at = Utc::now();
        Self {
            id: new_pin_id(created_at),
            map_id: map_id.to_string(),
            x_ratio,
            y_ratio,
            tag,
            created_at,
        }
    }

    /// A pin is live while strictly younger than `max_duration`.
    pub fn is_live(&self, now: DateTime<Utc>, max_duration: Duration) -> bool {
        match chrono::Duration::from_std(max_duration) {
            Ok(max) => now.signed_duration_since(self.created_at) < max,
            // A max_duration beyond chrono's range never expires anything.
            Err(_) => true,
        }
    }
}

/// The creation-time prefix keeps ids sortable by age; the random suffix keeps
/// two additions in the same millisecond (same client or not) distinct.
pub fn new_pin_id(created_at: DateTime<Utc>) -> String {
    format!(
        "{}-{:08x}",
        created_at.timestamp_millis(),
        rand::random::<u32>()
    )
}
