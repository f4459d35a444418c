//! Cached GitHub response entries and their wire decoding.
//!
//! Entries have been written in a few historical shapes: the current
//! `{data, etag, expiresAt, timestamp}` object, a pre-cutover legacy wrapper
//! `{data, timestamp, ttlSeconds}`, and occasionally a double-encoded JSON
//! string of either. Decoding tries the known shapes in a fixed priority
//! order and any unreadable payload degrades to a miss instead of an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// TTL applied to legacy entries that carry a `timestamp` but no `expiresAt`.
const LEGACY_TTL_SECONDS: u64 = 600;

/// One cached upstream response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The upstream response body, kept as raw JSON.
    pub data: Value,
    /// Upstream validator for `If-None-Match` conditional requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Absolute expiry, pinned to the next 18:00 local boundary at write time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Write/refresh instant. Accepts RFC 3339 or epoch milliseconds on read.
    #[serde(default, deserialize_with = "flexible_timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Legacy duration-based TTL, only meaningful when `expires_at` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
}

impl CacheEntry {
    /// Decode a raw store payload, normalizing all known historical shapes.
    /// Returns `None` for anything unparseable.
    pub fn decode(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        Self::from_value(value)
    }

    /// Shape priority: a JSON string is assumed double-encoded and re-parsed;
    /// an object with a `data` field is an entry (current or legacy wrapper);
    /// anything else is a bare payload with no validity metadata.
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(inner) => serde_json::from_str(&inner)
                .ok()
                .and_then(Self::from_value),
            Value::Object(ref fields) if fields.contains_key("data") => {
                serde_json::from_value(value).ok()
            }
            other => Some(CacheEntry {
                data: other,
                etag: None,
                expires_at: None,
                timestamp: None,
                ttl_seconds: None,
            }),
        }
    }

    /// Whether the entry is still servable at `now`.
    ///
    /// The validity window is closed-open: an entry expiring exactly at `now`
    /// is already stale. Entries without `expires_at` fall back to the legacy
    /// `timestamp + ttlSeconds` rule; entries with neither are always stale.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if let Some(expires_at) = self.expires_at {
            return now < expires_at;
        }
        if let Some(timestamp) = self.timestamp {
            let ttl = self.ttl_seconds.unwrap_or(LEGACY_TTL_SECONDS);
            // A ttlSeconds large enough to overflow the date math is not a
            // plausible window, treat the entry as stale rather than panic.
            return chrono::TimeDelta::try_seconds(ttl as i64)
                .and_then(|ttl| timestamp.checked_add_signed(ttl))
                .is_some_and(|expires_at| now < expires_at);
        }
        false
    }
}

/// Deserialize a timestamp that may be an RFC 3339 string or epoch millis.
fn flexible_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| match raw {
        Raw::Millis(ms) => DateTime::from_timestamp_millis(ms),
        Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
            .ok()
            .map(|dt| dt.to_utc()),
    }))
}
