use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::{SystemTime, UNIX_EPOCH};

/// A cached value together with its expiry and access bookkeeping.
///
/// Timestamps are Unix epoch milliseconds. The value is an opaque byte
/// payload; on disk it is stored base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(serialize_with = "encode_value", deserialize_with = "decode_value")]
    pub value: Vec<u8>,
    pub expires_at: u64,
    pub created_at: u64,
    pub access_count: u64,
    pub last_accessed_at: u64,
}

impl CacheEntry {
    /// Create a fresh entry expiring `ttl_secs` from `now`
    pub fn new(value: Vec<u8>, ttl_secs: u64, now: u64) -> Self {
        Self {
            value,
            expires_at: expiry_from(now, ttl_secs),
            created_at: now,
            access_count: 0,
            last_accessed_at: now,
        }
    }

    /// An entry is logically absent once its expiry is at or before `now`
    #[inline]
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at <= now
    }

    /// Replace value and expiry, keeping creation time and access count
    pub fn refresh(&mut self, value: Vec<u8>, ttl_secs: u64, now: u64) {
        self.value = value;
        self.expires_at = expiry_from(now, ttl_secs);
        self.last_accessed_at = now;
    }

    /// Record a read
    pub fn touch(&mut self, now: u64) {
        self.access_count += 1;
        self.last_accessed_at = now;
    }
}

fn expiry_from(now: u64, ttl_secs: u64) -> u64 {
    now.saturating_add(ttl_secs.saturating_mul(1000))
}

/// Current Unix timestamp in milliseconds
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn encode_value<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&general_purpose::STANDARD.encode(value))
}

fn decode_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}
