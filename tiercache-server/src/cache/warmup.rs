//! Cache warming: seeds a fixed set of system keys

use chrono::Utc;
use serde_json::json;
use tracing::info;

use super::tiered::TieredCache;

pub const WARM_VERSION_KEY: &str = "system:version";
pub const WARM_STARTED_AT_KEY: &str = "system:started_at";
pub const WARM_CONFIG_KEY: &str = "system:cache_config";

/// Seed the warm set and return the keys written
pub fn warm(cache: &TieredCache) -> Vec<String> {
    let config = cache.config();
    let config_summary = json!({
        "l1_max_entries": config.l1_max_entries,
        "default_ttl_secs": config.default_ttl_secs,
        "l2_enabled": config.l2.enabled,
        "l2_max_entries": config.l2.max_entries,
        "compression": config.l2.compression,
    });

    let seeds = [
        (WARM_VERSION_KEY, env!("CARGO_PKG_VERSION").as_bytes().to_vec()),
        (WARM_STARTED_AT_KEY, Utc::now().to_rfc3339().into_bytes()),
        (WARM_CONFIG_KEY, config_summary.to_string().into_bytes()),
    ];

    let mut warmed = Vec::with_capacity(seeds.len());
    for (key, value) in seeds {
        cache.set(key, value, None);
        warmed.push(key.to_string());
    }

    info!("Cache warmed with {} keys", warmed.len());
    warmed
}
