//! Cache statistics and health diagnostics

use serde::{Deserialize, Serialize};

/// Heuristic per-entry footprint used for the memory estimate
pub const ESTIMATED_ENTRY_BYTES: u64 = 1024;

/// Occupancy ratio at which a tier is reported as full
pub const FULL_THRESHOLD: f64 = 0.9;

/// Overall hit rate below which the cache is flagged
pub const LOW_HIT_RATE_THRESHOLD: f64 = 0.5;

/// Minimum number of lookups before the hit rate is judged
pub const MIN_HIT_RATE_SAMPLES: u64 = 100;

/// Counters for a single tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_size: usize,
    pub hit_rate: f64,
}

impl TierStats {
    pub fn new(hits: u64, misses: u64, evictions: u64, size: usize, max_size: usize) -> Self {
        Self {
            hits,
            misses,
            evictions,
            size,
            max_size,
            hit_rate: hit_rate(hits, misses),
        }
    }

    /// Occupancy as a fraction of capacity
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            return 0.0;
        }
        self.size as f64 / self.max_size as f64
    }

    pub fn is_full(&self) -> bool {
        self.max_size > 0 && self.utilization() >= FULL_THRESHOLD
    }
}

/// Aggregate view over both tiers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
    pub total_entries: usize,
    pub memory_usage_bytes: u64,
    pub uptime_secs: u64,
}

/// Full statistics snapshot returned by the cache facade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1: TierStats,
    /// `None` when the persistent tier is disabled
    pub l2: Option<TierStats>,
    pub overall: OverallStats,
}

impl CacheStats {
    pub fn aggregate(l1: TierStats, l2: Option<TierStats>, uptime_secs: u64) -> Self {
        let mut hits = l1.hits;
        let mut misses = l1.misses;
        let mut evictions = l1.evictions;
        let mut total_entries = l1.size;

        if let Some(l2) = &l2 {
            hits += l2.hits;
            misses += l2.misses;
            evictions += l2.evictions;
            total_entries += l2.size;
        }

        let overall = OverallStats {
            hits,
            misses,
            evictions,
            hit_rate: hit_rate(hits, misses),
            total_entries,
            memory_usage_bytes: total_entries as u64 * ESTIMATED_ENTRY_BYTES,
            uptime_secs,
        };

        Self { l1, l2, overall }
    }
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Overall health verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Per-tier occupancy verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierStatus {
    Ok,
    Full,
    Disabled,
}

/// Health report with actionable issues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheHealth {
    pub status: HealthStatus,
    pub l1_status: TierStatus,
    pub l2_status: TierStatus,
    pub hit_rate: f64,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl CacheHealth {
    /// Derive a health verdict from a stats snapshot
    pub fn evaluate(stats: &CacheStats) -> Self {
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        let l1_status = if stats.l1.is_full() {
            issues.push(format!(
                "L1 cache is full ({}/{} entries)",
                stats.l1.size, stats.l1.max_size
            ));
            recommendations.push("Increase l1_max_entries or lower the default TTL".to_string());
            TierStatus::Full
        } else {
            TierStatus::Ok
        };

        let l2_status = match &stats.l2 {
            None => TierStatus::Disabled,
            Some(l2) if l2.is_full() => {
                issues.push(format!(
                    "L2 cache is full ({}/{} entries)",
                    l2.size, l2.max_size
                ));
                recommendations
                    .push("Increase l2.max_entries or invalidate unused key families".to_string());
                TierStatus::Full
            }
            Some(_) => TierStatus::Ok,
        };

        let overall = &stats.overall;
        if overall.hits + overall.misses > MIN_HIT_RATE_SAMPLES
            && overall.hit_rate < LOW_HIT_RATE_THRESHOLD
        {
            issues.push(format!(
                "Low cache hit rate ({:.1}%)",
                overall.hit_rate * 100.0
            ));
            recommendations
                .push("Review cache keys and TTLs, or enable warmup for hot keys".to_string());
        }

        let status = match issues.len() {
            0 => HealthStatus::Healthy,
            1 | 2 => HealthStatus::Degraded,
            _ => HealthStatus::Unhealthy,
        };

        Self {
            status,
            l1_status,
            l2_status,
            hit_rate: overall.hit_rate,
            issues,
            recommendations,
        }
    }
}
