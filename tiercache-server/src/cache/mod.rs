//! Cache Module
//!
//! Two caching tiers behind one facade:
//! - L1: bounded in-memory LRU
//! - L2: larger in-memory index mirrored to disk by a write-behind task
//! - Stats/health derived from both tiers' counters

pub mod l2_disk;
pub mod lru;
pub mod pattern;
pub mod persister;
pub mod stats;
pub mod tiered;
pub mod warmup;

pub use l2_disk::{L2CacheConfig, L2DiskCache};
pub use lru::LruStore;
pub use pattern::KeyPattern;
pub use persister::{PersistEvent, PersistHook};
pub use stats::{CacheHealth, CacheStats, HealthStatus, OverallStats, TierStats, TierStatus};
pub use tiered::{CacheConfig, TieredCache};
pub use warmup::warm;
