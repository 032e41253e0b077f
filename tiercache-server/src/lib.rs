pub mod cache;
pub mod compression;
pub mod config;
pub mod core;
pub mod metrics;
pub mod server;

// Re-export commonly used types
pub use cache::{
    CacheConfig, CacheHealth, CacheStats, HealthStatus, KeyPattern, L2CacheConfig, L2DiskCache,
    LruStore, PersistEvent, PersistHook, TierStats, TierStatus, TieredCache,
};
pub use compression::{CompressionConfig, Compressor};
pub use config::ServerConfig;
pub use core::{CacheEntry, CacheError, Result};
pub use metrics::init_metrics;
pub use server::{AppState, create_router, memoize};
