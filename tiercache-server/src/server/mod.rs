pub mod admin_auth;
pub mod handlers;
pub mod memoize;
pub mod metrics_handler;
pub mod router;

pub use handlers::AppState;
pub use memoize::memoize;
pub use router::create_router;
