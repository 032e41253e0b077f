//! Admin guard for cache management routes

use super::handlers::AppState;
use crate::core::CacheError;
use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use tracing::debug;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Reject requests without the configured admin token. With no token
/// configured every request passes.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, CacheError> {
    if let Some(expected) = &state.admin_token {
        let provided = req
            .headers()
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());

        let authorized = provided.is_some_and(|p| tokens_match(p.as_bytes(), expected.as_bytes()));
        if !authorized {
            debug!("Admin token missing or invalid for {}", req.uri().path());
            return Err(CacheError::Unauthorized);
        }
    }

    Ok(next.run(req).await)
}

/// Compare without short-circuiting on the first differing byte
fn tokens_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match(b"s3cret", b"s3cret"));
        assert!(!tokens_match(b"s3cres", b"s3cret"));
        assert!(!tokens_match(b"s3cre", b"s3cret"));
        assert!(!tokens_match(b"", b"s3cret"));
    }
}
