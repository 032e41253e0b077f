//! HTTP response memoization backed by the tiered cache
//!
//! Successful `GET` responses are stored under `http:<caller>:<path?query>`
//! where the caller is taken from the `x-user-id` header. Only bodies with a
//! known size up to [`MAX_MEMOIZED_BODY`] are stored. The stored value is the
//! response `content-type`, a newline, then the body; other headers are not
//! replayed.

use crate::cache::TieredCache;
use crate::metrics;
use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

pub const CALLER_HEADER: &str = "x-user-id";
pub const CACHE_STATUS_HEADER: &str = "x-cache";
pub const MAX_MEMOIZED_BODY: u64 = 1024 * 1024;
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Cache key for a request
pub fn memo_key(req: &Request) -> String {
    let caller = req
        .headers()
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("anonymous");
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    format!("http:{}:{}", caller, path)
}

fn encode_memo(content_type: &HeaderValue, body: &[u8]) -> Vec<u8> {
    let mut value = Vec::with_capacity(content_type.len() + 1 + body.len());
    value.extend_from_slice(content_type.as_bytes());
    value.push(b'\n');
    value.extend_from_slice(body);
    value
}

/// Header values cannot contain a newline, so the first one ends the header
fn decode_memo(mut value: Vec<u8>) -> Option<(HeaderValue, Vec<u8>)> {
    let split = value.iter().position(|&b| b == b'\n')?;
    let body = value.split_off(split + 1);
    value.truncate(split);
    let content_type = HeaderValue::from_bytes(&value).ok()?;
    Some((content_type, body))
}

/// Middleware serving memoized responses for read-only routes
pub async fn memoize(
    State(cache): State<Arc<TieredCache>>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let key = memo_key(&req);
    if let Some((content_type, body)) = cache.get(&key).and_then(decode_memo) {
        metrics::record_memoize("hit");
        debug!("Memoized response HIT: {}", key);
        return (
            [
                (header::CONTENT_TYPE, content_type),
                (
                    header::HeaderName::from_static(CACHE_STATUS_HEADER),
                    HeaderValue::from_static("HIT"),
                ),
            ],
            body,
        )
            .into_response();
    }

    let response = next.run(req).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let cacheable = response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|size| size <= MAX_MEMOIZED_BODY);
    if !cacheable {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_MEMOIZED_BODY as usize).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to buffer response for {}: {}", key, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    cache.set(
        &key,
        encode_memo(&content_type, &bytes),
        Some(cache.config().memoize_ttl_secs),
    );
    metrics::record_memoize("miss");
    parts.headers.insert(
        header::HeaderName::from_static(CACHE_STATUS_HEADER),
        HeaderValue::from_static("MISS"),
    );

    Response::from_parts(parts, Body::from(bytes))
}
