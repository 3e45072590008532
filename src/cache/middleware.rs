//! Page cache middleware.
//!
//! Serves stored responses for `GET`/`HEAD` requests and stores fresh
//! `200 OK` responses that do not set cookies.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use metrics::counter;
use tracing::{debug, instrument};

use super::{
    PAGE_CACHE_HIT_TOTAL, PAGE_CACHE_MISS_TOTAL, PAGE_CACHE_STORE_TOTAL,
    config::CacheConfig,
    keys::PageKey,
    store::{CachedResponse, PageCache},
};
use crate::application::error::HttpError;

const SOURCE: &str = "cache::middleware::page_cache_layer";

/// Shared cache state for the middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<PageCache>,
}

impl CacheState {
    pub fn new(config: CacheConfig) -> Self {
        let store = Arc::new(PageCache::new(&config));
        Self { config, store }
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled {
        return next.run(request).await;
    }

    let method = request.method().clone();
    if method != Method::GET && method != Method::HEAD {
        return next.run(request).await;
    }

    let key = PageKey::new(&cache.config.key_prefix, request.uri().path());

    if let Some(cached) = cache.store.get(&key) {
        counter!(PAGE_CACHE_HIT_TOTAL).increment(1);
        debug!(cache = "page", outcome = "hit", key = %key, "serving cached response");
        return build_response(cached, method == Method::HEAD);
    }

    counter!(PAGE_CACHE_MISS_TOTAL).increment(1);
    debug!(cache = "page", outcome = "miss", key = %key, "cache miss, executing handler");

    let response = next.run(request).await;

    // HEAD bodies are empty and must not shadow the GET entry.
    if method != Method::GET
        || response.status() != StatusCode::OK
        || response.headers().contains_key(header::SET_COOKIE)
    {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            return HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                format!("failed to buffer response body: {err}"),
            )
            .into_response();
        }
    };

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };

    debug!(cache = "page", key = %key, bytes = bytes.len(), "caching response");
    cache.store.insert(key, cached);
    counter!(PAGE_CACHE_STORE_TOTAL).increment(1);

    Response::from_parts(parts, Body::from(bytes))
}

/// Build a response from cached data.
fn build_response(cached: CachedResponse, head_only: bool) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    let body = if head_only {
        Body::empty()
    } else {
        Body::from(cached.body)
    };

    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
