//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::net::IpAddr;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::{Cacher, TtlCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::limiter::KeyedRateLimiter;
use crate::models::{
    validate_key, DeleteResponse, GetResponse, HealthResponse, SetIfAbsentResponse, SetRequest,
    SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// Both members are handles over shared, internally synchronized storage,
/// so cloning the state is cheap and needs no outer lock.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Response cache
    pub cache: TtlCache,
    /// Per-client admission control
    pub limiter: KeyedRateLimiter<IpAddr>,
}

impl AppState {
    /// Creates a new AppState from its parts.
    pub fn new(cache: TtlCache, limiter: KeyedRateLimiter<IpAddr>) -> Self {
        Self { cache, limiter }
    }

    /// Creates a new AppState from configuration.
    ///
    /// When a sweep interval is configured, both stores get a background
    /// sweeper, so this must run inside a Tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut cache = TtlCache::new(config.cache_ttl());
        let mut limiter = KeyedRateLimiter::new(
            config.rate_limit_per_second,
            config.rate_limit_burst,
            config.limiter_idle_ttl(),
        );

        if let Some(period) = config.sweep_interval() {
            cache = cache.with_sweep_interval(period)?;
            limiter = limiter.with_sweep_interval(period)?;
        }

        Ok(Self::new(cache, limiter))
    }
}

fn checked_key(key: String) -> Result<String> {
    match validate_key(&key) {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(key),
    }
}

/// Handler for PUT /cache/:key
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let key = checked_key(key)?;
    state.cache.set(&key, req.value);

    Ok(Json(SetResponse::new(key)))
}

/// Handler for POST /cache/:key/nx
pub async fn set_if_absent_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetIfAbsentResponse>> {
    let key = checked_key(key)?;
    let stored = state.cache.set_if_absent(&key, req.value);

    Ok(Json(SetIfAbsentResponse::new(key, stored)))
}

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let key = checked_key(key)?;
    let value: Value = state.cache.get(&key)?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let key = checked_key(key)?;
    state.cache.delete(&key);

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();

    Json(StatsResponse::new(&stats, state.limiter.len()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn test_state() -> AppState {
        AppState::new(
            TtlCache::new(Duration::from_secs(300)),
            KeyedRateLimiter::new(100, 100, Duration::from_secs(60)),
        )
    }

    fn body(value: Value) -> Json<SetRequest> {
        Json(SetRequest { value })
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let result = set_handler(
            State(state.clone()),
            Path("test_key".to_string()),
            body(json!({"a": 1})),
        )
        .await;
        assert!(result.is_ok());

        let response = get_handler(State(state), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_if_absent_handler() {
        let state = test_state();

        let first = set_if_absent_handler(
            State(state.clone()),
            Path("k".to_string()),
            body(json!("v1")),
        )
        .await
        .unwrap();
        let second = set_if_absent_handler(
            State(state.clone()),
            Path("k".to_string()),
            body(json!("v2")),
        )
        .await
        .unwrap();

        assert!(first.stored);
        assert!(!second.stored);

        let response = get_handler(State(state), Path("k".to_string())).await.unwrap();
        assert_eq!(response.value, json!("v1"));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state();

        set_handler(State(state.clone()), Path("to_delete".to_string()), body(json!(1)))
            .await
            .unwrap();

        let result = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(result.is_ok());

        let result = get_handler(State(state), Path("to_delete".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        let _ = get_handler(State(state.clone()), Path("missing".to_string())).await;

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 1);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_set_invalid_key() {
        let state = test_state();

        let result = set_handler(State(state.clone()), Path("x".repeat(300)), body(json!(1))).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));

        let result = get_handler(State(state.clone()), Path("x".repeat(300))).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));

        let result = delete_handler(State(state), Path(String::new())).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_from_config_with_sweep() {
        let state = AppState::from_config(&Config::default()).unwrap();

        assert_eq!(state.cache.ttl(), Duration::from_secs(300));
        assert_eq!(state.limiter.idle_ttl(), Duration::from_secs(180));
    }
}
