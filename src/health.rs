//! `GET /health` endpoint handler.
//!
//! Returns a [`HealthResponse`] JSON payload containing the server
//! version, uptime, config source metadata, the shape of the running
//! gateway (interceptor order, identity, request-id and CORS policy,
//! limits), and cumulative request statistics.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub commit: String,
    pub uptime_seconds: u64,
    pub config: ConfigHealth,
    pub gateway: GatewayHealth,
    pub stats: StatsResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigHealth {
    pub source: String,
    pub version: String,
    pub loaded_ago_seconds: u64,
    pub routes: usize,
    #[serde(default)]
    pub reloads: u64,
}

/// What the currently loaded gateway does to each request.
#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayHealth {
    pub identity: String,
    /// Interceptor names, outermost first.
    pub interceptors: Vec<String>,
    pub trust_request_id: bool,
    pub cors: bool,
    pub max_body_bytes: usize,
    pub default_timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub requests_forwarded: u64,
    pub requests_failed: u64,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (config, gateway) = {
        let loaded = state.config.read().await;
        let settings = &loaded.config.gateway;
        let config = ConfigHealth {
            source: loaded.source_name.clone(),
            version: loaded.version.short().to_string(),
            loaded_ago_seconds: loaded.loaded_at.elapsed().as_secs(),
            routes: loaded.config.routes.len(),
            reloads: state.stats.config_reloads.load(Ordering::Relaxed),
        };
        let gateway = GatewayHealth {
            identity: settings.identity.clone(),
            interceptors: loaded
                .gateway
                .pipeline()
                .names()
                .into_iter()
                .map(String::from)
                .collect(),
            trust_request_id: settings.trust_request_id,
            cors: settings.cors.enabled,
            max_body_bytes: loaded.config.defaults.max_body,
            default_timeout_ms: loaded.config.defaults.timeout,
        };
        (config, gateway)
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("TOLLGATE_GIT_SHORT").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        config,
        gateway,
        stats: StatsResponse {
            requests_forwarded: state.stats.forwarded.load(Ordering::Relaxed),
            requests_failed: state.stats.failed.load(Ordering::Relaxed),
        },
    })
}
