//! `tollgate run`: start the gateway.
//!
//! Loads the config file, builds the gateway pipeline, starts the Axum
//! HTTP server with graceful shutdown, and spawns a background refresh
//! loop that rebuilds the gateway when the file changes.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::RunArgs;
use crate::config::model::Config;
use crate::config::sources::file_source::FileSource;
use crate::config::{ConfigResolver, ConfigSource};
use crate::error::GatewayError;
use crate::logging;
use crate::server::{self, AppState, LoadedConfig};

const CANDIDATES: [&str; 4] = [
    "tollgate.yaml",
    "tollgate.yml",
    "tollgate.json",
    "tollgate.toml",
];

pub async fn execute(args: RunArgs) -> Result<(), GatewayError> {
    logging::init(
        &args.log_level,
        logging::resolve_format(args.pretty, args.json),
    );

    let resolver = resolve_config_sources(args.config.as_deref()).await?;
    let overrides = Overrides {
        timeout: args.timeout,
        max_body: args.max_body,
    };
    let (mut config, version) = resolver.load_with_fallback().await?;
    overrides.apply(&mut config);

    let route_count = config.routes.len();
    let identity = config.gateway.identity.clone();
    let http_client = server::build_http_client();
    let loaded = LoadedConfig::build(config, version, resolver.primary_name(), &http_client)?;
    let state = Arc::new(AppState::new(loaded, http_client));

    // Flipped on shutdown so the refresh loop stops with the server
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let refresh_state = Arc::clone(&state);
    let poll_interval = args.poll_interval;
    let refresh_handle = tokio::spawn(async move {
        config_refresh_loop(
            refresh_state,
            resolver,
            poll_interval,
            overrides,
            shutdown_rx,
        )
        .await;
    });

    let router = server::build_router(state);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        routes = route_count,
        identity = %identity,
        "tollgate started"
    );

    let graceful_shutdown = async move {
        server::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    };

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(graceful_shutdown)
    .await?;

    if let Err(e) = refresh_handle.await {
        tracing::error!(error = %e, "config refresh task failed");
    }

    tracing::info!("tollgate stopped");
    Ok(())
}

/// Command-line values that win over `defaults`, on startup and on every
/// reload. Zero is ignored for both.
#[derive(Debug, Clone, Copy, Default)]
struct Overrides {
    timeout: Option<u64>,
    max_body: Option<usize>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(timeout) = self.timeout.filter(|t| *t > 0) {
            config.defaults.timeout = timeout;
        }
        if let Some(max_body) = self.max_body.filter(|b| *b > 0) {
            config.defaults.max_body = max_body;
        }
    }
}

async fn resolve_config_sources(explicit: Option<&Path>) -> Result<ConfigResolver, GatewayError> {
    resolve_file_source(explicit).await?.map_or_else(
        || {
            Err(GatewayError::NoConfigSource {
                hint: "Provide --config <file> or create ./tollgate.yaml.\n  \
                       Run 'tollgate init' to create a config file."
                    .into(),
            })
        },
        |source| Ok(ConfigResolver::new(source, None)),
    )
}

async fn resolve_file_source(
    explicit: Option<&Path>,
) -> Result<Option<Box<dyn ConfigSource>>, GatewayError> {
    if let Some(path) = explicit {
        return create_file_source(path).map(Some);
    }

    for name in CANDIDATES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return create_file_source(&path).map(Some);
        }
    }

    Ok(None)
}

pub fn create_file_source(path: &Path) -> Result<Box<dyn ConfigSource>, GatewayError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => Ok(Box::new(FileSource::yaml(path.to_path_buf()))),

        #[cfg(feature = "json")]
        "json" => Ok(Box::new(FileSource::json(path.to_path_buf()))),

        #[cfg(feature = "toml")]
        "toml" => Ok(Box::new(FileSource::toml(path.to_path_buf()))),

        other => Err(GatewayError::UnsupportedFormat(other.to_string())),
    }
}

async fn config_refresh_loop(
    state: Arc<AppState>,
    resolver: ConfigResolver,
    interval_secs: u64,
    overrides: Overrides,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    interval.tick().await; // first tick is immediate

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => {
                tracing::debug!("config refresh loop shutting down");
                return;
            }
        }

        let current_version = state.config.read().await.version.clone();

        match resolver.primary().has_changed(&current_version).await {
            Ok(true) => {
                tracing::info!("config change detected, reloading");
                if let Err(e) = reload(&state, &resolver, overrides).await {
                    tracing::error!(error = %e, "config reload failed, keeping current config");
                }
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "config change check failed");
            }
        }
    }
}

async fn reload(
    state: &AppState,
    resolver: &ConfigResolver,
    overrides: Overrides,
) -> Result<(), GatewayError> {
    let (mut config, version) = resolver.load_with_fallback().await?;
    overrides.apply(&mut config);
    let route_count = config.routes.len();
    let loaded = LoadedConfig::build(
        config,
        version,
        resolver.primary_name(),
        &state.http_client,
    )?;
    *state.config.write().await = loaded;
    state.stats.config_reloads.fetch_add(1, Ordering::Relaxed);
    tracing::info!(routes = route_count, "config reloaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        serde_json::from_str(r#"{"routes": [{"path": "/*", "upstream": "http://a:80"}]}"#).unwrap()
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut config = config();
        Overrides {
            timeout: Some(500),
            max_body: Some(64),
        }
        .apply(&mut config);
        assert_eq!(config.defaults.timeout, 500);
        assert_eq!(config.defaults.max_body, 64);
    }

    #[test]
    fn zero_and_absent_overrides_keep_the_file_values() {
        let mut config = config();
        Overrides {
            timeout: Some(0),
            max_body: None,
        }
        .apply(&mut config);
        assert_eq!(config.defaults.timeout, 30_000);
        assert_eq!(config.defaults.max_body, 1_048_576);
    }
}
