//! `tollgate health`: check the health of a running instance.
//!
//! Sends a `GET /health` request to the specified URL and displays
//! the response as formatted text or raw JSON.

use http_body_util::BodyExt;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::cli::HealthArgs;
use crate::error::GatewayError;
use crate::health::HealthResponse;

pub async fn execute(args: HealthArgs) -> Result<(), GatewayError> {
    let url = format!("{}/health", args.url.trim_end_matches('/'));
    let uri: hyper::Uri = url
        .parse()
        .map_err(|e: hyper::http::uri::InvalidUri| GatewayError::UriParse {
            source: Box::new(e),
        })?;

    let connector = hyper_util::client::legacy::connect::HttpConnector::new();
    let client = Client::builder(TokioExecutor::new()).build(connector);

    let req = hyper::Request::builder()
        .uri(uri)
        .body(http_body_util::Full::new(bytes::Bytes::new()))
        .map_err(|e| GatewayError::HttpRequest {
            source: Box::new(e),
        })?;

    let response = tokio::time::timeout(std::time::Duration::from_secs(10), client.request(req))
        .await
        .map_err(|_| GatewayError::HttpRequest {
            source: "health check timed out after 10s".into(),
        })?
        .map_err(|e| GatewayError::HttpRequest {
            source: Box::new(e),
        })?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| GatewayError::HttpRequest {
            source: Box::new(e),
        })?
        .to_bytes();

    if !status.is_success() {
        return Err(GatewayError::HealthCheckFailed(status));
    }

    if args.json {
        println!("{}", String::from_utf8_lossy(&body));
        return Ok(());
    }

    match serde_json::from_slice::<HealthResponse>(&body) {
        Ok(health) => {
            println!("\u{2713} tollgate is healthy ({})", args.url);
            print!("{}", format_report(&health));
        }
        Err(e) => {
            eprintln!("Failed to parse health response: {e}");
            println!("{}", String::from_utf8_lossy(&body));
        }
    }

    Ok(())
}

fn format_report(health: &HealthResponse) -> String {
    let gateway = &health.gateway;
    let request_ids = if gateway.trust_request_id {
        "reuse inbound"
    } else {
        "always generated"
    };
    let cors = if gateway.cors { "on" } else { "off" };
    format!(
        "  version:        {} ({})\n  \
         uptime:         {}\n  \
         identity:       {}\n  \
         pipeline:       {}\n  \
         request ids:    {request_ids}, cors {cors}\n  \
         limits:         {} bytes, {}ms default timeout\n  \
         config source:  {}\n  \
         config version: {} (loaded {}s ago, {} reloads)\n  \
         routes:         {}\n  \
         requests:       {} forwarded, {} failed\n",
        health.version,
        health.commit,
        format_uptime(health.uptime_seconds),
        gateway.identity,
        gateway.interceptors.join(" -> "),
        gateway.max_body_bytes,
        gateway.default_timeout_ms,
        health.config.source,
        health.config.version,
        health.config.loaded_ago_seconds,
        health.config.reloads,
        health.config.routes,
        health.stats.requests_forwarded,
        health.stats.requests_failed,
    )
}

fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_is_humanised() {
        assert_eq!(format_uptime(42), "42s");
        assert_eq!(format_uptime(125), "2m 5s");
        assert_eq!(format_uptime(3 * 3600 + 61), "3h 1m 1s");
    }

    #[test]
    fn report_describes_the_gateway_and_counters() {
        let health: HealthResponse = serde_json::from_value(serde_json::json!({
            "status": "healthy",
            "version": "0.1.0",
            "commit": "abc1234",
            "uptime_seconds": 61,
            "config": {
                "source": "yaml",
                "version": "deadbeef",
                "loaded_ago_seconds": 3,
                "routes": 2
            },
            "gateway": {
                "identity": "edge-gw",
                "interceptors": ["logging", "headers"],
                "trust_request_id": false,
                "cors": true,
                "max_body_bytes": 1024,
                "default_timeout_ms": 5000
            },
            "stats": {"requests_forwarded": 10, "requests_failed": 1}
        }))
        .unwrap();
        let report = format_report(&health);
        assert!(report.contains("identity:       edge-gw"));
        assert!(report.contains("pipeline:       logging -> headers"));
        assert!(report.contains("always generated, cors on"));
        assert!(report.contains("1024 bytes, 5000ms default timeout"));
        assert!(report.contains("10 forwarded, 1 failed"));
        assert!(report.contains("0 reloads"));
        assert!(report.contains("1m 1s"));
    }
}
