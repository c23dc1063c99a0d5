//! The forwarding collaborator and the Axum entry point.
//!
//! [`HttpForwarder`] implements [`Forward`]: it matches the request against
//! the route table ([`routing`]), builds the upstream URI, cleans up
//! connection headers ([`headers`]), buffers the body up to
//! `defaults.max_body` and performs the call with the route's timeout. [`gateway_handler`] is the Axum fallback that hands every
//! non-`/health` request to the current [`Gateway`](crate::gateway::Gateway).

pub mod headers;
pub mod routing;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};

use crate::config::model::{Config, Route};
use crate::error::ForwardError;
use crate::pipeline::{FailureMarker, Forward, ProxyRequest, X_REQUEST_ID};
use crate::server::{AppState, HttpClient};

pub struct HttpForwarder {
    client: HttpClient,
    config: Arc<Config>,
}

impl std::fmt::Debug for HttpForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpForwarder")
            .field("routes", &self.config.routes.len())
            .finish_non_exhaustive()
    }
}

impl HttpForwarder {
    #[must_use]
    pub const fn new(client: HttpClient, config: Arc<Config>) -> Self {
        Self { client, config }
    }
}

/// Build the upstream URI for a matched route.
pub fn upstream_uri(
    route: &Route,
    params: &HashMap<String, String>,
    inbound: &Uri,
) -> Result<Uri, ForwardError> {
    let base = routing::substitute_params(&route.upstream, params);
    let path = if route.strip_prefix {
        routing::strip_wildcard_prefix(&route.path, inbound.path())
    } else {
        inbound.path()
    };
    let query = inbound.query().map(|q| format!("?{q}")).unwrap_or_default();
    let target = format!("{}{path}{query}", base.trim_end_matches('/'));

    target
        .parse::<Uri>()
        .map_err(|e| ForwardError::InvalidUpstream {
            uri: target.clone(),
            reason: e.to_string(),
        })
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Buffer the inbound body, failing once it grows past `limit` bytes.
/// Catches chunked bodies that carry no `Content-Length`.
async fn collect_limited(body: Body, limit: usize) -> Result<Bytes, ForwardError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ForwardError::PayloadTooLarge { limit })
        }
        Err(source) => Err(ForwardError::Body { source }),
    }
}

#[async_trait]
impl Forward for HttpForwarder {
    #[allow(clippy::cast_possible_truncation)]
    async fn forward(&self, request: ProxyRequest) -> Result<Response, ForwardError> {
        let method = request.method().clone();
        let path = request.path().to_string();
        let correlation_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let Some((route_idx, params)) =
            routing::match_route(&self.config.routes, &path, method.as_str())
        else {
            return Err(ForwardError::NoRoute {
                method: method.to_string(),
                path,
            });
        };
        let route = &self.config.routes[route_idx];
        let target = upstream_uri(route, &params, request.uri())?;
        let timeout = Duration::from_millis(self.config.route_timeout(route));

        let (mut parts, body) = request.into_inner().into_parts();
        let limit = self.config.defaults.max_body;
        if declared_length(&parts.headers).is_some_and(|len| len > limit) {
            return Err(ForwardError::PayloadTooLarge { limit });
        }
        headers::prepare_upstream_headers(
            &mut parts.headers,
            &target,
            self.config.defaults.strip_hop_by_hop,
        );

        let body = collect_limited(body, limit).await?;

        let mut upstream_req = hyper::Request::builder()
            .method(parts.method)
            .uri(target.clone())
            .body(Full::new(body))
            .map_err(|e| ForwardError::Upstream {
                source: Box::new(e),
            })?;
        *upstream_req.headers_mut() = parts.headers;

        let start = Instant::now();
        let exchange = async {
            let response = self
                .client
                .request(upstream_req)
                .await
                .map_err(|e| ForwardError::Upstream {
                    source: Box::new(e),
                })?;
            let (parts, body) = response.into_parts();
            let bytes = body
                .collect()
                .await
                .map_err(|e| ForwardError::Body {
                    source: Box::new(e),
                })?
                .to_bytes();
            Ok::<_, ForwardError>((parts, bytes))
        };

        let result = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| ForwardError::Timeout(timeout))
            .and_then(|inner| inner);
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok((mut parts, bytes)) => {
                tracing::debug!(
                    correlation_id = %correlation_id,
                    upstream = %target,
                    status = parts.status.as_u16(),
                    latency_ms,
                    "upstream responded"
                );
                headers::strip_response_hop_by_hop(&mut parts.headers);
                Ok(Response::from_parts(parts, Body::from(bytes)))
            }
            Err(e) => {
                tracing::debug!(
                    correlation_id = %correlation_id,
                    upstream = %target,
                    error = %e,
                    latency_ms,
                    "upstream call failed"
                );
                Err(e)
            }
        }
    }
}

pub async fn gateway_handler(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    // Clone the Arc<Gateway> to release the RwLock before .await
    let gateway = {
        let loaded = state.config.read().await;
        Arc::clone(&loaded.gateway)
    };

    let request = ProxyRequest::new(request, remote_addr, gateway.scheme());
    let response = gateway.handle(request).await;

    if response.extensions().get::<FailureMarker>().is_some() {
        state.stats.failed.fetch_add(1, Ordering::Relaxed);
    } else {
        state.stats.forwarded.fetch_add(1, Ordering::Relaxed);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path: &str, upstream: &str, strip_prefix: bool) -> Route {
        Route {
            path: path.into(),
            methods: vec!["*".into()],
            upstream: upstream.into(),
            strip_prefix,
            timeout: None,
        }
    }

    #[test]
    fn appends_path_and_query() {
        let inbound: Uri = "/api/data?limit=5".parse().unwrap();
        let uri = upstream_uri(
            &route("/api/*", "http://localhost:5001/", false),
            &HashMap::new(),
            &inbound,
        )
        .unwrap();
        assert_eq!(uri, "http://localhost:5001/api/data?limit=5");
    }

    #[test]
    fn strips_the_route_prefix() {
        let inbound: Uri = "/api/python/users".parse().unwrap();
        let uri = upstream_uri(
            &route("/api/python/*", "http://localhost:5001", true),
            &HashMap::new(),
            &inbound,
        )
        .unwrap();
        assert_eq!(uri, "http://localhost:5001/users");
    }

    #[test]
    fn substitutes_params_into_the_base() {
        let inbound: Uri = "/tenants/acme".parse().unwrap();
        let mut params = HashMap::new();
        params.insert("tenant".to_string(), "acme".to_string());
        let uri = upstream_uri(
            &route("/tenants/:tenant", "http://:tenant.internal:8080", false),
            &params,
            &inbound,
        )
        .unwrap();
        assert_eq!(uri, "http://acme.internal:8080/tenants/acme");
    }

    #[tokio::test]
    async fn body_within_the_limit_is_collected() {
        let bytes = collect_limited(Body::from("hello"), 16).await.unwrap();
        assert_eq!(bytes, "hello");
    }

    #[tokio::test]
    async fn body_over_the_limit_is_too_large() {
        // No Content-Length involved: the limit applies to the bytes read.
        let err = collect_limited(Body::from(vec![b'a'; 64]), 16).await.unwrap_err();
        assert!(matches!(err, ForwardError::PayloadTooLarge { limit: 16 }));
    }

    #[test]
    fn content_length_is_read_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_length(&headers), None);
        headers.insert(CONTENT_LENGTH, "64".parse().unwrap());
        assert_eq!(declared_length(&headers), Some(64));
    }

    #[test]
    fn unparsable_target_is_invalid_upstream() {
        let inbound: Uri = "/x".parse().unwrap();
        let err = upstream_uri(&route("/x", "http://bad host", false), &HashMap::new(), &inbound)
            .unwrap_err();
        assert!(matches!(err, ForwardError::InvalidUpstream { .. }));
    }
}
