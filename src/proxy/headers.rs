//! Upstream header hygiene for the HTTP forwarder.
//!
//! Hop-by-hop headers only describe a single connection and are dropped
//! in both directions; `Host` is rewritten to the upstream authority.
//! Forwarding and identity headers are the pipeline's job, see
//! [`HeaderInterceptor`](crate::pipeline::HeaderInterceptor).

use std::sync::LazyLock;

use axum::http::header::{CONTENT_LENGTH, HOST};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Uri};

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}

/// Prepare client headers for the upstream request.
pub fn prepare_upstream_headers(headers: &mut HeaderMap, target: &Uri, strip: bool) {
    if strip {
        strip_hop_by_hop(headers);
    }

    if let Some(authority) = target.authority() {
        match HeaderValue::from_str(authority.as_str()) {
            Ok(value) => {
                headers.insert(HOST, value);
            }
            Err(_) => {
                headers.remove(HOST);
            }
        }
    }
}

/// Strip hop-by-hop headers and `content-length` from an upstream response.
///
/// The body has already been fully collected by the forwarder, so
/// `transfer-encoding` and `content-length` from the origin are no longer
/// accurate. Hyper sets the correct `content-length` from the body bytes.
pub fn strip_response_hop_by_hop(headers: &mut HeaderMap) {
    strip_hop_by_hop(headers);
    headers.remove(CONTENT_LENGTH);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("connection", "keep-alive".parse().unwrap());
        headers.insert("host", "gateway.local:8080".parse().unwrap());
        headers.insert("content-type", "application/json".parse().unwrap());
        headers
    }

    #[test]
    fn strips_hop_by_hop_and_rewrites_host() {
        let mut headers = client_headers();
        let target: Uri = "http://backend:5001/users".parse().unwrap();
        prepare_upstream_headers(&mut headers, &target, true);

        assert!(headers.get("connection").is_none());
        assert_eq!(headers.get("host").unwrap(), "backend:5001");
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
    }

    #[test]
    fn hop_by_hop_can_be_kept() {
        let mut headers = client_headers();
        let target: Uri = "http://backend/".parse().unwrap();
        prepare_upstream_headers(&mut headers, &target, false);

        assert_eq!(headers.get("connection").unwrap(), "keep-alive");
        assert_eq!(headers.get("host").unwrap(), "backend");
    }

    #[test]
    fn response_loses_framing_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("transfer-encoding", "chunked".parse().unwrap());
        headers.insert("content-length", "12".parse().unwrap());
        headers.insert("x-powered-by", "Express".parse().unwrap());
        strip_response_hop_by_hop(&mut headers);

        assert!(headers.get("transfer-encoding").is_none());
        assert!(headers.get("content-length").is_none());
        assert_eq!(headers.get("x-powered-by").unwrap(), "Express");
    }
}
