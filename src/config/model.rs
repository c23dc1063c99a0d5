//! Serde data structures for the tollgate configuration file.
//!
//! Contains [`Config`] (the root), [`GatewaySettings`], [`CorsSettings`],
//! [`Defaults`] and [`Route`]. All types derive `Serialize` and
//! `Deserialize` with `deny_unknown_fields` for strict parsing.

use serde::{Deserialize, Serialize};

use crate::pipeline::headers::{
    CorsPolicy, HeaderPolicy, DEFAULT_ALLOW_HEADERS, DEFAULT_ALLOW_METHODS, DEFAULT_ALLOW_ORIGIN,
    DEFAULT_IDENTITY,
};
use crate::pipeline::Scheme;

const fn default_timeout() -> u64 {
    30_000
}

const fn default_max_body() -> usize {
    1_048_576
}

const fn default_true() -> bool {
    true
}

fn default_methods() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_identity() -> String {
    DEFAULT_IDENTITY.to_string()
}

fn default_allow_origin() -> String {
    DEFAULT_ALLOW_ORIGIN.to_string()
}

fn default_allow_methods() -> String {
    DEFAULT_ALLOW_METHODS.to_string()
}

fn default_allow_headers() -> String {
    DEFAULT_ALLOW_HEADERS.to_string()
}

fn is_default_timeout(v: &u64) -> bool {
    *v == default_timeout()
}

fn is_default_max_body(v: &usize) -> bool {
    *v == default_max_body()
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_default_methods(v: &[String]) -> bool {
    v.len() == 1 && v[0] == "*"
}

fn is_default_identity(v: &str) -> bool {
    v == DEFAULT_IDENTITY
}

fn is_http(v: &Scheme) -> bool {
    *v == Scheme::Http
}

fn is_default_defaults(v: &Defaults) -> bool {
    v.timeout == default_timeout() && v.max_body == default_max_body() && v.strip_hop_by_hop
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "GatewaySettings::is_default")]
    pub gateway: GatewaySettings,

    #[serde(default, skip_serializing_if = "is_default_defaults")]
    pub defaults: Defaults,

    pub routes: Vec<Route>,
}

impl Config {
    /// Timeout for a route in milliseconds, falling back to the defaults.
    #[must_use]
    pub fn route_timeout(&self, route: &Route) -> u64 {
        route.timeout.unwrap_or(self.defaults.timeout)
    }
}

/// Identity and CORS values written by the header interceptor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySettings {
    #[serde(default = "default_identity", skip_serializing_if = "is_default_identity")]
    pub identity: String,

    /// Reuse a well-formed inbound `X-Request-ID` instead of generating one.
    #[serde(default, skip_serializing_if = "is_false")]
    pub trust_request_id: bool,

    /// Scheme reported upstream in `X-Forwarded-Proto`.
    #[serde(default, skip_serializing_if = "is_http")]
    pub scheme: Scheme,

    #[serde(default, skip_serializing_if = "CorsSettings::is_default")]
    pub cors: CorsSettings,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            identity: default_identity(),
            trust_request_id: false,
            scheme: Scheme::Http,
            cors: CorsSettings::default(),
        }
    }
}

impl GatewaySettings {
    fn is_default(&self) -> bool {
        is_default_identity(&self.identity)
            && !self.trust_request_id
            && is_http(&self.scheme)
            && self.cors.is_default()
    }

    #[must_use]
    pub fn header_policy(&self) -> HeaderPolicy {
        HeaderPolicy {
            identity: self.identity.clone(),
            cors: self.cors.enabled.then(|| CorsPolicy {
                allow_origin: self.cors.allow_origin.clone(),
                allow_methods: self.cors.allow_methods.clone(),
                allow_headers: self.cors.allow_headers.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CorsSettings {
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,

    #[serde(default = "default_allow_origin")]
    pub allow_origin: String,

    #[serde(default = "default_allow_methods")]
    pub allow_methods: String,

    #[serde(default = "default_allow_headers")]
    pub allow_headers: String,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_origin: default_allow_origin(),
            allow_methods: default_allow_methods(),
            allow_headers: default_allow_headers(),
        }
    }
}

impl CorsSettings {
    fn is_default(&self) -> bool {
        self.enabled
            && self.allow_origin == DEFAULT_ALLOW_ORIGIN
            && self.allow_methods == DEFAULT_ALLOW_METHODS
            && self.allow_headers == DEFAULT_ALLOW_HEADERS
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    #[serde(
        default = "default_timeout",
        skip_serializing_if = "is_default_timeout"
    )]
    pub timeout: u64,

    /// Largest request body forwarded upstream, in bytes.
    #[serde(
        default = "default_max_body",
        skip_serializing_if = "is_default_max_body"
    )]
    pub max_body: usize,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub strip_hop_by_hop: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_body: default_max_body(),
            strip_hop_by_hop: default_true(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Route {
    pub path: String,

    #[serde(
        default = "default_methods",
        skip_serializing_if = "is_default_methods"
    )]
    pub methods: Vec<String>,

    /// Base URL of the upstream; may contain `:param` placeholders.
    pub upstream: String,

    /// Drop the wildcard prefix of `path` before appending to `upstream`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub strip_prefix: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_defaults_match_header_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"routes": [{"path": "/*", "upstream": "http://a:80"}]}"#)
                .unwrap();
        let policy = config.gateway.header_policy();
        assert_eq!(policy, HeaderPolicy::default());
        assert_eq!(config.defaults.timeout, 30_000);
        assert_eq!(config.defaults.max_body, 1_048_576);
        assert!(!config.gateway.trust_request_id);
        assert_eq!(config.routes[0].methods, ["*"]);
    }

    #[test]
    fn disabled_cors_yields_no_policy() {
        let config: Config = serde_json::from_str(
            r#"{
                "gateway": {"identity": "edge", "cors": {"enabled": false}},
                "routes": [{"path": "/*", "upstream": "http://a:80"}]
            }"#,
        )
        .unwrap();
        let policy = config.gateway.header_policy();
        assert_eq!(policy.identity, "edge");
        assert!(policy.cors.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_str::<Config>(
            r#"{"routes": [{"path": "/*", "upstream": "http://a:80", "targets": []}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn route_timeout_falls_back_to_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "defaults": {"timeout": 1500},
                "routes": [
                    {"path": "/a", "upstream": "http://a:80"},
                    {"path": "/b", "upstream": "http://b:80", "timeout": 200}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.route_timeout(&config.routes[0]), 1500);
        assert_eq!(config.route_timeout(&config.routes[1]), 200);
    }
}
