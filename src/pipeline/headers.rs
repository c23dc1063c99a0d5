//! Proxy-identity, forwarding and CORS header injection.
//!
//! [`HeaderInterceptor`] stamps forwarding metadata onto the upstream
//! request and identity/CORS metadata onto the client response. Every
//! write is a `HeaderMap::insert`, so pre-existing values of the same
//! (case-insensitive) name are replaced and re-running a phase changes
//! nothing. Upstream response headers are never inspected.

use async_trait::async_trait;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use super::{Completion, CorrelationContext, Interceptor, ProxyRequest, X_REQUEST_ID};
use crate::error::{GatewayError, InterceptError};

pub const DEFAULT_IDENTITY: &str = "tollgate";
pub const DEFAULT_ALLOW_ORIGIN: &str = "*";
pub const DEFAULT_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const DEFAULT_ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Substituted for the client address when the transport cannot tell.
pub const UNKNOWN_ADDRESS: &str = "unknown";

static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
static X_PROXY_BY: HeaderName = HeaderName::from_static("x-proxy-by");
static X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");
static REQUEST_ID: HeaderName = HeaderName::from_static(X_REQUEST_ID);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    pub allow_origin: String,
    pub allow_methods: String,
    pub allow_headers: String,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origin: DEFAULT_ALLOW_ORIGIN.into(),
            allow_methods: DEFAULT_ALLOW_METHODS.into(),
            allow_headers: DEFAULT_ALLOW_HEADERS.into(),
        }
    }
}

/// What the header interceptor writes. `cors: None` disables CORS headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPolicy {
    pub identity: String,
    pub cors: Option<CorsPolicy>,
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self {
            identity: DEFAULT_IDENTITY.into(),
            cors: Some(CorsPolicy::default()),
        }
    }
}

#[derive(Debug, Clone)]
struct CorsValues {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

#[derive(Debug, Clone)]
pub struct HeaderInterceptor {
    identity: HeaderValue,
    cors: Option<CorsValues>,
}

impl HeaderInterceptor {
    /// Validate the policy once so per-request writes cannot fail.
    pub fn new(policy: HeaderPolicy) -> Result<Self, GatewayError> {
        let identity = header_value("gateway.identity", policy.identity)?;
        let cors = policy
            .cors
            .map(|cors| {
                Ok::<_, GatewayError>(CorsValues {
                    allow_origin: header_value("cors.allow_origin", cors.allow_origin)?,
                    allow_methods: header_value("cors.allow_methods", cors.allow_methods)?,
                    allow_headers: header_value("cors.allow_headers", cors.allow_headers)?,
                })
            })
            .transpose()?;
        Ok(Self { identity, cors })
    }

    /// Stamp forwarding metadata onto the outbound (to-upstream) request.
    pub fn stamp_request(&self, request: &mut ProxyRequest, ctx: &CorrelationContext) {
        let forwarded_for = request
            .remote_addr()
            .and_then(|ip| HeaderValue::try_from(ip.to_string()).ok())
            .unwrap_or_else(|| HeaderValue::from_static(UNKNOWN_ADDRESS));
        let proto = HeaderValue::from_static(request.scheme().as_str());

        let headers = request.headers_mut();
        insert_request_id(headers, ctx);
        headers.insert(X_FORWARDED_FOR.clone(), forwarded_for);
        headers.insert(X_FORWARDED_PROTO.clone(), proto);
        headers.insert(X_PROXY_BY.clone(), self.identity.clone());
    }

    /// Stamp identity and CORS metadata onto the client response.
    pub fn stamp_response(&self, headers: &mut HeaderMap, ctx: &CorrelationContext) {
        insert_request_id(headers, ctx);
        headers.insert(X_POWERED_BY.clone(), self.identity.clone());
        if let Some(cors) = &self.cors {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, cors.allow_origin.clone());
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, cors.allow_methods.clone());
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, cors.allow_headers.clone());
        }
    }
}

#[async_trait]
impl Interceptor for HeaderInterceptor {
    fn name(&self) -> &'static str {
        "headers"
    }

    async fn before(
        &self,
        request: &mut ProxyRequest,
        ctx: &mut CorrelationContext,
    ) -> Result<(), InterceptError> {
        self.stamp_request(request, ctx);
        tracing::debug!(correlation_id = %ctx.id(), "added proxy headers to request");
        Ok(())
    }

    fn after(&self, ctx: &mut CorrelationContext, completion: &mut Completion) {
        match completion.headers_mut() {
            Some(headers) => self.stamp_response(headers, ctx),
            None => tracing::debug!(
                correlation_id = %ctx.id(),
                "client gone, skipping response headers"
            ),
        }
    }
}

fn insert_request_id(headers: &mut HeaderMap, ctx: &CorrelationContext) {
    match HeaderValue::from_str(ctx.id()) {
        Ok(value) => {
            headers.insert(REQUEST_ID.clone(), value);
        }
        Err(_) => {
            tracing::warn!(correlation_id = %ctx.id(), "correlation id is not a valid header value");
        }
    }
}

fn header_value(name: &'static str, value: String) -> Result<HeaderValue, GatewayError> {
    HeaderValue::try_from(value.as_str())
        .map_err(|_| GatewayError::InvalidHeaderValue { name, value })
}
