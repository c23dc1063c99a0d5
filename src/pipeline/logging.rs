//! Structured access logging around each request.
//!
//! The before-phase logs `incoming request` and parks a [`RequestRecord`]
//! in the context annotations; the after-phase takes it back out, so the
//! `request completed` entry is emitted exactly once with the elapsed
//! time measured on a monotonic clock. Gateway failures and upstream 5xx
//! responses are both logged at WARN with an `error` marker.

use std::net::IpAddr;
use std::time::Instant;

use async_trait::async_trait;
use axum::http::Method;

use super::{Completion, CorrelationContext, Interceptor, ProxyRequest};
use crate::error::InterceptError;

/// Error marker for a forwarded response whose upstream answered 5xx.
pub const UPSTREAM_STATUS: &str = "upstream_status";

/// Access-log state captured at entry and consumed by the completion entry.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub method: Method,
    pub path: String,
    pub remote_address: Option<IpAddr>,
    pub correlation_id: String,
    pub start_time: Instant,
}

impl RequestRecord {
    fn remote_display(&self) -> String {
        self.remote_address
            .map_or_else(|| super::headers::UNKNOWN_ADDRESS.to_string(), |ip| ip.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn before(
        &self,
        request: &mut ProxyRequest,
        ctx: &mut CorrelationContext,
    ) -> Result<(), InterceptError> {
        let record = RequestRecord {
            method: request.method().clone(),
            path: request.path().to_string(),
            remote_address: request.remote_addr(),
            correlation_id: ctx.id().to_string(),
            start_time: Instant::now(),
        };

        tracing::info!(
            method = %record.method,
            path = %record.path,
            correlation_id = %record.correlation_id,
            remote_address = %record.remote_display(),
            "incoming request"
        );

        ctx.annotations_mut().insert(record);
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn after(&self, ctx: &mut CorrelationContext, completion: &mut Completion) {
        let Some(record) = ctx.annotations_mut().remove::<RequestRecord>() else {
            tracing::warn!(
                correlation_id = %ctx.id(),
                "no request record found, completion not logged"
            );
            return;
        };
        let duration_ms = record.start_time.elapsed().as_millis() as u64;

        if completion.is_cancelled() {
            tracing::info!(
                method = %record.method,
                path = %record.path,
                outcome = "cancelled",
                duration_ms,
                correlation_id = %record.correlation_id,
                "request completed"
            );
            return;
        }

        let status = completion.status();
        let status_code = status.map_or(0, |s| s.as_u16());
        match completion.failure() {
            None if status.is_some_and(|s| s.is_server_error()) => tracing::warn!(
                method = %record.method,
                path = %record.path,
                status_code,
                outcome = "error",
                error = UPSTREAM_STATUS,
                duration_ms,
                correlation_id = %record.correlation_id,
                "request completed"
            ),
            Some(failure) => tracing::warn!(
                method = %record.method,
                path = %record.path,
                status_code,
                outcome = "error",
                error = failure.marker(),
                detail = %failure,
                duration_ms,
                correlation_id = %record.correlation_id,
                "request completed"
            ),
            None => tracing::info!(
                method = %record.method,
                path = %record.path,
                status_code,
                outcome = "ok",
                duration_ms,
                correlation_id = %record.correlation_id,
                "request completed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;

    use super::*;
    use crate::pipeline::Scheme;

    fn request() -> ProxyRequest {
        let inner = Request::builder()
            .method(Method::POST)
            .uri("/orders?page=2")
            .body(Body::empty())
            .unwrap();
        ProxyRequest::new(inner, None, Scheme::Http)
    }

    #[tokio::test]
    async fn before_parks_a_record() {
        let mut ctx = CorrelationContext::create();
        let mut req = request();
        LoggingInterceptor.before(&mut req, &mut ctx).await.unwrap();

        let record = ctx.annotations().get::<RequestRecord>().unwrap();
        assert_eq!(record.method, Method::POST);
        assert_eq!(record.path, "/orders");
        assert_eq!(record.correlation_id, ctx.id());
        assert_eq!(record.remote_display(), "unknown");
    }

    #[tokio::test]
    async fn after_consumes_the_record() {
        let mut ctx = CorrelationContext::create();
        let mut req = request();
        LoggingInterceptor.before(&mut req, &mut ctx).await.unwrap();

        let mut completion = Completion::forwarded(StatusCode::CREATED.into_response());
        LoggingInterceptor.after(&mut ctx, &mut completion);
        assert!(ctx.annotations().get::<RequestRecord>().is_none());

        // A second unwind has nothing left to log and must not panic.
        LoggingInterceptor.after(&mut ctx, &mut completion);
        assert_eq!(completion.status(), Some(StatusCode::CREATED));
    }
}
