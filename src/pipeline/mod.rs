//! The request middleware pipeline.
//!
//! A [`Pipeline`] wraps an opaque [`Forward`] operation with an ordered
//! list of [`Interceptor`]s. Before-phases run in registration order,
//! then the request is forwarded, then after-phases run in reverse order,
//! so the first interceptor registered is the outermost layer and sees the
//! final response.
//!
//! After-phases are guaranteed: forward failures are turned into gateway
//! error responses before unwinding, and if the [`Pipeline::run`] future
//! is dropped mid-flight (client disconnect) a drop guard runs the pending
//! after-phases against a cancelled [`Completion`].
//!
//! Submodules provide the request-scoped [`context`], the access-log
//! interceptor ([`logging`]) and the header interceptor ([`headers`]).

pub mod context;
pub mod headers;
pub mod logging;

use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::{ForwardError, InterceptError};
pub use context::CorrelationContext;
pub use headers::{HeaderInterceptor, HeaderPolicy};
pub use logging::LoggingInterceptor;

pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound request together with its connection metadata.
#[derive(Debug)]
pub struct ProxyRequest {
    inner: Request<Body>,
    remote_addr: Option<IpAddr>,
    scheme: Scheme,
}

impl ProxyRequest {
    #[must_use]
    pub fn new(inner: Request<Body>, remote_addr: Option<IpAddr>, scheme: Scheme) -> Self {
        Self {
            inner,
            remote_addr,
            scheme,
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    /// Peer address of the inbound connection, if the transport knows it.
    #[must_use]
    pub const fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }

    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    #[must_use]
    pub fn into_inner(self) -> Request<Body> {
        self.inner
    }
}

/// Why a request did not complete with an upstream response.
#[derive(Debug)]
pub enum Failure {
    Forward(ForwardError),
    Rejected(InterceptError),
}

impl Failure {
    #[must_use]
    pub const fn marker(&self) -> &'static str {
        match self {
            Self::Forward(e) => e.marker(),
            Self::Rejected(_) => "rejected",
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward(e) => write!(f, "{e}"),
            Self::Rejected(e) => write!(f, "rejected: {e}"),
        }
    }
}

/// Response extension marking a response synthesized by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureMarker(pub &'static str);

/// What the after-phases see once the inner layers have settled.
///
/// `response` is `None` when the client went away before a response could
/// be produced; header writes then have nothing to act on.
#[derive(Debug)]
pub struct Completion {
    response: Option<Response>,
    failure: Option<Failure>,
}

impl Completion {
    #[must_use]
    pub fn forwarded(response: Response) -> Self {
        Self {
            response: Some(response),
            failure: None,
        }
    }

    #[must_use]
    pub fn failed(error: ForwardError) -> Self {
        let response = error_response(error.status(), error.marker(), error.to_string());
        Self {
            response: Some(response),
            failure: Some(Failure::Forward(error)),
        }
    }

    #[must_use]
    pub fn rejected(error: InterceptError) -> Self {
        let response = error_response(error.status, "rejected", error.reason.clone());
        Self {
            response: Some(response),
            failure: Some(Failure::Rejected(error)),
        }
    }

    #[must_use]
    pub const fn cancelled() -> Self {
        Self {
            response: None,
            failure: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(Response::status)
    }

    /// Response headers, or `None` if there is no client left to send them to.
    pub fn headers_mut(&mut self) -> Option<&mut HeaderMap> {
        self.response.as_mut().map(Response::headers_mut)
    }

    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.response.is_none()
    }

    #[must_use]
    pub fn into_response(self) -> Response {
        self.response
            .unwrap_or_else(|| StatusCode::SERVICE_UNAVAILABLE.into_response())
    }
}

fn error_response(status: StatusCode, marker: &'static str, message: String) -> Response {
    let mut response = (status, message).into_response();
    response.extensions_mut().insert(FailureMarker(marker));
    response
}

/// A before/after unit composed by the [`Pipeline`].
///
/// Implementations hold no per-request state: anything one phase needs
/// from the other goes through the [`CorrelationContext`] annotations.
#[async_trait]
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs before forwarding. Returning an error skips forwarding; only
    /// interceptors whose before-phase completed are unwound.
    async fn before(
        &self,
        _request: &mut ProxyRequest,
        _ctx: &mut CorrelationContext,
    ) -> Result<(), InterceptError> {
        Ok(())
    }

    /// Runs after the inner layers settled, exactly once per completed
    /// before-phase, including on failure and cancellation.
    fn after(&self, _ctx: &mut CorrelationContext, _completion: &mut Completion) {}
}

/// The forwarding collaborator wrapped by the pipeline.
#[async_trait]
pub trait Forward: Send + Sync {
    async fn forward(&self, request: ProxyRequest) -> Result<Response, ForwardError>;
}

/// [`Forward`] adapter for async closures.
pub struct ForwardFn<F>(F);

pub fn forward_fn<F, Fut>(f: F) -> ForwardFn<F>
where
    F: Fn(ProxyRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, ForwardError>> + Send + 'static,
{
    ForwardFn(f)
}

#[async_trait]
impl<F, Fut> Forward for ForwardFn<F>
where
    F: Fn(ProxyRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, ForwardError>> + Send + 'static,
{
    async fn forward(&self, request: ProxyRequest) -> Result<Response, ForwardError> {
        (self.0)(request).await
    }
}

/// Position of a single invocation inside [`Pipeline::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Entering(usize),
    Forwarding,
    Leaving(usize),
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entering(i) => write!(f, "entering({i})"),
            Self::Forwarding => f.write_str("forwarding"),
            Self::Leaving(i) => write!(f, "leaving({i})"),
            Self::Done => f.write_str("done"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

pub struct Pipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
    trust_request_id: bool,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("interceptors", &self.names())
            .field("trust_request_id", &self.trust_request_id)
            .finish()
    }
}

impl Pipeline {
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The gateway's fixed order: access logging outermost, headers inside.
    #[must_use]
    pub fn standard(headers: HeaderInterceptor) -> PipelineBuilder {
        Self::builder().with(LoggingInterceptor).with(headers)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub async fn run<F>(&self, mut request: ProxyRequest, forward: &F) -> Response
    where
        F: Forward + ?Sized,
    {
        let inbound_id = if self.trust_request_id {
            request
                .headers()
                .get(X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
        } else {
            None
        };
        let ctx = CorrelationContext::get_or_create(inbound_id);
        let mut unwind = Unwind {
            interceptors: &self.interceptors,
            entered: 0,
            ctx,
        };

        for (index, interceptor) in self.interceptors.iter().enumerate() {
            trace_stage(&unwind.ctx, Stage::Entering(index), interceptor.name());
            if let Err(rejection) = interceptor.before(&mut request, &mut unwind.ctx).await {
                tracing::debug!(
                    correlation_id = %unwind.ctx.id(),
                    interceptor = interceptor.name(),
                    status = rejection.status.as_u16(),
                    reason = %rejection.reason,
                    "request rejected before forwarding"
                );
                return unwind.finish(Completion::rejected(rejection));
            }
            unwind.entered = index + 1;
        }

        trace_stage(&unwind.ctx, Stage::Forwarding, "forward");
        let completion = match forward.forward(request).await {
            Ok(response) => Completion::forwarded(response),
            Err(error) => Completion::failed(error),
        };
        unwind.finish(completion)
    }
}

#[derive(Default)]
pub struct PipelineBuilder {
    interceptors: Vec<Arc<dyn Interceptor>>,
    trust_request_id: bool,
}

impl PipelineBuilder {
    /// Append an interceptor inside the ones already registered.
    #[must_use]
    pub fn with<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    #[must_use]
    pub fn with_shared(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Reuse a well-formed inbound `X-Request-ID` instead of generating one.
    #[must_use]
    pub const fn trust_request_id(mut self, trust: bool) -> Self {
        self.trust_request_id = trust;
        self
    }

    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            interceptors: self.interceptors,
            trust_request_id: self.trust_request_id,
        }
    }
}

/// Unwinds entered interceptors exactly once, on completion or on drop.
struct Unwind<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    entered: usize,
    ctx: CorrelationContext,
}

impl Unwind<'_> {
    fn finish(mut self, mut completion: Completion) -> Response {
        self.leave(&mut completion);
        let stage = if completion.failure().is_some() {
            Stage::Failed
        } else {
            Stage::Done
        };
        trace_stage(&self.ctx, stage, "pipeline");
        completion.into_response()
    }

    fn leave(&mut self, completion: &mut Completion) {
        let interceptors = self.interceptors;
        while self.entered > 0 {
            self.entered -= 1;
            let interceptor = &interceptors[self.entered];
            trace_stage(&self.ctx, Stage::Leaving(self.entered), interceptor.name());
            interceptor.after(&mut self.ctx, completion);
        }
    }
}

impl Drop for Unwind<'_> {
    fn drop(&mut self) {
        if self.entered > 0 {
            tracing::debug!(
                correlation_id = %self.ctx.id(),
                pending = self.entered,
                "request dropped before completion, unwinding"
            );
            let mut completion = Completion::cancelled();
            self.leave(&mut completion);
        }
    }
}

fn trace_stage(ctx: &CorrelationContext, stage: Stage, unit: &str) {
    tracing::trace!(correlation_id = %ctx.id(), stage = %stage, unit, "pipeline stage");
}
