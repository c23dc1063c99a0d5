//! The composed request handler exposed to the transport layer.
//!
//! A [`Gateway`] pairs a [`Pipeline`] with a [`Forward`] implementation.
//! [`Gateway::from_config`] builds the production shape: the standard
//! `[logging, headers]` interceptor order around an [`HttpForwarder`].

use std::sync::Arc;

use axum::response::Response;

use crate::config::model::Config;
use crate::error::GatewayError;
use crate::pipeline::{Forward, HeaderInterceptor, Pipeline, ProxyRequest, Scheme};
use crate::proxy::HttpForwarder;
use crate::server::HttpClient;

#[derive(Debug)]
pub struct Gateway<F = HttpForwarder> {
    pipeline: Pipeline,
    forwarder: F,
    scheme: Scheme,
}

impl<F: Forward> Gateway<F> {
    #[must_use]
    pub fn new(pipeline: Pipeline, forwarder: F) -> Self {
        Self {
            pipeline,
            forwarder,
            scheme: Scheme::Http,
        }
    }

    /// Scheme the listener accepts, reported upstream as `X-Forwarded-Proto`.
    #[must_use]
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub async fn handle(&self, request: ProxyRequest) -> Response {
        self.pipeline.run(request, &self.forwarder).await
    }
}

impl Gateway<HttpForwarder> {
    pub fn from_config(config: Arc<Config>, client: HttpClient) -> Result<Self, GatewayError> {
        let headers = HeaderInterceptor::new(config.gateway.header_policy())?;
        let pipeline = Pipeline::standard(headers)
            .trust_request_id(config.gateway.trust_request_id)
            .build();
        let scheme = config.gateway.scheme;
        Ok(Self::new(pipeline, HttpForwarder::new(client, config)).with_scheme(scheme))
    }
}
