//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::io::{self, Write};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::Request;
use serde_json::Value;
use tollgate::pipeline::{HeaderInterceptor, HeaderPolicy, Pipeline, ProxyRequest, Scheme};
use tracing_subscriber::fmt::MakeWriter;

/// In-memory JSON log sink. Install it with [`LogCapture::install`] on a
/// current-thread runtime so every task of the test logs into it.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl LogCapture {
    #[must_use]
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(self.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn entries(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    pub fn with_message(&self, message: &str) -> Vec<Value> {
        self.entries()
            .into_iter()
            .filter(|e| e["message"] == message)
            .collect()
    }
}

pub fn standard_pipeline() -> Pipeline {
    Pipeline::standard(HeaderInterceptor::new(HeaderPolicy::default()).unwrap()).build()
}

pub fn request(method: &str, uri: &str, remote: Option<&str>, scheme: Scheme) -> ProxyRequest {
    let inner = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let remote = remote.map(|r| r.parse::<IpAddr>().unwrap());
    ProxyRequest::new(inner, remote, scheme)
}

pub fn header<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}
