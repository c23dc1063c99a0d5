//! Tollgate is an HTTP gateway that wraps every forwarded request in a
//! small middleware pipeline.
//!
//! Each request gets a correlation ID, one "incoming" and one "completed"
//! access log entry, and the standard proxy headers (`X-Request-ID`,
//! `X-Forwarded-For`, `X-Forwarded-Proto`, `X-Proxy-By`). Each response,
//! error responses included, carries `X-Request-ID`, `X-Powered-By` and
//! the CORS headers. Interceptors run onion-style around the forwarding
//! call, and their after-phases run even when forwarding fails, times out
//! or the client goes away.
//!
//! # Architecture
//!
//! - [`pipeline`] -- [`CorrelationContext`](pipeline::CorrelationContext),
//!   the [`Interceptor`](pipeline::Interceptor) trait, the logging and header
//!   interceptors, and the [`Pipeline`](pipeline::Pipeline) that composes them.
//! - [`gateway`] -- A pipeline bound to a [`Forward`](pipeline::Forward)
//!   implementation.
//! - [`proxy`] -- The HTTP forwarder: route matching, upstream URI building,
//!   hop-by-hop header handling, and the Axum fallback handler.
//! - [`config`] -- Configuration loading, validation, and hot-reloading via the
//!   [`ConfigSource`](config::ConfigSource) trait.
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate, health).
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /health` endpoint handler returning runtime diagnostics.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`server`] -- Axum server setup, shared application state, HTTP client, and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod logging;
pub mod pipeline;
pub mod proxy;
pub mod server;
