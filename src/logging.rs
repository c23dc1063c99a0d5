//! Structured logging setup using the `tracing` ecosystem.
//!
//! Configures a `tracing-subscriber` with either flat JSON output (for
//! production) or pretty-printed output (for TTY / local dev). Format
//! is auto-detected from the terminal but can be forced via `--json`
//! or `--pretty`.
//!
//! Every line goes through [`FallbackWriter`]: if stdout is unavailable
//! the line is written to stderr, and if that fails too it is dropped.
//! A broken log sink never turns into a request error.

use std::io::{self, Write};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Writes to `primary`, falling back to `secondary`, and always reports
/// success so the subscriber never sees an I/O error.
#[derive(Debug)]
pub struct FallbackWriter<P, S> {
    primary: P,
    secondary: S,
}

impl<P: Write, S: Write> FallbackWriter<P, S> {
    pub const fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: Write, S: Write> Write for FallbackWriter<P, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.primary.write_all(buf).is_err() {
            let _ = self.secondary.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.primary.flush().is_err() {
            let _ = self.secondary.flush();
        }
        Ok(())
    }
}

/// Process-wide log sink: stdout with stderr as the secondary channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl<'a> MakeWriter<'a> for StdoutSink {
    type Writer = FallbackWriter<io::Stdout, io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        FallbackWriter::new(io::stdout(), io::stderr())
    }
}

pub fn init(level: &LogLevel, format: LogFormat) {
    let tracing_level = level.to_tracing_level();
    let filter = tracing_subscriber::filter::Targets::new().with_default(tracing_level);

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_target(false)
                        .with_writer(StdoutSink),
                )
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_writer(StdoutSink))
                .init();
        }
    }
}
