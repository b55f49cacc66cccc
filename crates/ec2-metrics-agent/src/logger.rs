// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log formatting and subscriber setup.
//!
//! The agent usually runs from cron or a systemd timer, so its output ends up in syslog or
//! the journal mixed with other jobs. Every line is prefixed to make it easy to grep:
//!
//! ```text
//! EC2_METRICS | INFO | Published 12 datums to namespace EC2
//! EC2_METRICS | WARN | run{instance=i-0123}: Skipping disk metrics for /data: statfs failed
//! ```

use std::fmt;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields, MakeWriter,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

pub const LOG_PREFIX: &str = "EC2_METRICS";

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(&mut writer, "{LOG_PREFIX} | {} | ", event.metadata().level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Builds the filter for `log_level`, silencing HTTP and AWS SDK internals.
pub fn env_filter(log_level: &str) -> Result<EnvFilter, String> {
    let directives = format!(
        "h2=off,hyper=off,hyper_util=off,rustls=off,aws_config=warn,aws_smithy_runtime=warn,{log_level}"
    );
    EnvFilter::try_new(directives).map_err(|e| e.to_string())
}

/// Plain-text subscriber writing prefixed lines to `writer`.
fn subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .event_format(Formatter)
        .finish()
}

/// Installs the global subscriber writing prefixed lines to stderr.
pub fn init(log_level: &str) -> Result<(), String> {
    tracing::subscriber::set_global_default(subscriber(env_filter(log_level)?, std::io::stderr))
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_lines_are_prefixed() {
        let captured = Captured::default();
        let subscriber = subscriber(env_filter("info").unwrap(), captured.clone());

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("run", instance = "i-123");
            let _guard = span.enter();
            tracing::info!("Published 3 datums");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(!output.contains('\u{1b}'), "escape codes in {output:?}");
        assert_eq!(
            output,
            "EC2_METRICS | INFO | run{instance=\"i-123\"}: Published 3 datums\n"
        );
    }

    #[test]
    fn test_filter_drops_events_below_level() {
        let captured = Captured::default();
        let subscriber = subscriber(env_filter("warn").unwrap(), captured.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("hidden");
            tracing::warn!("shown");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output, "EC2_METRICS | WARN | shown\n");
    }

    #[test]
    fn test_env_filter_rejects_garbage() {
        assert!(env_filter("info").is_ok());
        assert!(env_filter("not a [level").is_err());
    }
}
