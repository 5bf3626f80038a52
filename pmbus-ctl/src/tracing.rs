//! Provide tracing, tailored to this program.
//!
//! `main` calls [`init_stderr`] once with the `-d` count. Everything else
//! can `use crate::tracing::prelude::*` for the `trace!()` .. `error!()`
//! macros.
//!
//! Logs always go to stderr. Stdout is reserved for the JSON document.

use std::io::{self, IsTerminal};
use time::OffsetDateTime;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

/// Default level for a given number of `-d` flags.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install a stderr subscriber. `RUST_LOG` still wins over the `-d` default.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_stderr(verbosity: u8) {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_for(verbosity).into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .event_format(CompactFormatter {
                    color: io::stderr().is_terminal(),
                }),
        )
        .try_init();

    if let Err(err) = result {
        eprintln!("failed to install log subscriber: {err}");
    }
}

/// One line per event: time, level, target without the crate prefix,
/// message, then `key=value` fields.
struct CompactFormatter {
    color: bool,
}

/// Visitor that collects the message and fields of an event.
#[derive(Default)]
struct FieldCollector {
    fields: Vec<(String, String)>,
    message: Option<String>,
}

impl tracing::field::Visit for FieldCollector {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.push((field.name().to_string(), format!("{:?}", value)));
        }
    }
}

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for CompactFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);

        LocalTimer.format_time(&mut writer)?;
        write!(writer, " ")?;

        let (level_color, level_text) = match *event.metadata().level() {
            tracing::Level::ERROR => ("\x1b[31m", "ERROR"),
            tracing::Level::WARN => ("\x1b[33m", "WARN "),
            tracing::Level::INFO => ("\x1b[32m", "INFO "),
            tracing::Level::DEBUG => ("\x1b[34m", "DEBUG"),
            tracing::Level::TRACE => ("\x1b[35m", "TRACE"),
        };
        if self.color {
            write!(writer, "{}{}\x1b[0m ", level_color, level_text)?;
        } else {
            write!(writer, "{} ", level_text)?;
        }

        let target = event.metadata().target();
        let short_target = target.strip_prefix("pmbus_ctl::").unwrap_or(target);
        write!(writer, "{}: ", short_target)?;

        if let Some(msg) = &visitor.message {
            write!(writer, "{}", msg)?;
        }
        for (key, value) in &visitor.fields {
            write!(writer, " {}={}", key, value)?;
        }

        writeln!(writer)
    }
}

// Local time to the nearest second. The default timer is UTC with a long
// RFC 3339 timestamp.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let stamp = now
            .format(time::macros::format_description!("[hour]:[minute]:[second]"))
            .map_err(|_| std::fmt::Error)?;
        write!(w, "{}", stamp)
    }
}
