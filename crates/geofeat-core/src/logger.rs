//! Logging setup for binaries built on geofeat.
//!
//! [`init_with_level`] routes the `log` facade to stderr. Each record becomes one
//! line carrying the seconds since installation, the level and the module path:
//!
//! ```text
//! [  0.042s  INFO geofeat::pipeline] road mask: kept 3 components
//! ```
//!
//! With the `tracing` feature, [`init_tracing`] installs a `tracing-subscriber`
//! instead; its `log` bridge picks up the records emitted by this workspace.

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Crate prefixes whose records are shown; everything else is dropped.
const OWN_TARGETS: [&str; 1] = ["geofeat"];

struct StderrLogger {
    max_level: LevelFilter,
    epoch: Instant,
}

fn render_line(secs: f64, level: Level, target: &str, message: &fmt::Arguments<'_>) -> String {
    format!("[{secs:7.3}s {level:>5} {target}] {message}")
}

fn is_own_target(target: &str) -> bool {
    OWN_TARGETS.iter().any(|prefix| target.starts_with(prefix))
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level && is_own_target(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = render_line(
            self.epoch.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args(),
        );
        // Write errors on stderr are ignored.
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static INSTALLED: OnceLock<StderrLogger> = OnceLock::new();

/// Route `log` records at or above `level` to stderr.
///
/// Only the first call installs anything; the level of later calls is ignored.
/// Fails if another `log` backend was installed first.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let mut fresh = false;
    let logger = INSTALLED.get_or_init(|| {
        fresh = true;
        StderrLogger {
            max_level: level,
            epoch: Instant::now(),
        }
    });
    if fresh {
        log::set_logger(logger)?;
        log::set_max_level(logger.max_level);
    }
    Ok(())
}

/// Install a `tracing` subscriber with span-close timings.
///
/// The filter comes from `RUST_LOG`; `default_directive` (e.g. `"info"` or
/// `"geofeat=debug"`) applies when it is unset or unparsable. `json` selects
/// one JSON object per line. A subscriber installed earlier is left in place.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, default_directive: &str) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);

    let installed = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(tracing_subscriber::fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
    if installed.is_err() {
        log::debug!("tracing subscriber already installed");
    }
}
