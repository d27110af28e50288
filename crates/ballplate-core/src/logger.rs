//! Stderr logger tagged with the control-cycle context.
//!
//! Lines read `[elapsed LEVEL target #cycle mode] message`. The cycle number
//! and mode (`idle` or `ctl`) are whatever the worker last published through
//! [`set_cycle_context`]; lines logged before the first cycle carry no tag.
//! Install once with [`init_with_level`].

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::EnvFilter;

static CYCLE: AtomicU64 = AtomicU64::new(0);
static CONTROL: AtomicBool = AtomicBool::new(false);

/// Publish the cycle number and control mode shown on later log lines.
///
/// Cycle `0` clears the tag.
pub fn set_cycle_context(cycle: u64, control_running: bool) {
    CONTROL.store(control_running, Ordering::Relaxed);
    CYCLE.store(cycle, Ordering::Relaxed);
}

fn write_line(
    out: &mut impl Write,
    elapsed: f64,
    level: Level,
    target: &str,
    cycle: u64,
    control_running: bool,
    args: fmt::Arguments<'_>,
) -> io::Result<()> {
    write!(out, "[{elapsed:9.3}s {level:>5} {target}")?;
    if cycle > 0 {
        let mode = if control_running { "ctl" } else { "idle" };
        write!(out, " #{cycle} {mode}")?;
    }
    writeln!(out, "] {args}")
}

struct CycleLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for CycleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _ = write_line(
            &mut io::stderr().lock(),
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            CYCLE.load(Ordering::Relaxed),
            CONTROL.load(Ordering::Relaxed),
            *record.args(),
        );
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

static LOGGER: OnceLock<CycleLogger> = OnceLock::new();

/// Install the stderr logger with the provided level filter.
///
/// Calling this more than once is a no-op after the first successful
/// initialization.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| CycleLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Span close events carry the `cycle` field of the per-cycle span, which
/// stands in for the tag of the stderr logger.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(tracing_subscriber::fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(cycle: u64, control_running: bool) -> String {
        let mut buf = Vec::new();
        write_line(
            &mut buf,
            1.25,
            Level::Warn,
            "ballplate::runtime",
            cycle,
            control_running,
            format_args!("arm move failed"),
        )
        .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn untagged_before_first_cycle() {
        assert_eq!(
            line(0, true),
            "[    1.250s  WARN ballplate::runtime] arm move failed\n"
        );
    }

    #[test]
    fn tag_carries_cycle_and_mode() {
        assert!(line(17, false).contains("ballplate::runtime #17 idle] "));
        assert!(line(18, true).contains("ballplate::runtime #18 ctl] "));
    }
}
