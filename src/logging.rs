//! Logging setup for fastdu.
//!
//! `log` facade, `env_logger` backend. The level comes from, in order:
//!
//! 1. `RUST_LOG` if set
//! 2. `--quiet` (errors only) or `-v`/`-vv` (debug/trace)
//! 3. info
//!
//! Debug builds prefix lines with a timestamp, and with the module path once
//! `-v` is given. Release builds print `LEVEL message`.
//!
//! ```rust,no_run
//! use fastdu::logging::init_logging;
//!
//! init_logging(1, false);
//! log::debug!("walker pool ready");
//! ```

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Modules whose info-level chatter is dropped unless tracing.
const NOISY_MODULES: &[&str] = &["image", "rusqlite"];

/// Install the global logger.
///
/// Calling it a second time is a no-op that logs at debug level, so test
/// binaries and embedding code can call it freely.
pub fn init_logging(verbose: u8, quiet: bool) {
    let from_env = env::var("RUST_LOG").ok();
    let level = level_for(verbose, quiet);

    let mut builder = Builder::new();
    match from_env {
        Some(ref spec) => {
            builder.parse_filters(spec);
        }
        None => {
            builder.filter_level(level);
            if level < LevelFilter::Trace {
                for module in NOISY_MODULES {
                    builder.filter_module(module, LevelFilter::Warn);
                }
            }
        }
    }
    apply_format(&mut builder, verbose);

    if builder.try_init().is_err() {
        log::debug!("Logger already installed; keeping the existing one");
        return;
    }

    match from_env {
        Some(spec) => log::debug!("Logging configured from RUST_LOG={spec}"),
        None => log::debug!("Logging at {level}"),
    }
}

/// Level implied by the CLI flags. `quiet` wins over `verbose`.
fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

#[cfg(debug_assertions)]
fn apply_format(builder: &mut Builder, verbose: u8) {
    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        let timestamp = buf.timestamp_seconds();
        if verbose >= 1 {
            writeln!(
                buf,
                "{timestamp} {style}{level:<5}{style:#} [{}] {}",
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(buf, "{timestamp} {style}{level:<5}{style:#} {}", record.args())
        }
    });
}

#[cfg(not(debug_assertions))]
fn apply_format(builder: &mut Builder, _verbose: u8) {
    builder.format(|buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        writeln!(buf, "{style}{level:<5}{style:#} {}", record.args())
    });
}

/// Name of the active maximum level, for `--version`-style diagnostics.
#[must_use]
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
