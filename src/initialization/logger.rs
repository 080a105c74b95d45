//! Logger initialization.

use std::io::Write;

use crate::config::LogFormat;
use crate::error_handling::InitializationError;
use colored::*;
use log::{Level, LevelFilter};
use serde_json::json;

/// Dependency modules whose chatter is clamped regardless of the run level.
const CLAMPED_MODULES: &[(&str, LevelFilter)] = &[
    // Product pages are rarely valid HTML; the parser's complaints are noise
    ("html5ever", LevelFilter::Error),
    ("selectors", LevelFilter::Warn),
    ("reqwest", LevelFilter::Info),
    ("hyper", LevelFilter::Info),
    ("hyper_util", LevelFilter::Info),
];

/// Initializes the process-wide logger.
///
/// `RUST_LOG` is read first; `level` then overrides it, so `--log-level`
/// always wins over the environment.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already set.
///
/// # Examples
///
/// ```bash
/// # Debug output without touching the CLI
/// RUST_LOG=debug stock_watch catalog.json
///
/// # One JSON object per line for a log shipper
/// stock_watch catalog.json --log-format json
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    colored::control::set_override(true);

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    for (module, clamp) in CLAMPED_MODULES {
        builder.filter_module(module, (*clamp).min(level));
    }
    builder.filter_module("stock_watch", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                let line = json_line(
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    &record.args().to_string(),
                );
                writeln!(buf, "{line}")
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let line = plain_line(record.level(), record.target(), &record.args().to_string());
                writeln!(buf, "{line}")
            });
        }
    }

    builder.try_init().map_err(InitializationError::from)?;
    Ok(())
}

/// One log record as a JSON object: `ts` (epoch millis), `level`, `target`, `msg`.
fn json_line(ts: i64, level: Level, target: &str, msg: &str) -> String {
    json!({
        "ts": ts,
        "level": level.as_str(),
        "target": target,
        "msg": msg,
    })
    .to_string()
}

/// Emoji, coloured target and level, then the message.
fn plain_line(level: Level, target: &str, msg: &str) -> String {
    let (emoji, colored_level) = match level {
        Level::Error => ("❌", level.as_str().red()),
        Level::Warn => ("⚠️", level.as_str().yellow()),
        Level::Info => ("✔️", level.as_str().green()),
        Level::Debug => ("🔍", level.as_str().blue()),
        Level::Trace => ("🔬", level.as_str().purple()),
    };
    format!("{} {} [{}] {}", emoji, target.cyan(), colored_level, msg)
}
