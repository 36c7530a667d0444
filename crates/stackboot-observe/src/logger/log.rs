use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::Dispatch;
use tracing_subscriber::{EnvFilter, fmt, fmt::time::OffsetTime, layer::SubscriberExt};

use crate::logger::{config::LoggerConfig, error::LoggerError};

pub struct Logger;

impl Logger {
    pub fn text(cfg: &LoggerConfig) -> Result<Dispatch, LoggerError> {
        let filter = mk_filter(&cfg.level)?;
        let fmt_layer = fmt::layer()
            .with_ansi(cfg.use_color)
            .with_target(cfg.with_targets)
            .with_timer(mk_timer());

        let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
        Ok(Dispatch::new(subscriber))
    }

    pub fn json(cfg: &LoggerConfig) -> Result<Dispatch, LoggerError> {
        let filter = mk_filter(&cfg.level)?;
        let fmt_layer = fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(mk_timer());

        let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
        Ok(Dispatch::new(subscriber))
    }

    pub fn journald(cfg: &LoggerConfig) -> Result<Dispatch, LoggerError> {
        let filter = mk_filter(&cfg.level)?;
        mk_journald(filter)
    }
}

fn mk_filter(level: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(level).map_err(|_| LoggerError::InvalidLogLevel(level.to_string()))
}

fn mk_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn mk_journald(filter: EnvFilter) -> Result<Dispatch, LoggerError> {
    let journald = tracing_journald::layer()
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))?;
    let subscriber = tracing_subscriber::registry().with(filter).with(journald);
    Ok(Dispatch::new(subscriber))
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn mk_journald(_filter: EnvFilter) -> Result<Dispatch, LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
