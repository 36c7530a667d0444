mod config;
mod error;
mod format;
mod log;

pub use config::{DEFAULT_LEVEL, LoggerConfig, VERBOSE_LEVEL};
pub use error::LoggerError;
pub use format::LoggerFormat;

use tracing::Dispatch;

/// Build a dispatcher for `cfg` without installing it.
///
/// Callers scope work to it with [`tracing::instrument::WithSubscriber`] or
/// [`tracing::dispatcher::with_default`].
pub fn logger_dispatch(cfg: &LoggerConfig) -> Result<Dispatch, LoggerError> {
    match cfg.format {
        LoggerFormat::Text => log::Logger::text(cfg),
        LoggerFormat::Json => log::Logger::json(cfg),
        LoggerFormat::Journald => log::Logger::journald(cfg),
    }
}

/// Build a dispatcher for `cfg` and install it process-wide.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let dispatch = logger_dispatch(cfg)?;
    tracing::dispatcher::set_global_default(dispatch).map_err(|_| LoggerError::AlreadyInitialized)
}
