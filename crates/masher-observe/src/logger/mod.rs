mod config;
mod error;
mod format;
mod install;

pub use config::{ENV_LOG, ENV_LOG_FORMAT, LoggerConfig};
pub use error::LoggerError;
pub use format::LoggerFormat;

/// Install the global `tracing` subscriber described by `cfg`.
///
/// Fails when a global subscriber is already installed.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = install::filter(&cfg.level)?;
    match cfg.format {
        LoggerFormat::Text => install::text(cfg, filter),
        LoggerFormat::Json => install::json(cfg, filter),
        LoggerFormat::Journald => install::journald(filter),
    }
}
