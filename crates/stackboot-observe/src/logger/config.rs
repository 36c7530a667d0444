use crate::logger::format::LoggerFormat;

pub const DEFAULT_LEVEL: &str = "warn";
pub const VERBOSE_LEVEL: &str = "debug";

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive, e.g. `info` or `stackboot_core=debug,warn`.
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl LoggerConfig {
    /// Operator-facing defaults: `debug` when verbose, `warn` otherwise.
    pub fn for_verbosity(verbose: bool) -> Self {
        Self {
            level: if verbose { VERBOSE_LEVEL } else { DEFAULT_LEVEL }.to_string(),
            ..Self::default()
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || atty::is(atty::Stream::Stdout);
        Self {
            format: LoggerFormat::Text,
            level: DEFAULT_LEVEL.to_string(),
            with_targets: false,
            use_color,
        }
    }
}
