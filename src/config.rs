use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::logging::LogLevel;

/// Default time a chunk consumer has to take and finish each chunk
pub const DEFAULT_HANDOFF_TIMEOUT: Duration = Duration::from_secs(2);

/// Decoder options
///
/// The value is read-only once handed to a decoder; every decode call
/// builds its own traversal state from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Skip the pad byte that follows odd-sized chunks
    pub pad_odd_chunks: bool,
    /// How long to wait on the chunk consumer; `None` waits forever
    pub handoff_timeout: Option<Duration>,
    /// Verbosity for `init_logging`
    pub log_level: LogLevel,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            pad_odd_chunks: true,
            handoff_timeout: Some(DEFAULT_HANDOFF_TIMEOUT),
            log_level: LogLevel::Info,
        }
    }
}

impl DecoderConfig {
    /// Apply `key = value` lines on top of the current values
    ///
    /// `#` starts a comment. Unknown keys are logged and ignored.
    pub fn apply_properties(mut self, data: &str) -> Result<Self> {
        for (lineno, raw) in data.lines().enumerate() {
            let line = match raw.find('#') {
                Some(idx) => &raw[..idx],
                None => raw,
            }
            .trim();
            if line.is_empty() {
                continue;
            }

            let (key, value) = match line.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => anyhow::bail!("line {}: expected 'key = value'", lineno + 1),
            };

            match key {
                "pad_odd_chunks" => {
                    self.pad_odd_chunks = parse_bool(value)
                        .with_context(|| format!("line {}: pad_odd_chunks", lineno + 1))?;
                }
                "handoff_timeout_ms" => {
                    self.handoff_timeout = parse_timeout_ms(value)
                        .with_context(|| format!("line {}: handoff_timeout_ms", lineno + 1))?;
                }
                "log_level" => {
                    self.log_level = parse_log_level(value)
                        .with_context(|| format!("line {}: log_level", lineno + 1))?;
                }
                other => log::warn!("Ignoring unknown config key '{}'", other),
            }
        }
        Ok(self)
    }
}

/// Load decoder options from a property file, or the defaults if no path
/// is given
pub fn load_config(path: Option<&Path>) -> Result<DecoderConfig> {
    let Some(path) = path else {
        return Ok(DecoderConfig::default());
    };
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    DecoderConfig::default()
        .apply_properties(&data)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

/// Parse a boolean option value
pub fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => anyhow::bail!("Invalid boolean value '{}'", other),
    }
}

/// Parse a timeout in milliseconds; 0 disables the timeout
pub fn parse_timeout_ms(s: &str) -> Result<Option<Duration>> {
    let ms: u64 = s.trim().parse().context("Invalid timeout value")?;
    if ms == 0 {
        return Ok(None);
    }
    Ok(Some(Duration::from_millis(ms)))
}

/// Parse a log level name or number
pub fn parse_log_level(s: &str) -> Result<LogLevel> {
    s.parse::<LogLevel>().map_err(anyhow::Error::msg)
}
