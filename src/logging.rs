//! Logging setup
//!
//! The decoder logs through the `log` facade. Applications that already
//! install a logger get the records there; everyone else can call
//! [`init_logging`] to print them to stderr.

use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

/// Log verbosity, from quietest to noisiest
///
/// The numeric values are what `log_level` accepts in a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

const LEVELS: [LogLevel; 6] = [
    LogLevel::Off,
    LogLevel::Error,
    LogLevel::Warn,
    LogLevel::Info,
    LogLevel::Debug,
    LogLevel::Trace,
];

impl LogLevel {
    /// Level for a verbosity number, clamped to `0..=5`
    pub fn from_i32(level: i32) -> Self {
        LEVELS[level.clamp(0, LEVELS.len() as i32 - 1) as usize]
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if let Ok(n) = name.parse::<i32>() {
            return match usize::try_from(n).ok().and_then(|i| LEVELS.get(i)) {
                Some(level) => Ok(*level),
                None => Err(format!("log level {} out of range 0-5", n)),
            };
        }
        match name.to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" | "all" => Ok(LogLevel::Trace),
            _ => Err(format!("unknown log level '{}'", name)),
        }
    }
}

/// Writes `[Level] target: message` lines to stderr
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let stderr = std::io::stderr();
        let mut out = stderr.lock();
        let _ = writeln!(
            out,
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Install the stderr logger and set the verbosity
///
/// Calling this again only changes the level. Returns `false` if a
/// different logger was installed first; the level is still applied.
pub fn init_logging(level: LogLevel) -> bool {
    let installed = if INSTALLED.load(Ordering::Acquire) {
        true
    } else if log::set_logger(&LOGGER).is_ok() {
        INSTALLED.store(true, Ordering::Release);
        true
    } else {
        false
    };
    log::set_max_level(level.to_level_filter());
    installed
}
