//! Category-gated logging for the emulator core.
//!
//! The core never talks to a logger backend directly. Each message belongs to
//! a [`LogCategory`] whose level lives in the global [`LogConfig`]; messages
//! that pass the gate are handed to the `log` facade under a per-category
//! target, and the host installs whatever backend it wants (the CLI uses
//! `env_logger`).
//!
//! Messages are built lazily, so a disabled category costs one atomic load:
//!
//! ```rust
//! use emu6502_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Cpu, LogLevel::Debug, || {
//!     format!("CPU: BRK at PC={:04X}", 0x1234)
//! });
//! ```

use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use thiserror::Error;

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level '{0}' (expected off, error, warn, info, debug or trace)")]
pub struct UnknownLogLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "0" => Ok(LogLevel::Off),
            "error" | "err" | "1" => Ok(LogLevel::Error),
            "warn" | "warning" | "2" => Ok(LogLevel::Warn),
            "info" | "3" => Ok(LogLevel::Info),
            "debug" | "4" => Ok(LogLevel::Debug),
            "trace" | "5" => Ok(LogLevel::Trace),
            _ => Err(UnknownLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }

    /// The matching `log` crate level; `None` for `Off`.
    pub fn as_log_level(self) -> Option<::log::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(::log::Level::Error),
            LogLevel::Warn => Some(::log::Level::Warn),
            LogLevel::Info => Some(::log::Level::Info),
            LogLevel::Debug => Some(::log::Level::Debug),
            LogLevel::Trace => Some(::log::Level::Trace),
        }
    }

    /// Filter a `log` backend needs so that nothing at this level is lost.
    pub fn as_level_filter(self) -> ::log::LevelFilter {
        self.as_log_level()
            .map(|l| l.to_level_filter())
            .unwrap_or(::log::LevelFilter::Off)
    }
}

/// Emulator component a message comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Reset, halts, software traps, instruction execution
    Cpu,
    /// Region mapping and backend accesses
    Bus,
    /// Breakpoints, tracing, throughput reports
    Monitor,
}

impl LogCategory {
    pub const ALL: [LogCategory; 3] = [LogCategory::Cpu, LogCategory::Bus, LogCategory::Monitor];

    fn index(self) -> usize {
        match self {
            LogCategory::Cpu => 0,
            LogCategory::Bus => 1,
            LogCategory::Monitor => 2,
        }
    }

    /// `log` target used for messages in this category
    pub fn target(self) -> &'static str {
        match self {
            LogCategory::Cpu => "emu6502::cpu",
            LogCategory::Bus => "emu6502::bus",
            LogCategory::Monitor => "emu6502::monitor",
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    /// Applies to every category without its own level
    global_level: AtomicU8,
    /// Per-category overrides, `Off` meaning "use the global level"
    levels: [AtomicU8; 3],
}

impl LogConfig {
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            levels: [
                AtomicU8::new(LogLevel::Off as u8),
                AtomicU8::new(LogLevel::Off as u8),
                AtomicU8::new(LogLevel::Off as u8),
            ],
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.levels[category.index()].load(Ordering::Relaxed))
    }

    /// Highest level any category currently lets through.
    pub fn max_level(&self) -> LogLevel {
        LogCategory::ALL
            .iter()
            .map(|&c| self.level(c))
            .fold(self.global_level(), std::cmp::max)
    }

    /// A category with its own level uses it; otherwise the global level
    /// decides.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        let category_level = self.level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.global_level()
        }
    }

    /// Reset all logging to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }
}

/// Log a message with the specified category and level.
///
/// `message_fn` only runs when the category lets `level` through.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    if !LogConfig::global().should_log(category, level) {
        return;
    }
    if let Some(lvl) = level.as_log_level() {
        ::log::log!(target: category.target(), lvl, "{}", message_fn());
    }
}
