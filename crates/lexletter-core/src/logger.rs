// Structured leveled logger.
//
// Lightweight stderr/stdout logger with level filtering, ANSI coloring, and a
// pluggable handler for applications that route logs elsewhere.

use std::fmt;
use std::sync::Arc;

/// Log severity, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Debug => "\x1b[35m",
            LogLevel::Info => "\x1b[34m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Custom sink for log records.
pub trait LogHandler: Send + Sync + fmt::Debug {
    fn handle(&self, level: LogLevel, message: &str);
}

/// Logger configuration.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub disabled: bool,
    pub disable_colors: bool,
    /// Minimum level to emit.
    pub level: LogLevel,
    /// Optional custom sink; replaces the default stderr/stdout output.
    pub handler: Option<Arc<dyn LogHandler>>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            disable_colors: false,
            level: LogLevel::Warn,
            handler: None,
        }
    }
}

/// The service logger shared through the application context.
#[derive(Clone)]
pub struct AppLogger {
    config: LoggerConfig,
}

impl fmt::Debug for AppLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppLogger")
            .field("level", &self.config.level)
            .field("disabled", &self.config.disabled)
            .finish()
    }
}

impl Default for AppLogger {
    fn default() -> Self {
        Self::new(LoggerConfig::default())
    }
}

impl AppLogger {
    pub fn new(config: LoggerConfig) -> Self {
        Self { config }
    }

    pub fn level(&self) -> LogLevel {
        self.config.level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        !self.config.disabled && level >= self.config.level
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }
        if let Some(ref handler) = self.config.handler {
            handler.handle(level, message);
            return;
        }
        let line = self.format(level, message);
        if level >= LogLevel::Warn {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    fn format(&self, level: LogLevel, message: &str) -> String {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        if self.config.disable_colors {
            format!("{timestamp} {} [LexLetter]: {message}", level.as_str())
        } else {
            format!(
                "\x1b[2m{timestamp}\x1b[0m {}{}\x1b[0m \x1b[1m[LexLetter]:\x1b[0m {message}",
                level.color_code(),
                level.as_str(),
            )
        }
    }
}
