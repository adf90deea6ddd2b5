//! Process-wide file logging for feed store diagnostics.
//!
//! # Responsibility
//! - Start a rotating file logger at most once per process.
//! - Capture panics (including worker completion panics) into the log.
//!
//! # Invariants
//! - Repeating `init_logging` with an identical config is a no-op.
//! - A conflicting re-initialization is rejected, never applied.
//! - Log lines carry metadata only (counts, durations, codes), never feed
//!   content such as descriptions or urls.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const LOG_FILE_BASENAME: &str = "feedstore";
const DEFAULT_MAX_FILE_BYTES: u64 = 4 * 1024 * 1024;
const DEFAULT_KEPT_FILES: usize = 3;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    config: LoggingConfig,
    _handle: LoggerHandle,
}

/// File logger settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`, case-insensitive.
    pub level: String,
    /// Absolute directory for rotated log files.
    pub directory: PathBuf,
    pub max_file_bytes: u64,
    pub kept_files: usize,
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            level: level.into(),
            directory: directory.into(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            kept_files: DEFAULT_KEPT_FILES,
        }
    }

    fn normalized(&self) -> Result<Self, LoggingError> {
        let level = normalize_level(&self.level)?;
        if !self.directory.is_absolute() {
            return Err(LoggingError::RelativeDirectory(self.directory.clone()));
        }
        Ok(Self {
            level: level.to_string(),
            directory: self.directory.clone(),
            max_file_bytes: self.max_file_bytes.max(1),
            kept_files: self.kept_files.max(1),
        })
    }
}

/// Logging bootstrap failure.
#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    RelativeDirectory(PathBuf),
    CreateDirectory {
        directory: PathBuf,
        source: std::io::Error,
    },
    Backend(flexi_logger::FlexiLoggerError),
    /// Logging is already active with different settings.
    Conflict {
        active: Box<LoggingConfig>,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::RelativeDirectory(directory) => write!(
                f,
                "log directory must be absolute, got `{}`",
                directory.display()
            ),
            Self::CreateDirectory { directory, source } => write!(
                f,
                "failed to create log directory `{}`: {source}",
                directory.display()
            ),
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::Conflict { active } => write!(
                f,
                "logging already initialized at `{}` with level `{}`; refusing to reconfigure",
                active.directory.display(),
                active.level
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDirectory { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

/// Starts file logging for the process.
///
/// # Errors
/// - Invalid level or relative directory.
/// - Directory creation or logger backend failure.
/// - `Conflict` when already initialized with a different config.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let requested = config.normalized()?;

    let active = ACTIVE_LOGGER.get_or_try_init(|| start_logger(requested.clone()))?;
    if active.config != requested {
        return Err(LoggingError::Conflict {
            active: Box::new(active.config.clone()),
        });
    }

    Ok(())
}

/// Returns the active logging config, or `None` before initialization.
pub fn logging_status() -> Option<LoggingConfig> {
    ACTIVE_LOGGER.get().map(|active| active.config.clone())
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(config: LoggingConfig) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&config.directory).map_err(|source| {
        LoggingError::CreateDirectory {
            directory: config.directory.clone(),
            source,
        }
    })?;

    let handle = Logger::try_with_str(config.level.as_str())
        .map_err(LoggingError::Backend)?
        .log_to_file(
            FileSpec::default()
                .directory(config.directory.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(config.max_file_bytes),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config.kept_files),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    install_panic_hook_once();

    info!(
        "event=logging_init module=core status=ok level={} version={} platform={}",
        config.level,
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );

    Ok(ActiveLogger {
        config,
        _handle: handle,
    })
}

fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(LoggingError::UnsupportedLevel(other.to_string())),
    }
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.set(()).is_err() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let thread_name = std::thread::current()
            .name()
            .unwrap_or("unnamed")
            .to_string();
        error!(
            "event=panic_captured module=core status=error thread={} location={} payload={}",
            thread_name,
            location,
            panic_payload_summary(panic_info)
        );
        previous_hook(panic_info);
    }));
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}
