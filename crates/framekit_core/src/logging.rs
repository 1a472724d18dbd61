//! Process-wide log sink for framework lifecycle records.
//!
//! # Responsibility
//! - Resolve a level and directory from explicit arguments or from a
//!   [`FrameworkConfig`].
//! - Start one rolling file sink per process for the `event=... module=...`
//!   records emitted by the class registry, bundle manager and facade.
//!
//! # Invariants
//! - The sink starts at most once; a repeat call with the same settings is
//!   a no-op and any other settings are rejected.
//! - Initialization returns errors instead of panicking.

use crate::config::FrameworkConfig;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "framekit";
const ROTATE_AT_BYTES: u64 = 4 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 3;
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

static ACTIVE_SINK: OnceCell<ActiveSink> = OnceCell::new();

struct ActiveSink {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Resolved sink settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: &'static str,
    pub log_dir: PathBuf,
}

impl LogSettings {
    /// Validates a level name and an absolute directory.
    pub fn new(level: &str, log_dir: impl AsRef<Path>) -> Result<Self, LoggingError> {
        Ok(Self {
            level: parse_level(level)?,
            log_dir: absolute_dir(log_dir.as_ref())?,
        })
    }

    /// Settings named by `config`.
    ///
    /// `config.log_dir` wins over `fallback_dir`. Without `log_level` the
    /// build default applies, and `debug` lifts anything quieter to `debug`.
    pub fn from_config(config: &FrameworkConfig, fallback_dir: &Path) -> Result<Self, LoggingError> {
        let mut level = match config.log_level.as_deref() {
            Some(level) => parse_level(level)?,
            None => default_log_level(),
        };
        if config.debug && !matches!(level, "trace" | "debug") {
            level = "debug";
        }
        let log_dir = match config.log_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => absolute_dir(Path::new(dir))?,
            _ => absolute_dir(fallback_dir)?,
        };
        Ok(Self { level, log_dir })
    }
}

/// Log sink errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    UnknownLevel(String),
    RelativeDir(PathBuf),
    /// The sink is already running with other settings.
    AlreadyActive {
        active: LogSettings,
        requested: LogSettings,
    },
    Sink(String),
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unknown log level `{level}`; expected one of {}",
                LEVELS.join("|")
            ),
            Self::RelativeDir(dir) => {
                write!(f, "log directory must be absolute, got `{}`", dir.display())
            }
            Self::AlreadyActive { active, requested } => write!(
                f,
                "log sink already active at `{}` level {}; cannot switch to `{}` level {}",
                active.log_dir.display(),
                active.level,
                requested.log_dir.display(),
                requested.level
            ),
            Self::Sink(message) => write!(f, "log sink failed to start: {message}"),
        }
    }
}

impl Error for LoggingError {}

/// Starts the process log sink at `level` under `log_dir`.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), LoggingError> {
    start_sink(LogSettings::new(level, log_dir.trim())?).map(|_| ())
}

/// Starts the process log sink from framework settings and returns the
/// settings in effect.
pub fn init_logging_from_config(
    config: &FrameworkConfig,
    fallback_dir: &Path,
) -> Result<LogSettings, LoggingError> {
    start_sink(LogSettings::from_config(config, fallback_dir)?)
}

/// Level and directory of the running sink, if any.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE_SINK
        .get()
        .map(|sink| (sink.settings.level, sink.settings.log_dir.clone()))
}

/// `debug` in debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_sink(requested: LogSettings) -> Result<LogSettings, LoggingError> {
    let sink = ACTIVE_SINK.get_or_try_init(|| open_sink(requested.clone()))?;
    if sink.settings != requested {
        return Err(LoggingError::AlreadyActive {
            active: sink.settings.clone(),
            requested,
        });
    }
    Ok(requested)
}

fn open_sink(settings: LogSettings) -> Result<ActiveSink, LoggingError> {
    std::fs::create_dir_all(&settings.log_dir)
        .map_err(|err| LoggingError::Sink(format!("{}: {err}", settings.log_dir.display())))?;

    let handle = Logger::try_with_str(settings.level)
        .map_err(|err| LoggingError::Sink(err.to_string()))?
        .log_to_file(
            FileSpec::default()
                .directory(settings.log_dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Sink(err.to_string()))?;

    info!(
        "event=logging_init module=framework status=ok level={} log_dir={} version={}",
        settings.level,
        settings.log_dir.display(),
        env!("CARGO_PKG_VERSION")
    );
    Ok(ActiveSink {
        settings,
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<&'static str, LoggingError> {
    let lowered = level.trim().to_ascii_lowercase();
    let lowered = if lowered == "warning" { "warn".to_string() } else { lowered };
    LEVELS
        .iter()
        .copied()
        .find(|known| *known == lowered)
        .ok_or(LoggingError::UnknownLevel(lowered))
}

fn absolute_dir(dir: &Path) -> Result<PathBuf, LoggingError> {
    if !dir.is_absolute() {
        return Err(LoggingError::RelativeDir(dir.to_path_buf()));
    }
    Ok(dir.to_path_buf())
}
