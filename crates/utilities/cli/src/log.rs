//! Log flags and the resolved log configuration.

use crate::LogFormat;
use clap::{ArgAction, Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// How often the log file rolls over.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lowercase")]
pub enum LogRotation {
    /// Roll every minute.
    Minutely,
    /// Roll every hour.
    Hourly,
    /// Roll every day.
    Daily,
    /// Never roll.
    #[default]
    Never,
}

/// Global logging flags shared by the binaries.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct LogArgs {
    /// Verbosity level (1 = ERROR .. 5 = TRACE). Repeat `-v` to raise it.
    #[arg(short = 'v', long = "verbosity", global = true, default_value_t = 3, action = ArgAction::Count)]
    pub level: u8,

    /// Silence stdout logs.
    #[arg(long = "quiet", short = 'q', global = true, env = "LOG_QUIET")]
    pub stdout_quiet: bool,

    /// Format of stdout logs.
    #[arg(long = "logs.stdout.format", global = true, default_value = "full", env = "LOG_STDOUT_FORMAT")]
    pub stdout_format: LogFormat,

    /// Directory for log files. File logging is off when unset.
    #[arg(long = "logs.file.directory", global = true, env = "LOG_FILE_DIRECTORY")]
    pub file_directory: Option<PathBuf>,

    /// Format of file logs.
    #[arg(long = "logs.file.format", global = true, default_value = "full", env = "LOG_FILE_FORMAT")]
    pub file_format: LogFormat,

    /// Rotation of file logs.
    #[arg(long = "logs.file.rotation", global = true, default_value = "never", env = "LOG_FILE_ROTATION")]
    pub file_rotation: LogRotation,
}

impl Default for LogArgs {
    fn default() -> Self {
        Self {
            level: 3,
            stdout_quiet: false,
            stdout_format: LogFormat::Full,
            file_directory: None,
            file_format: LogFormat::Full,
            file_rotation: LogRotation::Never,
        }
    }
}

/// Stdout log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdoutLogConfig {
    /// Output format.
    pub format: LogFormat,
}

/// File log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogConfig {
    /// Directory the log files are written to.
    pub directory_path: PathBuf,
    /// Output format.
    pub format: LogFormat,
    /// Rotation policy.
    pub rotation: LogRotation,
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Level applied on top of any `RUST_LOG` directives.
    pub global_level: LevelFilter,
    /// Stdout output, if enabled.
    pub stdout_logs: Option<StdoutLogConfig>,
    /// File output, if enabled.
    pub file_logs: Option<FileLogConfig>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new(LogArgs::default())
    }
}

impl LogConfig {
    /// Resolves [`LogArgs`] into a [`LogConfig`].
    pub fn new(args: LogArgs) -> Self {
        let global_level = match args.level {
            0 => LevelFilter::OFF,
            1 => LevelFilter::ERROR,
            2 => LevelFilter::WARN,
            3 => LevelFilter::INFO,
            4 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };

        let stdout_logs = (!args.stdout_quiet).then_some(StdoutLogConfig { format: args.stdout_format });
        let file_logs = args.file_directory.map(|directory_path| FileLogConfig {
            directory_path,
            format: args.file_format,
            rotation: args.file_rotation,
        });

        Self { global_level, stdout_logs, file_logs }
    }
}
