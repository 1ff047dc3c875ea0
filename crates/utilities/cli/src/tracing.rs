//! [tracing_subscriber] utilities.

use tracing_subscriber::{
    Layer,
    prelude::__tracing_subscriber_SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

use serde::{Deserialize, Serialize};
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;

use crate::{LogConfig, LogRotation};

const LOG_FILE_NAME: &str = "supervisor.log";

/// The format of the logs.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lowercase")]
pub enum LogFormat {
    /// Full format (default).
    #[default]
    Full,
    /// JSON format.
    Json,
    /// Pretty format.
    Pretty,
    /// Compact format.
    Compact,
}

impl LogConfig {
    /// Installs the global tracing subscriber.
    ///
    /// `env_filter` defaults to `RUST_LOG`; the configured global level is added on top.
    /// Fails if a global subscriber is already set.
    pub fn init_tracing_subscriber(
        &self,
        env_filter: Option<EnvFilter>,
    ) -> Result<(), TryInitError> {
        let file_layer = self.file_logs.as_ref().map(|file_logs| {
            let directory_path = file_logs.directory_path.clone();

            let appender = match file_logs.rotation {
                LogRotation::Minutely => rolling::minutely(directory_path, LOG_FILE_NAME),
                LogRotation::Hourly => rolling::hourly(directory_path, LOG_FILE_NAME),
                LogRotation::Daily => rolling::daily(directory_path, LOG_FILE_NAME),
                LogRotation::Never => rolling::never(directory_path, LOG_FILE_NAME),
            };

            match file_logs.format {
                LogFormat::Full => tracing_subscriber::fmt::layer().with_writer(appender).boxed(),
                LogFormat::Json => {
                    tracing_subscriber::fmt::layer().json().with_writer(appender).boxed()
                }
                LogFormat::Pretty => {
                    tracing_subscriber::fmt::layer().pretty().with_writer(appender).boxed()
                }
                LogFormat::Compact => {
                    tracing_subscriber::fmt::layer().compact().with_writer(appender).boxed()
                }
            }
        });

        let stdout_layer = self.stdout_logs.as_ref().map(|stdout_logs| match stdout_logs.format {
            LogFormat::Full => tracing_subscriber::fmt::layer().boxed(),
            LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer().pretty().boxed(),
            LogFormat::Compact => tracing_subscriber::fmt::layer().compact().boxed(),
        });

        let env_filter = env_filter
            .unwrap_or(EnvFilter::from_default_env())
            .add_directive(self.global_level.into());

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(stdout_layer)
            .try_init()?;

        Ok(())
    }
}

/// Best-effort subscriber for tests. Repeated calls are ignored.
pub fn init_test_tracing() {
    let _ = LogConfig::default().init_tracing_subscriber(None::<EnvFilter>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_names() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), r#""json""#);
        let format: LogFormat = serde_json::from_str(r#""compact""#).unwrap();
        assert_eq!(format, LogFormat::Compact);
        assert_eq!(LogFormat::default(), LogFormat::Full);
    }

    #[test]
    fn test_init_test_tracing_is_repeatable() {
        init_test_tracing();
        init_test_tracing();
    }
}
