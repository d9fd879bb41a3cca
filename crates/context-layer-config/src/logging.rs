//! Global tracing subscriber setup.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::{ConfigError, LogFormat, LoggingConfig};

/// Install the process-wide tracing subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over `config.level`. Output goes to stderr
/// unless `config.file` is set, in which case lines are appended to it.
/// Calling this a second time returns an error instead of replacing the
/// installed subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match (&config.file, &config.format) {
        (Some(path), format) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ConfigError::write_file(path, e))?;
            let builder = builder.with_ansi(false).with_writer(Mutex::new(file));
            match format {
                LogFormat::Json => builder.json().try_init(),
                LogFormat::Text => builder.try_init(),
            }
        }
        (None, LogFormat::Json) => builder.with_writer(std::io::stderr).json().try_init(),
        (None, LogFormat::Text) => builder
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .try_init(),
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}
