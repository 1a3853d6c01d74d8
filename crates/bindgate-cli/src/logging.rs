//! Log subscriber setup
//!
//! Console output plus, when a log directory is configured, `error.log`
//! (errors only) and `combined.log` (everything the filter lets through).

use anyhow::Context;
use bindgate_core::config::{LogFormat, LoggingConfig};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{
    filter::LevelFilter, fmt, prelude::*, registry::Registry, EnvFilter, Layer,
};

pub const ERROR_LOG: &str = "error.log";
pub const COMBINED_LOG: &str = "combined.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(build_layers(config)?)
        .with(filter)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(())
}

/// Output layers for `config`, without the level filter
pub fn build_layers(config: &LoggingConfig) -> anyhow::Result<Vec<BoxedLayer>> {
    let mut layers = Vec::new();

    // Production only goes quiet when the files can take over
    if !(config.production && config.directory.is_some()) {
        layers.push(console_layer(config.format));
    }

    if let Some(dir) = &config.directory {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

        let errors = open_log(&dir.join(ERROR_LOG))?;
        layers.push(
            file_layer(config.format, errors)
                .with_filter(LevelFilter::ERROR)
                .boxed(),
        );

        let combined = open_log(&dir.join(COMBINED_LOG))?;
        layers.push(file_layer(config.format, combined));
    }

    Ok(layers)
}

fn console_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Pretty => fmt::layer().with_target(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_target(true).boxed(),
    }
}

fn file_layer(format: LogFormat, file: File) -> BoxedLayer {
    let writer = Mutex::new(file);
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
    }
}

fn open_log(path: &Path) -> anyhow::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_console_only_by_default() {
        let layers = build_layers(&LoggingConfig::default()).unwrap();
        assert_eq!(layers.len(), 1);

        // Nowhere else to write, so production keeps the console
        let config = LoggingConfig {
            production: true,
            ..Default::default()
        };
        assert_eq!(build_layers(&config).unwrap().len(), 1);
    }

    #[test]
    fn test_log_files_split_by_level() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("logs");
        let config = LoggingConfig {
            directory: Some(dir.clone()),
            production: true,
            ..Default::default()
        };

        let layers = build_layers(&config).unwrap();
        assert_eq!(layers.len(), 2);

        let subscriber = tracing_subscriber::registry().with(layers);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("request served");
            tracing::error!("directory unreachable");
        });

        let errors = fs::read_to_string(dir.join(ERROR_LOG)).unwrap();
        assert!(errors.contains("directory unreachable"));
        assert!(!errors.contains("request served"));

        let combined = fs::read_to_string(dir.join(COMBINED_LOG)).unwrap();
        assert!(combined.contains("directory unreachable"));
        assert!(combined.contains("request served"));
    }

    #[test]
    fn test_json_file_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            format: LogFormat::Json,
            directory: Some(tmp.path().to_path_buf()),
            production: true,
            ..Default::default()
        };

        let subscriber = tracing_subscriber::registry().with(build_layers(&config).unwrap());
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(outcome = "service_unavailable", "login failed");
        });

        let errors = fs::read_to_string(tmp.path().join(ERROR_LOG)).unwrap();
        let line = errors.lines().next().unwrap();
        assert!(line.starts_with('{'));
        assert!(line.contains("service_unavailable"));
    }
}
