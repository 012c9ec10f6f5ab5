/*!
 * Logging and tracing initialization
 *
 * Diagnostics go to stderr (or a JSON log file) so that stdout stays
 * reserved for command output and result tables.
 */

use std::fs::File;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::FleetConfig;
use crate::error::{NodectlError, Result};

/// Build the default filter directive for our own crates
fn default_directive(level: Level) -> String {
    format!("nodectl={level},nodectl_core_dispatch={level}")
}

/// Initialize structured logging from configuration
///
/// `verbose` forces `DEBUG` regardless of the configured level. `RUST_LOG`,
/// when set, takes precedence over both.
pub fn init_logging(config: &FleetConfig, verbose: bool) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(level)))
        .map_err(|e| NodectlError::Config(format!("Failed to create log filter: {}", e)))?;

    match config.log_file {
        Some(ref log_path) => init_file_logging(log_path, env_filter),
        None => {
            init_stderr_logging(env_filter);
            Ok(())
        }
    }
}

fn init_stderr_logging(env_filter: EnvFilter) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .ok();
}

fn init_file_logging(log_path: &Path, env_filter: EnvFilter) -> Result<()> {
    let file = File::create(log_path).map_err(|e| {
        NodectlError::Config(format!(
            "Failed to create log file {}: {}",
            log_path.display(),
            e
        ))
    })?;

    // Worker thread names show which dispatch slot served a node.
    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .ok();

    Ok(())
}

/// Initialize logging for tests
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(Level::DEBUG)));

        let fmt_layer = fmt::layer().with_test_writer().with_target(false).compact();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use tempfile::TempDir;

    #[test]
    fn test_default_directive() {
        assert_eq!(
            default_directive(Level::WARN),
            "nodectl=WARN,nodectl_core_dispatch=WARN"
        );
        assert!(EnvFilter::try_new(default_directive(Level::TRACE)).is_ok());
    }

    #[test]
    fn test_log_file_is_created() {
        init_test_logging();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nodectl.log");

        let config = FleetConfig {
            log_level: LogLevel::Debug,
            log_file: Some(path.clone()),
            ..Default::default()
        };

        // The global subscriber is already set; only the file is observable.
        init_logging(&config, false).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unwritable_log_file() {
        let config = FleetConfig {
            log_file: Some("/nonexistent/dir/nodectl.log".into()),
            ..Default::default()
        };

        let err = init_logging(&config, true).unwrap_err();
        assert!(matches!(err, NodectlError::Config(_)));
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Error.to_tracing_level(), Level::ERROR);
        assert_eq!(LogLevel::Warn.to_tracing_level(), Level::WARN);
        assert_eq!(LogLevel::Trace.to_tracing_level(), Level::TRACE);
    }
}
