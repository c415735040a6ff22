//! Logging infrastructure using tracing + tracing-subscriber
//!
//! Installs a global subscriber for programs embedding skein. Console output
//! is compact or JSON; file output is optional and written through a rolling,
//! non-blocking appender. `RUST_LOG` directives are honoured.
//!
//! [`TracingLogger`](crate::logger::TracingLogger) and
//! [`TracingTracer`](crate::trace::TracingTracer) emit through whatever
//! subscriber is installed.

use std::fs;
use std::io;
use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingSettings;
use crate::error::{Error, Result};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Keeps the file writer flushing until dropped
pub struct LogGuards {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber described by `settings`
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(settings: &LoggingSettings) -> Result<LogGuards> {
    let level = parse_level(&settings.level);

    let (file_layer, file_guard) = match &settings.file {
        Some(log_file) => {
            let (writer, guard) = open_log_file(log_file, settings.max_file_size_mb, settings.max_files)?;
            (Some(output_layer(writer, settings.json_format, false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_env_filter(level)?)
        .with(output_layer(io::stdout, settings.json_format, true))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))?;

    tracing::info!(
        level = %level,
        file = ?settings.file,
        json = settings.json_format,
        "Logging initialized"
    );

    Ok(LogGuards {
        _file_guard: file_guard,
    })
}

/// Compact console logging at `level`, for tests and small tools
pub fn init_simple(level: Level) -> Result<()> {
    tracing_subscriber::registry()
        .with(build_env_filter(level)?)
        .with(fmt::layer().compact())
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

/// Unknown names fall back to info; config validation rejects them earlier
fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn directive(text: &str) -> Result<Directive> {
    text.parse()
        .map_err(|e| Error::Config(format!("Invalid log directive '{}': {}", text, e)))
}

/// `RUST_LOG` (or `level`) plus `skein=<level>`
fn build_env_filter(level: Level) -> Result<EnvFilter> {
    let base = level.to_string().to_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&base));
    Ok(filter.add_directive(directive(&format!("skein={}", base))?))
}

fn output_layer<S, W>(writer: W, json: bool, console: bool) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_target(true);
    if json {
        Box::new(
            layer
                .json()
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE),
        )
    } else if console {
        Box::new(layer.with_ansi(true).compact())
    } else {
        Box::new(layer.with_ansi(false).with_thread_ids(true))
    }
}

/// Open a rotating appender for `log_file`, creating its directory
fn open_log_file(
    log_file: &str,
    max_size_mb: u64,
    max_files: u32,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let path = Path::new(log_file);
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(directory).map_err(|e| {
        Error::Config(format!("Failed to create log directory '{}': {}", directory.display(), e))
    })?;

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("skein.log");

    // Rotation is time based; small size limits rotate hourly
    let rotation = if max_size_mb > 0 && max_size_mb < 10 {
        Rotation::HOURLY
    } else {
        Rotation::DAILY
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(file_name)
        .max_log_files(max_files as usize)
        .build(directory)
        .map_err(|e| Error::Config(format!("Failed to create log file appender: {}", e)))?;

    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("invalid"), Level::INFO);
    }

    #[test]
    fn test_bad_directive() {
        assert!(build_env_filter(Level::DEBUG).is_ok());
        assert!(directive("skein=loudest").is_err());
    }

    #[test]
    fn test_log_file_directory_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("logs").join("test.log");

        let result = open_log_file(&log_path.to_string_lossy(), 100, 5);

        assert!(result.is_ok());
        assert!(temp_dir.path().join("logs").is_dir());
    }
}
