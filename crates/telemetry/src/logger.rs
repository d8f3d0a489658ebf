use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::reload;
use tracing_subscriber::util::SubscriberInitExt;

use crate::TelemetryError;

/// File name prefix for rolling log files.
const LOG_FILE_PREFIX: &str = "redisub.log";

/// Custom time formatter that displays time as "YYYY-MM-DD HH:MM:SS.micros"
struct CustomTimeFormat;

impl FormatTime for CustomTimeFormat {
	fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
		let now = std::time::SystemTime::now();
		let datetime: chrono::DateTime<chrono::Local> = now.into();
		write!(w, "{}", datetime.format("[%Y-%m-%d %H:%M:%S%.6f]"))
	}
}

type ReloadHandle = reload::Handle<EnvFilter, Registry>;

static RELOAD_HANDLE: OnceLock<ReloadHandle> = OnceLock::new();

/// Initialize the logger with the provided log level
///
/// This sets up a console logger with:
/// - The log level from the `level` parameter
/// - Structured output with timestamps in format: YYYY-MM-DD HH:MM:SS.micros
/// - Thread ids, so events from different connection tasks can be told apart
///
/// When `log_dir` is given, events are additionally written to a daily
/// rolling file in that directory through a non-blocking writer. The returned
/// guard flushes that writer on drop and must be kept alive by the caller.
///
/// # Example
///
/// ```no_run
/// let _guard = telemetry::logger::init("info", None);
/// log::info!("Subscriber starting");
/// ```
pub fn init(level: &str, log_dir: Option<&Path>) -> Option<WorkerGuard> {
	let env_filter = EnvFilter::new(level);

	let (filter_layer, reload_handle) = reload::Layer::new(env_filter);
	let _ = RELOAD_HANDLE.set(reload_handle);

	let console_layer = fmt::layer()
		.with_timer(CustomTimeFormat)
		.with_target(false)
		.with_thread_ids(true)
		.with_line_number(false)
		.with_file(false);

	let (file_layer, guard) = match log_dir {
		Some(dir) => {
			let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
			let (writer, guard) = tracing_appender::non_blocking(appender);
			let layer = fmt::layer()
				.with_timer(CustomTimeFormat)
				.with_ansi(false)
				.with_target(true)
				.with_thread_ids(true)
				.with_writer(writer);
			(Some(layer.boxed()), Some(guard))
		}
		None => (None, None),
	};

	// Another subscriber may already be installed (tests, embedding apps).
	let _ = tracing_subscriber::registry()
		.with(filter_layer)
		.with(console_layer)
		.with(file_layer)
		.try_init();

	guard
}

/// Reload the log level dynamically
///
/// # Arguments
///
/// * `level` - The new log level to set. Valid values: trace, debug, info,
///   warn, error
///
/// # Errors
///
/// Returns an error if:
/// - The logger has not been initialized
/// - The provided log level is invalid
/// - The reload operation fails
pub fn reload_log_level(level: &str) -> Result<(), TelemetryError> {
	const VALID_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
	let level_lower = level.to_lowercase();

	if !VALID_LEVELS.contains(&level_lower.as_str()) {
		return Err(TelemetryError::InvalidLogLevel(level.to_string()));
	}

	let handle = RELOAD_HANDLE.get().ok_or(TelemetryError::NotInitialized)?;

	let new_filter = EnvFilter::new(&level_lower);
	handle
		.reload(new_filter)
		.map_err(|e| TelemetryError::ReloadFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	/// Valid levels pass validation and then fail on the missing handle,
	/// since init() is never called in unit tests.
	#[rstest]
	#[case("trace")]
	#[case("debug")]
	#[case("info")]
	#[case("warn")]
	#[case("error")]
	#[case("TRACE")]
	#[case("DeBuG")]
	fn test_valid_log_levels(#[case] level: &str) {
		let result = reload_log_level(level);
		assert!(
			matches!(result, Err(TelemetryError::NotInitialized)),
			"Expected NotInitialized for valid level: {}",
			level
		);
	}

	#[rstest]
	#[case("invalid")]
	#[case("warning")] // Common mistake (should be "warn")
	#[case("critical")]
	fn test_invalid_log_levels(#[case] level: &str) {
		let result = reload_log_level(level);
		assert!(
			matches!(result, Err(TelemetryError::InvalidLogLevel(_))),
			"Expected InvalidLogLevel for: {}",
			level
		);
	}
}
