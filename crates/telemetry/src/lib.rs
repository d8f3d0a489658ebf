pub mod logger;
pub mod metrics;

use thiserror::Error;

// Re-export logger initialization for convenience
pub use logger::init;
pub use logger::reload_log_level;

/// Errors raised while setting up or reconfiguring telemetry.
#[derive(Error, Debug)]
pub enum TelemetryError {
	#[error("Invalid log level: {0}")]
	InvalidLogLevel(String),

	#[error("Logger is not initialized")]
	NotInitialized,

	#[error("Failed to reload log level: {0}")]
	ReloadFailed(String),

	#[error("Failed to set up metrics exporter: {0}")]
	MetricsExporter(String),
}
