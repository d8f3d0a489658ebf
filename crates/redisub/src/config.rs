//! Configuration for the redisub subscriber
//!
//! Settings come from an optional file (TOML, JSON or YAML) with command-line
//! arguments layered on top, and are published through [`CLIENT_CONF`].
//! Sending SIGHUP re-reads the file; only the log level takes effect at
//! runtime, every other field keeps its startup value.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::OnceLock;

use arc_swap::ArcSwap;
use clap::Parser;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing::warn;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "conf/redisub.toml";
const DEFAULT_REDIS_PORT: u16 = 6379;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("Failed to read configuration file '{path}': {source}")]
	Io {
		source: std::io::Error,
		path: String,
	},

	#[error("Failed to parse TOML configuration: {0}")]
	TomlParse(#[from] toml::de::Error),

	#[error("Failed to parse JSON configuration: {0}")]
	JsonParse(#[from] serde_json::Error),

	#[error("Failed to parse YAML configuration: {0}")]
	YamlParse(#[from] serde_yaml::Error),

	#[error("Unsupported configuration format: {0}")]
	UnsupportedFormat(String),

	#[error("Configuration file has no extension")]
	NoExtension,

	#[error("Invalid Redis URL '{url}': {reason}")]
	InvalidUrl { url: String, reason: String },

	#[error("Invalid value for '{field}': {reason}")]
	InvalidValue { field: &'static str, reason: String },

	#[error("Failed to apply log level: {0}")]
	LogLevel(#[from] telemetry::TelemetryError),
}

/// Command-line arguments for the subscriber
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_version = crate::logo::LONG_VERSION)]
pub struct Cli {
	/// Configuration file path (TOML, JSON, or YAML).
	/// Defaults to conf/redisub.toml if it exists.
	#[arg(short, long)]
	pub config: Option<String>,

	/// Redis server URL, e.g. redis://127.0.0.1:6379
	#[arg(short, long)]
	pub url: Option<String>,

	/// Channel to subscribe to (repeatable)
	#[arg(long = "channel", value_name = "CHANNEL")]
	pub channels: Vec<String>,

	/// Glob pattern to subscribe to (repeatable)
	#[arg(long = "pattern", value_name = "PATTERN")]
	pub patterns: Vec<String>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long)]
	pub log_level: Option<String>,

	/// Directory for daily rolling log files
	#[arg(long)]
	pub log_dir: Option<String>,

	/// OTLP gRPC endpoint for metrics, e.g. http://localhost:4317
	#[arg(long)]
	pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
	pub url: String,
	pub channels: Vec<String>,
	pub patterns: Vec<String>,
	pub log_level: String,
	pub log_dir: Option<String>,
	pub otlp_endpoint: Option<String>,
	pub read_buffer_size: usize,
	pub pending_queue_capacity: usize,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			url: "redis://127.0.0.1:6379".into(),
			channels: Vec::new(),
			patterns: Vec::new(),
			log_level: "info".into(),
			log_dir: None,
			otlp_endpoint: None,
			read_buffer_size: pubsub::DEFAULT_READ_BUFFER_SIZE,
			pending_queue_capacity: 3,
		}
	}
}

impl ClientConfig {
	/// The `host:port` to connect to, taken from [`ClientConfig::url`].
	pub fn address(&self) -> Result<String, ConfigError> {
		let invalid = |reason: &str| ConfigError::InvalidUrl {
			url: self.url.clone(),
			reason: reason.to_string(),
		};

		let url = Url::parse(&self.url).map_err(|e| invalid(&e.to_string()))?;
		if url.scheme() != "redis" {
			return Err(invalid("scheme must be 'redis'"));
		}
		let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
		let port = url.port().unwrap_or(DEFAULT_REDIS_PORT);
		Ok(format!("{}:{}", host, port))
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		self.address()?;
		if self.read_buffer_size == 0 {
			return Err(ConfigError::InvalidValue {
				field: "read_buffer_size",
				reason: "must be greater than 0".into(),
			});
		}
		Ok(())
	}

	/// Merge a freshly loaded file into the running configuration.
	///
	/// Only the log level is applied; differences in other fields are
	/// reported and ignored.
	fn reloaded(&self, fresh: ClientConfig) -> Result<ClientConfig, ConfigError> {
		let mut next = self.clone();
		if fresh.log_level != self.log_level {
			telemetry::reload_log_level(&fresh.log_level)?;
			info!(from = %self.log_level, to = %fresh.log_level, "Log level changed");
			next.log_level = fresh.log_level.clone();
		}

		let restart_only = ClientConfig {
			log_level: next.log_level.clone(),
			..fresh
		};
		if restart_only != next {
			warn!("Configuration changes other than log_level require a restart");
		}
		Ok(next)
	}
}

pub struct GlobalConfig {
	inner: OnceLock<ArcSwap<ClientConfig>>,
}

impl GlobalConfig {
	pub const fn new() -> Self {
		Self {
			inner: OnceLock::new(),
		}
	}

	fn cell(&self) -> &ArcSwap<ClientConfig> {
		self.inner
			.get_or_init(|| ArcSwap::from_pointee(ClientConfig::default()))
	}

	pub fn init(&self, config: ClientConfig) {
		self.cell().store(Arc::new(config));
	}

	pub fn load(&self) -> arc_swap::Guard<Arc<ClientConfig>> {
		self.cell().load()
	}

	/// An owned copy of the current configuration, for long-lived holders.
	pub fn snapshot(&self) -> Arc<ClientConfig> {
		self.cell().load_full()
	}

	/// Update the configuration with a new one
	pub fn update(&self, new_config: ClientConfig) {
		self.cell().store(Arc::new(new_config));
	}
}

impl Default for GlobalConfig {
	fn default() -> Self {
		Self::new()
	}
}

pub static CLIENT_CONF: GlobalConfig = GlobalConfig::new();

/// Helper macro to access client configuration fields
///
/// Usage:
/// - For Copy types (numbers): `let n = client_config!(read_buffer_size);`
/// - For Borrowed types (Strings): `let s = &client_config!(url);`
#[macro_export]
macro_rules! client_config {
	($field:ident) => {
		$crate::config::CLIENT_CONF.load().$field
	};
}

/// Resolve, validate and publish the configuration.
///
/// Returns the file the configuration was read from, if any, so it can be
/// re-read later.
pub fn setup(args: Cli) -> Result<Option<PathBuf>, ConfigError> {
	let path = match args.config {
		Some(p) => Some(PathBuf::from(p)),
		None if Path::new(DEFAULT_CONFIG_PATH).exists() => Some(PathBuf::from(DEFAULT_CONFIG_PATH)),
		None => None,
	};
	let mut config = match &path {
		Some(p) => load_from_file(p)?,
		None => ClientConfig::default(),
	};

	// Override with CLI arguments if explicitly provided
	if let Some(url) = args.url {
		config.url = url;
	}
	if !args.channels.is_empty() {
		config.channels = args.channels;
	}
	if !args.patterns.is_empty() {
		config.patterns = args.patterns;
	}
	if let Some(log_level) = args.log_level {
		config.log_level = log_level;
	}
	if let Some(log_dir) = args.log_dir {
		config.log_dir = Some(log_dir);
	}
	if let Some(endpoint) = args.otlp_endpoint {
		config.otlp_endpoint = Some(endpoint);
	}

	config.validate()?;
	CLIENT_CONF.init(config);
	Ok(path)
}

/// Re-read `path` and apply what can change at runtime.
pub fn reload_from_file<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
	let fresh = load_from_file(path)?;
	let next = CLIENT_CONF.load().reloaded(fresh)?;
	CLIENT_CONF.update(next);
	Ok(())
}

fn load_from_file<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
	let path_ref = path.as_ref();
	let content = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
		path: path_ref.display().to_string(),
		source,
	})?;

	let extension = path_ref
		.extension()
		.and_then(|ext| ext.to_str())
		.ok_or(ConfigError::NoExtension)?;

	match extension.to_lowercase().as_str() {
		"toml" => Ok(toml::from_str(&content)?),
		"json" => Ok(serde_json::from_str(&content)?),
		"yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
		_ => Err(ConfigError::UnsupportedFormat(extension.to_string())),
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	use serial_test::serial;

	use super::*;

	fn write_config(name: &str, content: &str) -> (tempfile::TempDir, PathBuf) {
		let dir = tempfile::tempdir().unwrap();
		let file_path = dir.path().join(name);
		std::fs::write(&file_path, content).unwrap();
		(dir, file_path)
	}

	#[test]
	#[serial]
	fn test_config_singleton() {
		CLIENT_CONF.init(ClientConfig::default());

		let url = &client_config!(url);
		assert_eq!(url, "redis://127.0.0.1:6379");

		let size = client_config!(read_buffer_size);
		assert_eq!(size, pubsub::DEFAULT_READ_BUFFER_SIZE);
	}

	#[test]
	fn test_parse_toml() {
		let (_dir, path) = write_config(
			"redisub.toml",
			r#"
url = "redis://10.0.0.1:7000"
channels = ["news", "alerts"]
patterns = ["metrics.*"]
log_level = "debug"
"#,
		);

		let config = load_from_file(&path).unwrap();
		assert_eq!(config.url, "redis://10.0.0.1:7000");
		assert_eq!(config.channels, vec!["news", "alerts"]);
		assert_eq!(config.patterns, vec!["metrics.*"]);
		assert_eq!(config.log_level, "debug");
		assert_eq!(config.pending_queue_capacity, 3);
	}

	#[test]
	fn test_parse_json() {
		let (_dir, path) = write_config(
			"redisub.json",
			r#"
{
  "url": "redis://localhost",
  "channels": ["news"],
  "read_buffer_size": 16384
}
"#,
		);

		let config = load_from_file(&path).unwrap();
		assert_eq!(config.channels, vec!["news"]);
		assert_eq!(config.read_buffer_size, 16384);
		assert_eq!(config.log_level, "info");
	}

	#[test]
	fn test_parse_yaml() {
		let (_dir, path) = write_config(
			"redisub.yaml",
			r#"
url: "redis://localhost:6380"
patterns:
  - "a.*"
otlp_endpoint: "http://localhost:4317"
"#,
		);

		let config = load_from_file(&path).unwrap();
		assert_eq!(config.patterns, vec!["a.*"]);
		assert_eq!(config.otlp_endpoint.as_deref(), Some("http://localhost:4317"));
	}

	#[test]
	fn test_unsupported_format() {
		let (_dir, path) = write_config("redisub.ini", "url = x");
		assert!(matches!(
			load_from_file(&path),
			Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"
		));
	}

	#[rstest]
	#[case("redis://127.0.0.1:6379", "127.0.0.1:6379")]
	#[case("redis://localhost", "localhost:6379")]
	#[case("redis://:secret@cache.internal:7000/0", "cache.internal:7000")]
	fn test_address(#[case] url: &str, #[case] expected: &str) {
		let config = ClientConfig {
			url: url.into(),
			..Default::default()
		};
		assert_eq!(config.address().unwrap(), expected);
	}

	#[rstest]
	#[case("http://127.0.0.1:6379")]
	#[case("127.0.0.1:6379")]
	#[case("not a url")]
	fn test_invalid_url(#[case] url: &str) {
		let config = ClientConfig {
			url: url.into(),
			..Default::default()
		};
		assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));
	}

	#[test]
	fn test_zero_buffer_rejected() {
		let config = ClientConfig {
			read_buffer_size: 0,
			..Default::default()
		};
		assert!(matches!(
			config.validate(),
			Err(ConfigError::InvalidValue { field: "read_buffer_size", .. })
		));
	}

	#[test]
	#[serial]
	fn test_setup_cli_overrides_file() {
		let (_dir, path) = write_config(
			"redisub.toml",
			r#"
url = "redis://10.0.0.1:7000"
channels = ["from-file"]
"#,
		);

		let args = Cli {
			config: Some(path.display().to_string()),
			channels: vec!["from-cli".into()],
			log_level: Some("warn".into()),
			..Default::default()
		};
		assert_eq!(setup(args).unwrap(), Some(path));

		let config = CLIENT_CONF.load();
		assert_eq!(config.url, "redis://10.0.0.1:7000");
		assert_eq!(config.channels, vec!["from-cli"]);
		assert_eq!(config.log_level, "warn");
	}

	#[test]
	#[serial]
	fn test_reload_keeps_restart_only_fields() {
		CLIENT_CONF.init(ClientConfig::default());
		let (_dir, path) = write_config(
			"redisub.toml",
			r#"
url = "redis://elsewhere:6379"
channels = ["new"]
"#,
		);

		reload_from_file(&path).unwrap();
		let config = CLIENT_CONF.load();
		assert_eq!(config.url, "redis://127.0.0.1:6379");
		assert!(config.channels.is_empty());
	}

	#[test]
	#[serial]
	fn test_reload_rejects_invalid_log_level() {
		CLIENT_CONF.init(ClientConfig::default());
		let (_dir, path) = write_config("redisub.toml", r#"log_level = "loud""#);

		assert!(matches!(reload_from_file(&path), Err(ConfigError::LogLevel(_))));
		assert_eq!(CLIENT_CONF.load().log_level, "info");
	}
}
