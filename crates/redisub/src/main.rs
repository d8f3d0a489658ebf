mod config;
mod logo;
mod subscriber;

use std::path::Path;

use clap::Parser;
use tracing::error;
use tracing::warn;

use crate::config::CLIENT_CONF;
use crate::config::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	let args = Cli::parse();
	let config_path = config::setup(args)?;

	let config = CLIENT_CONF.snapshot();
	let _log_guard = telemetry::logger::init(&config.log_level, config.log_dir.as_deref().map(Path::new));

	let _metrics_guard = match config.otlp_endpoint.as_deref() {
		Some(endpoint) => match telemetry::metrics::init(endpoint) {
			Ok(guard) => Some(guard),
			Err(e) => {
				warn!("Metrics disabled: {}", e);
				None
			}
		},
		None => None,
	};

	logo::show_logo(&client_config!(url));

	if let Err(e) = subscriber::run(config_path).await {
		error!("Subscriber stopped: {}", e);
		return Err(e);
	}
	Ok(())
}
