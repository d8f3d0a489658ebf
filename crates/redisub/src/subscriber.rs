use std::path::PathBuf;
use std::sync::Arc;

use pubsub::MetricsSink;
use pubsub::NoopMetrics;
use pubsub::PubSubClient;
use pubsub::PubSubEvent;
use pubsub::SubscriptionTarget;
use pubsub::UnsubscribeSource;
use resp::RespValue;
use telemetry::metrics::SubscriptionMetrics;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config;
use crate::config::CLIENT_CONF;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connect, subscribe to everything configured, and log events until Ctrl-C
/// or until the connection fails.
pub async fn run(config_path: Option<PathBuf>) -> Result<(), BoxError> {
	let config = CLIENT_CONF.snapshot();
	let address = config.address()?;

	let metrics: Arc<dyn MetricsSink> = if config.otlp_endpoint.is_some() {
		Arc::new(SubscriptionMetrics::new())
	} else {
		Arc::new(NoopMetrics)
	};

	let (connection, client) = pubsub::connect(&address).await?;
	let connection = connection
		.with_metrics(metrics)
		.with_read_buffer_size(config.read_buffer_size)
		.with_queue_capacity(config.pending_queue_capacity);
	info!("Connected to {}", address);
	let mut task = tokio::spawn(connection.run());

	#[cfg(unix)]
	spawn_reload_handler(config_path);
	#[cfg(not(unix))]
	let _ = config_path;

	if config.channels.is_empty() && config.patterns.is_empty() {
		warn!("No channels or patterns configured, waiting for shutdown");
	}
	if !config.channels.is_empty() {
		let target = SubscriptionTarget::channels(config.channels.clone());
		let count = client.add_subscription(target, log_event).await?;
		info!(subscriptions = count, "Subscribed to channels");
	}
	if !config.patterns.is_empty() {
		let target = SubscriptionTarget::patterns(config.patterns.clone());
		let count = client.add_subscription(target, log_event).await?;
		info!(subscriptions = count, "Subscribed to patterns");
	}

	tokio::select! {
		joined = &mut task => {
			return match joined {
				Ok(result) => result.map_err(Into::into),
				Err(e) => Err(e.into()),
			};
		}
		signal = tokio::signal::ctrl_c() => {
			signal?;
			info!("Received shutdown signal");
		}
	}

	shutdown(&client).await;
	task.await??;
	Ok(())
}

async fn shutdown(client: &PubSubClient) {
	for target in [SubscriptionTarget::all_channels(), SubscriptionTarget::all_patterns()] {
		let kind = target.kind();
		match client.remove_subscription(target).await {
			Ok(remaining) => debug!(%kind, remaining, "Unsubscribed"),
			Err(e) => warn!(%kind, "Failed to unsubscribe: {}", e),
		}
	}
	client.close().await;
}

#[cfg(unix)]
fn spawn_reload_handler(config_path: Option<PathBuf>) {
	use tokio::signal::unix::SignalKind;
	use tokio::signal::unix::signal;

	tokio::spawn(async move {
		let mut hangup = match signal(SignalKind::hangup()) {
			Ok(s) => s,
			Err(e) => {
				error!("Failed to install SIGHUP handler: {}", e);
				return;
			}
		};

		while hangup.recv().await.is_some() {
			let Some(path) = config_path.as_ref() else {
				info!("Received SIGHUP but no config file is in use");
				continue;
			};
			info!("Received SIGHUP, reloading {}", path.display());
			if let Err(e) = config::reload_from_file(path) {
				warn!("Failed to reload configuration: {}", e);
			}
		}
	});
}

fn log_event(event: PubSubEvent) {
	match event {
		PubSubEvent::Subscribed { key, current_count } => {
			info!(key = %String::from_utf8_lossy(&key), count = current_count, "Subscribed");
		}
		PubSubEvent::Unsubscribed {
			key,
			current_count,
			source: UnsubscribeSource::UserInitiated,
		} => {
			info!(key = %String::from_utf8_lossy(&key), count = current_count, "Unsubscribed");
		}
		PubSubEvent::Unsubscribed {
			key,
			source: UnsubscribeSource::ClientError(e),
			..
		} => {
			warn!(key = %String::from_utf8_lossy(&key), error = %e, "Subscription dropped");
		}
		PubSubEvent::Message {
			publisher,
			pattern,
			payload,
		} => {
			let pattern = pattern.map(|p| String::from_utf8_lossy(&p).into_owned());
			info!(
				publisher = %String::from_utf8_lossy(&publisher),
				pattern = ?pattern,
				"{}",
				describe(&payload)
			);
		}
	}
}

fn describe(payload: &RespValue) -> String {
	match payload {
		RespValue::Array(items) => {
			let parts: Vec<_> = items.iter().map(describe).collect();
			format!("[{}]", parts.join(", "))
		}
		RespValue::Integer(i) => i.to_string(),
		RespValue::Null => "(nil)".into(),
		other => other.to_string_lossy().unwrap_or_default(),
	}
}
