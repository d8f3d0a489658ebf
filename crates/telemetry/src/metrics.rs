//! Pub/Sub metrics backed by OpenTelemetry instruments.
//!
//! Instruments are created from the global meter provider. Until [`init`]
//! installs a real provider the global one is a no-op, so recording is always
//! safe and never fails.

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use opentelemetry::metrics::UpDownCounter;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;

use crate::TelemetryError;

const METER_NAME: &str = "redisub";
const SERVICE_NAME: &str = "redisub";

/// Instruments tracking active subscriptions and received messages.
#[derive(Clone)]
pub struct SubscriptionMetrics {
	active: UpDownCounter<i64>,
	messages: Counter<u64>,
}

impl Default for SubscriptionMetrics {
	fn default() -> Self {
		Self::new()
	}
}

impl SubscriptionMetrics {
	pub fn new() -> Self {
		let meter = global::meter(METER_NAME);
		Self {
			active: meter
				.i64_up_down_counter("redisub.subscriptions.active")
				.with_description("Active Pub/Sub subscriptions by kind")
				.build(),
			messages: meter
				.u64_counter("redisub.messages.received")
				.with_description("Pub/Sub messages delivered to receivers")
				.build(),
		}
	}

	/// Adjust the active gauge for `kind` ("channel" or "pattern") by `delta`.
	pub fn add_active(&self, kind: &'static str, delta: i64) {
		self.active.add(delta, &[KeyValue::new("kind", kind)]);
	}

	pub fn record_message(&self) {
		self.messages.add(1, &[]);
	}
}

/// Keeps the installed meter provider alive and flushes it on drop.
pub struct MetricsGuard {
	provider: SdkMeterProvider,
}

impl Drop for MetricsGuard {
	fn drop(&mut self) {
		if let Err(e) = self.provider.shutdown() {
			log::warn!("Failed to shut down meter provider: {}", e);
		}
	}
}

/// Install an OTLP metrics pipeline exporting to `endpoint` over gRPC.
///
/// Must be called from within a tokio runtime.
pub fn init(endpoint: &str) -> Result<MetricsGuard, TelemetryError> {
	let exporter = opentelemetry_otlp::MetricExporter::builder()
		.with_tonic()
		.with_endpoint(endpoint)
		.build()
		.map_err(|e| TelemetryError::MetricsExporter(e.to_string()))?;

	let provider = SdkMeterProvider::builder()
		.with_periodic_exporter(exporter)
		.with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
		.build();
	global::set_meter_provider(provider.clone());

	Ok(MetricsGuard { provider })
}
