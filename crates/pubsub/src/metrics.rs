use telemetry::metrics::SubscriptionMetrics;

use crate::target::SubscriptionKind;

/// Observability sink for subscription activity.
///
/// Calls are fire-and-forget; implementations must not fail or block.
pub trait MetricsSink: Send + Sync {
	fn increment_active(&self, kind: SubscriptionKind);
	fn decrement_active(&self, kind: SubscriptionKind);
	fn message_received(&self);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
	fn increment_active(&self, _kind: SubscriptionKind) {}

	fn decrement_active(&self, _kind: SubscriptionKind) {}

	fn message_received(&self) {}
}

impl MetricsSink for SubscriptionMetrics {
	fn increment_active(&self, kind: SubscriptionKind) {
		self.add_active(kind.as_str(), 1);
	}

	fn decrement_active(&self, kind: SubscriptionKind) {
		self.add_active(kind.as_str(), -1);
	}

	fn message_received(&self) {
		self.record_message();
	}
}
