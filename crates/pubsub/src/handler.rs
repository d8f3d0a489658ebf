//! The Pub/Sub state machine sitting between a connection and its users.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use futures::future;
use log::debug;
use log::trace;
use log::warn;
use resp::RespValue;

use crate::error::PubSubError;
use crate::event::EventReceiver;
use crate::event::PubSubEvent;
use crate::event::UnsubscribeSource;
use crate::frame::Inbound;
use crate::frame::PubSubFrame;
use crate::frame::classify;
use crate::metrics::MetricsSink;
use crate::metrics::NoopMetrics;
use crate::pending::PendingChanges;
use crate::pending::PendingKey;
use crate::pending::PendingQueue;
use crate::pending::SubscriptionFuture;
use crate::pending::aggregate;
use crate::registry::Registry;
use crate::target::SubscriptionKey;
use crate::target::SubscriptionKind;
use crate::target::SubscriptionTarget;
use crate::transport::CommandSink;

#[derive(Debug, Clone, PartialEq)]
pub enum HandlerState {
	/// Attached and accepting changes.
	Default,
	/// Detached by its owner.
	Removed,
	/// The connection failed with the given cause.
	Error(PubSubError),
}

/// Tracks subscriptions for one connection and routes Pub/Sub traffic.
///
/// Outbound, it turns subscription changes into SUBSCRIBE/UNSUBSCRIBE
/// commands written to a [`CommandSink`]. Inbound, it consumes Pub/Sub frames
/// and hands every other value back to the caller.
///
/// Once the handler leaves [`HandlerState::Default`] it never returns there:
/// all subscriptions are dropped, pending changes fail, and further changes
/// are rejected.
pub struct PubSubHandler {
	state: HandlerState,
	registry: Registry,
	pending: PendingChanges,
	sink: Option<Box<dyn CommandSink>>,
	metrics: Arc<dyn MetricsSink>,
}

impl fmt::Debug for PubSubHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PubSubHandler")
			.field("state", &self.state)
			.field("subscriptions", &self.registry.len())
			.field("pending", &self.pending.len())
			.finish()
	}
}

impl PubSubHandler {
	pub fn new(sink: impl CommandSink + 'static) -> Self {
		Self {
			state: HandlerState::Default,
			registry: Registry::default(),
			pending: PendingChanges::default(),
			sink: Some(Box::new(sink)),
			metrics: Arc::new(NoopMetrics),
		}
	}

	pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
		self.metrics = metrics;
		self
	}

	/// Presize the pending-change queues.
	pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
		self.pending = PendingChanges::with_capacity(capacity);
		self
	}

	pub fn state(&self) -> &HandlerState {
		&self.state
	}

	/// Registered entries of `kind`, including those not yet acknowledged.
	pub fn subscription_count(&self, kind: SubscriptionKind) -> usize {
		self.registry.count(kind)
	}

	pub fn total_subscriptions(&self) -> usize {
		self.registry.len()
	}

	/// Subscribe `receiver` to every name in `target`.
	///
	/// Names that are already registered only have their receiver replaced.
	/// If no name is new, nothing is sent and the future resolves right away
	/// with the number of registered entries. An empty target resolves the
	/// same way.
	pub fn add_subscription(
		&mut self,
		target: SubscriptionTarget,
		receiver: Arc<dyn EventReceiver>,
	) -> SubscriptionFuture {
		if let Err(e) = self.ensure_active() {
			return future::ready(Err(e)).boxed();
		}

		let kind = target.kind();
		let mut fresh = Vec::new();
		for name in target.into_names() {
			let key = SubscriptionKey::new(kind, name.clone());
			if self.registry.upsert(key, receiver.clone()) {
				fresh.push(name);
			}
		}

		if fresh.is_empty() {
			return future::ready(Ok(self.registry.len())).boxed();
		}

		let command = RespValue::command(kind.subscribe_command(), fresh.iter().cloned());
		if let Err(e) = self.send(command) {
			for name in fresh {
				self.registry.remove(&SubscriptionKey::new(kind, name));
			}
			return future::ready(Err(e)).boxed();
		}

		debug!("Subscribing to {} {}(s)", fresh.len(), kind);
		let waiters = fresh
			.into_iter()
			.map(|name| {
				let key = PendingKey::Target(SubscriptionKey::new(kind, name));
				self.pending.register(PendingQueue::Subscribe, key)
			})
			.collect();
		aggregate(waiters)
	}

	/// Unsubscribe from every name in `target`, or from everything of the
	/// target's kind if it names nothing.
	///
	/// Entries stay registered, and keep receiving messages, until the server
	/// acknowledges the change. Outside [`HandlerState::Default`] everything is
	/// already unsubscribed, so this resolves with 0.
	pub fn remove_subscription(&mut self, target: SubscriptionTarget) -> SubscriptionFuture {
		if self.state != HandlerState::Default {
			return future::ready(Ok(0)).boxed();
		}

		let kind = target.kind();
		let names = target.into_names();
		let command = RespValue::command(kind.unsubscribe_command(), names.iter().cloned());
		if let Err(e) = self.send(command) {
			return future::ready(Err(e)).boxed();
		}

		let waiters = if names.is_empty() {
			debug!("Unsubscribing from all {}s", kind);
			vec![self.pending.register(PendingQueue::Unsubscribe, PendingKey::All(kind))]
		} else {
			debug!("Unsubscribing from {} {}(s)", names.len(), kind);
			names
				.into_iter()
				.map(|name| {
					let key = PendingKey::Target(SubscriptionKey::new(kind, name));
					self.pending.register(PendingQueue::Unsubscribe, key)
				})
				.collect()
		};
		aggregate(waiters)
	}

	/// Process one decoded inbound value.
	///
	/// Pub/Sub frames are consumed and `None` is returned; anything else is
	/// returned unchanged. A malformed Pub/Sub frame is an error, and the
	/// caller is expected to pass it to [`PubSubHandler::handle_error`].
	pub fn handle_value(&mut self, value: RespValue) -> Result<Option<RespValue>, PubSubError> {
		if self.state != HandlerState::Default {
			return Ok(Some(value));
		}

		let frame = match classify(value)? {
			Inbound::PubSub(frame) => frame,
			Inbound::Other(value) => return Ok(Some(value)),
		};
		trace!("Pub/Sub frame: {:?}", frame);

		match frame {
			PubSubFrame::Message { channel, payload } => {
				let key = SubscriptionKey::new(SubscriptionKind::Channel, channel.clone());
				self.deliver(&key, channel, None, payload);
			}
			PubSubFrame::PatternMessage {
				pattern,
				channel,
				payload,
			} => {
				let key = SubscriptionKey::new(SubscriptionKind::Pattern, pattern.clone());
				self.deliver(&key, channel, Some(pattern), payload);
			}
			PubSubFrame::Subscribe { kind, name, count } => self.on_subscribed(kind, name, count),
			PubSubFrame::Unsubscribe { kind, name, count } => self.on_unsubscribed(kind, name, count),
		}
		Ok(None)
	}

	/// The connection failed. Drops every subscription with `cause`.
	pub fn handle_error(&mut self, cause: PubSubError) {
		if self.state != HandlerState::Default {
			debug!("Ignoring error in state {:?}: {}", self.state, cause);
			return;
		}
		warn!("Pub/Sub connection failed: {}", cause);
		self.state = HandlerState::Error(cause.clone());
		self.teardown(UnsubscribeSource::ClientError(cause.clone()), cause);
	}

	/// The peer closed the connection.
	pub fn handle_closed(&mut self) {
		self.handle_error(PubSubError::ConnectionClosed);
	}

	/// Detach the handler. Subscriptions end as user-initiated and pending
	/// changes fail with [`PubSubError::HandlerRemoved`].
	pub fn remove(&mut self) {
		if self.state != HandlerState::Default {
			return;
		}
		debug!("Removing Pub/Sub handler");
		self.state = HandlerState::Removed;
		self.teardown(UnsubscribeSource::UserInitiated, PubSubError::HandlerRemoved);
	}

	fn ensure_active(&self) -> Result<(), PubSubError> {
		match &self.state {
			HandlerState::Default => Ok(()),
			HandlerState::Removed => Err(PubSubError::SubscriptionModeRaceCondition),
			HandlerState::Error(cause) => Err(cause.clone()),
		}
	}

	fn send(&mut self, command: RespValue) -> Result<(), PubSubError> {
		let sink = self.sink.as_mut().ok_or(PubSubError::HandlerRemoved)?;
		sink.write(command)?;
		sink.flush()
	}

	fn deliver(&self, key: &SubscriptionKey, publisher: Bytes, pattern: Option<Bytes>, payload: RespValue) {
		let Some(receiver) = self.registry.receiver(key) else {
			debug!(
				"Dropping message for unregistered {} '{}'",
				key.kind,
				String::from_utf8_lossy(&key.name)
			);
			return;
		};
		receiver.on_event(PubSubEvent::Message {
			publisher,
			pattern,
			payload,
		});
		self.metrics.message_received();
	}

	fn on_subscribed(&mut self, kind: SubscriptionKind, name: Bytes, count: usize) {
		let key = SubscriptionKey::new(kind, name.clone());
		if let Some((receiver, newly)) = self.registry.confirm(&key) {
			receiver.on_event(PubSubEvent::Subscribed {
				key: name,
				current_count: count,
			});
			if newly {
				self.metrics.increment_active(kind);
			}
		}
		self.pending
			.resolve(PendingQueue::Subscribe, &PendingKey::Target(key), count);
	}

	fn on_unsubscribed(&mut self, kind: SubscriptionKind, name: Option<Bytes>, count: usize) {
		if let Some(name) = name {
			let key = SubscriptionKey::new(kind, name.clone());
			if let Some(subscription) = self.registry.remove(&key) {
				subscription.receiver.on_event(PubSubEvent::Unsubscribed {
					key: name,
					current_count: count,
					source: UnsubscribeSource::UserInitiated,
				});
				if subscription.confirmed {
					self.metrics.decrement_active(kind);
				}
			}
			if self
				.pending
				.resolve(PendingQueue::Unsubscribe, &PendingKey::Target(key), count)
			{
				return;
			}
		}

		// Not a targeted change, so it is part of an unsubscribe-all. That
		// finishes when the server or the registry has nothing of this kind
		// left.
		if count == 0 || self.registry.count(kind) == 0 {
			self.pending
				.resolve(PendingQueue::Unsubscribe, &PendingKey::All(kind), count);
		}
	}

	fn teardown(&mut self, source: UnsubscribeSource, pending_cause: PubSubError) {
		self.sink = None;

		let dropped: Vec<_> = self.registry.drain().collect();
		if !dropped.is_empty() {
			debug!("Dropping {} subscription(s)", dropped.len());
		}
		for (key, subscription) in dropped {
			subscription.receiver.on_event(PubSubEvent::Unsubscribed {
				key: key.name,
				current_count: 0,
				source: source.clone(),
			});
			if subscription.confirmed {
				self.metrics.decrement_active(key.kind);
			}
		}

		self.pending.fail_all(&pending_cause);
	}
}

impl Drop for PubSubHandler {
	fn drop(&mut self) {
		self.remove();
	}
}
