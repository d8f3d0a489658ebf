//! Events delivered to subscription receivers.

use bytes::Bytes;
use resp::RespValue;
use tokio::sync::mpsc;

use crate::error::PubSubError;

/// Why a subscription ended.
#[derive(Debug, Clone, PartialEq)]
pub enum UnsubscribeSource {
	/// An UNSUBSCRIBE or PUNSUBSCRIBE was acknowledged by the server.
	UserInitiated,
	/// The connection failed and every subscription was dropped.
	ClientError(PubSubError),
}

/// A Pub/Sub event for one channel or pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum PubSubEvent {
	/// The server confirmed the subscription. Delivered once, before any
	/// message.
	Subscribed { key: Bytes, current_count: usize },
	/// The subscription ended. Delivered once, after the last message.
	Unsubscribed {
		key: Bytes,
		current_count: usize,
		source: UnsubscribeSource,
	},
	/// A message was published. `pattern` is set for pattern subscriptions
	/// and holds the pattern that matched `publisher`.
	Message {
		publisher: Bytes,
		pattern: Option<Bytes>,
		payload: RespValue,
	},
}

/// Receives events for the targets it was registered with.
///
/// Receivers are called on the connection task, one event at a time. Any
/// blocking work stalls all inbound processing for the connection, so hand
/// heavy work off to another task.
pub trait EventReceiver: Send + Sync + 'static {
	fn on_event(&self, event: PubSubEvent);
}

impl<F> EventReceiver for F
where
	F: Fn(PubSubEvent) + Send + Sync + 'static,
{
	fn on_event(&self, event: PubSubEvent) {
		self(event)
	}
}

/// Forwards events into a channel, for consumers living on other tasks.
impl EventReceiver for mpsc::UnboundedSender<PubSubEvent> {
	fn on_event(&self, event: PubSubEvent) {
		if self.send(event).is_err() {
			log::debug!("Dropping Pub/Sub event, receiving side is closed");
		}
	}
}
