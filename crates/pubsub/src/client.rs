use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

use crate::error::PubSubError;
use crate::event::EventReceiver;
use crate::pending::SubscriptionFuture;
use crate::target::SubscriptionKind;
use crate::target::SubscriptionTarget;

/// Work submitted to a connection task.
pub(crate) enum Request {
	Add {
		target: SubscriptionTarget,
		receiver: Arc<dyn EventReceiver>,
		reply: oneshot::Sender<SubscriptionFuture>,
	},
	Remove {
		target: SubscriptionTarget,
		reply: oneshot::Sender<SubscriptionFuture>,
	},
	Count {
		kind: Option<SubscriptionKind>,
		reply: oneshot::Sender<usize>,
	},
	Close {
		reply: oneshot::Sender<()>,
	},
}

/// Cloneable handle to a running [`Connection`](crate::Connection).
///
/// Every call is forwarded to the connection task, which owns all
/// subscription state.
#[derive(Clone, Debug)]
pub struct PubSubClient {
	requests: mpsc::UnboundedSender<Request>,
}

impl PubSubClient {
	pub(crate) fn new(requests: mpsc::UnboundedSender<Request>) -> Self {
		Self { requests }
	}

	/// Subscribe `receiver` to `target`, resolving with the subscription count
	/// reported by the server once every new name is acknowledged.
	pub async fn add_subscription(
		&self,
		target: SubscriptionTarget,
		receiver: impl EventReceiver,
	) -> Result<usize, PubSubError> {
		let receiver: Arc<dyn EventReceiver> = Arc::new(receiver);
		let change = self
			.submit(|reply| Request::Add {
				target,
				receiver,
				reply,
			})
			.await?;
		change.await
	}

	/// Unsubscribe from `target`. A target with no names removes every
	/// subscription of its kind.
	pub async fn remove_subscription(&self, target: SubscriptionTarget) -> Result<usize, PubSubError> {
		let change = self
			.submit(|reply| Request::Remove { target, reply })
			.await?;
		change.await
	}

	pub async fn subscription_count(&self, kind: SubscriptionKind) -> Result<usize, PubSubError> {
		self.submit(|reply| Request::Count {
			kind: Some(kind),
			reply,
		})
		.await
	}

	pub async fn total_subscriptions(&self) -> Result<usize, PubSubError> {
		self.submit(|reply| Request::Count { kind: None, reply })
			.await
	}

	/// Detach the Pub/Sub handler and stop the connection task.
	///
	/// Subscriptions still registered end with a user-initiated
	/// `Unsubscribed` event. Closing an already stopped connection is a
	/// no-op.
	pub async fn close(&self) {
		if self.submit(|reply| Request::Close { reply }).await.is_err() {
			debug!("Connection already closed");
		}
	}

	pub fn is_closed(&self) -> bool {
		self.requests.is_closed()
	}

	async fn submit<T>(
		&self,
		build: impl FnOnce(oneshot::Sender<T>) -> Request,
	) -> Result<T, PubSubError> {
		let (tx, rx) = oneshot::channel();
		self.requests
			.send(build(tx))
			.map_err(|_| PubSubError::ConnectionClosed)?;
		rx.await.map_err(|_| PubSubError::ConnectionClosed)
	}
}
