//! Bookkeeping for subscription changes awaiting a server acknowledgement.

use std::collections::HashMap;
use std::collections::VecDeque;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::join_all;
use tokio::sync::oneshot;

use crate::error::PubSubError;
use crate::target::SubscriptionKey;
use crate::target::SubscriptionKind;

pub(crate) type CountResult = Result<usize, PubSubError>;

/// Resolves with the server's reported subscription count once every part of
/// a change is acknowledged.
pub type SubscriptionFuture = BoxFuture<'static, Result<usize, PubSubError>>;

pub(crate) const DEFAULT_QUEUE_CAPACITY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PendingQueue {
	Subscribe,
	Unsubscribe,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum PendingKey {
	Target(SubscriptionKey),
	/// An unsubscribe sent with no names, covering every entry of the kind.
	All(SubscriptionKind),
}

/// Two queues of in-flight changes. Each key holds its waiters in send order,
/// matching the order the server acknowledges them.
pub(crate) struct PendingChanges {
	subscribes: HashMap<PendingKey, VecDeque<oneshot::Sender<CountResult>>>,
	unsubscribes: HashMap<PendingKey, VecDeque<oneshot::Sender<CountResult>>>,
}

impl Default for PendingChanges {
	fn default() -> Self {
		Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
	}
}

impl PendingChanges {
	pub(crate) fn with_capacity(capacity: usize) -> Self {
		Self {
			subscribes: HashMap::with_capacity(capacity),
			unsubscribes: HashMap::with_capacity(capacity),
		}
	}

	fn queue_mut(
		&mut self,
		queue: PendingQueue,
	) -> &mut HashMap<PendingKey, VecDeque<oneshot::Sender<CountResult>>> {
		match queue {
			PendingQueue::Subscribe => &mut self.subscribes,
			PendingQueue::Unsubscribe => &mut self.unsubscribes,
		}
	}

	pub(crate) fn register(
		&mut self,
		queue: PendingQueue,
		key: PendingKey,
	) -> oneshot::Receiver<CountResult> {
		let (tx, rx) = oneshot::channel();
		self.queue_mut(queue).entry(key).or_default().push_back(tx);
		rx
	}

	/// Resolve the oldest waiter for `key`. Returns `false` if none existed.
	pub(crate) fn resolve(&mut self, queue: PendingQueue, key: &PendingKey, count: usize) -> bool {
		let queue = self.queue_mut(queue);
		let Some(waiters) = queue.get_mut(key) else {
			return false;
		};
		let waiter = waiters.pop_front();
		if waiters.is_empty() {
			queue.remove(key);
		}
		match waiter {
			Some(tx) => {
				// The caller may have stopped waiting; that is not an error here.
				let _ = tx.send(Ok(count));
				true
			}
			None => false,
		}
	}

	/// Fail every waiter in both queues with `cause`.
	pub(crate) fn fail_all(&mut self, cause: &PubSubError) {
		for (_, waiters) in self.subscribes.drain().chain(self.unsubscribes.drain()) {
			for tx in waiters {
				let _ = tx.send(Err(cause.clone()));
			}
		}
	}

	pub(crate) fn len(&self) -> usize {
		self.subscribes.values().map(VecDeque::len).sum::<usize>()
			+ self.unsubscribes.values().map(VecDeque::len).sum::<usize>()
	}
}

/// Combine the per-key waiters of one change into a single future.
///
/// The future waits for every waiter. It resolves with the last successful
/// count in send order, or with the first error if none succeeded.
pub(crate) fn aggregate(waiters: Vec<oneshot::Receiver<CountResult>>) -> SubscriptionFuture {
	join_all(waiters)
		.map(|results| {
			let mut first_error = None;
			let mut last_count = None;
			for result in results {
				match result.unwrap_or(Err(PubSubError::ConnectionClosed)) {
					Ok(count) => last_count = Some(count),
					Err(e) => {
						first_error.get_or_insert(e);
					}
				}
			}
			match (last_count, first_error) {
				(Some(count), _) => Ok(count),
				(None, Some(e)) => Err(e),
				(None, None) => Ok(0),
			}
		})
		.boxed()
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	fn channel(name: &'static str) -> PendingKey {
		PendingKey::Target(SubscriptionKey::new(SubscriptionKind::Channel, name))
	}

	#[tokio::test]
	async fn test_aggregate_last_success_wins() {
		let mut pending = PendingChanges::default();
		let rx = vec![
			pending.register(PendingQueue::Subscribe, channel("a")),
			pending.register(PendingQueue::Subscribe, channel("b")),
		];
		let fut = aggregate(rx);

		assert!(pending.resolve(PendingQueue::Subscribe, &channel("b"), 2));
		assert!(pending.resolve(PendingQueue::Subscribe, &channel("a"), 1));
		// Send order decides, not acknowledgement order.
		assert_eq!(fut.await, Ok(2));
		assert_eq!(pending.len(), 0);
	}

	#[tokio::test]
	async fn test_aggregate_first_error_when_all_fail() {
		let mut pending = PendingChanges::default();
		let rx = vec![
			pending.register(PendingQueue::Unsubscribe, channel("a")),
			pending.register(PendingQueue::Unsubscribe, PendingKey::All(SubscriptionKind::Pattern)),
		];
		let fut = aggregate(rx);

		pending.fail_all(&PubSubError::HandlerRemoved);
		assert_eq!(fut.await, Err(PubSubError::HandlerRemoved));
	}

	#[tokio::test]
	async fn test_dropped_waiter_reports_closed() {
		let mut pending = PendingChanges::default();
		let fut = aggregate(vec![pending.register(PendingQueue::Subscribe, channel("a"))]);
		drop(pending);
		assert_eq!(fut.await, Err(PubSubError::ConnectionClosed));
	}

	#[rstest]
	#[case(PendingQueue::Subscribe, PendingQueue::Unsubscribe)]
	#[case(PendingQueue::Unsubscribe, PendingQueue::Subscribe)]
	fn test_queues_are_independent(#[case] registered: PendingQueue, #[case] other: PendingQueue) {
		let mut pending = PendingChanges::default();
		let _rx = pending.register(registered, channel("a"));
		assert!(!pending.resolve(other, &channel("a"), 1));
		assert!(pending.resolve(registered, &channel("a"), 1));
	}

	#[test]
	fn test_same_key_resolves_in_order() {
		let mut pending = PendingChanges::default();
		let mut first = pending.register(PendingQueue::Unsubscribe, channel("a"));
		let mut second = pending.register(PendingQueue::Unsubscribe, channel("a"));

		assert!(pending.resolve(PendingQueue::Unsubscribe, &channel("a"), 3));
		assert_eq!(first.try_recv(), Ok(Ok(3)));
		assert!(second.try_recv().is_err());

		assert!(pending.resolve(PendingQueue::Unsubscribe, &channel("a"), 2));
		assert_eq!(second.try_recv(), Ok(Ok(2)));
		assert!(!pending.resolve(PendingQueue::Unsubscribe, &channel("a"), 1));
	}
}
