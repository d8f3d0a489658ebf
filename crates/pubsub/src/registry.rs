use std::collections::HashMap;
use std::sync::Arc;

use crate::event::EventReceiver;
use crate::target::SubscriptionKey;
use crate::target::SubscriptionKind;

pub(crate) struct Subscription {
	pub(crate) receiver: Arc<dyn EventReceiver>,
	/// Set once the server has acknowledged the subscribe.
	pub(crate) confirmed: bool,
}

/// Active and requested subscriptions, keyed by kind and name.
///
/// Entries are inserted when a subscribe is sent and removed only when the
/// server acknowledges the unsubscribe, or when the connection is torn down.
#[derive(Default)]
pub(crate) struct Registry {
	entries: HashMap<SubscriptionKey, Subscription>,
	by_kind: [usize; 2],
}

impl Registry {
	/// Insert `key` or replace the receiver of an existing entry.
	///
	/// Returns `true` if the key was not registered before. A replaced entry
	/// keeps its confirmation state.
	pub(crate) fn upsert(&mut self, key: SubscriptionKey, receiver: Arc<dyn EventReceiver>) -> bool {
		match self.entries.get_mut(&key) {
			Some(existing) => {
				existing.receiver = receiver;
				false
			}
			None => {
				self.by_kind[key.kind.index()] += 1;
				self.entries.insert(
					key,
					Subscription {
						receiver,
						confirmed: false,
					},
				);
				true
			}
		}
	}

	pub(crate) fn remove(&mut self, key: &SubscriptionKey) -> Option<Subscription> {
		let removed = self.entries.remove(key)?;
		self.by_kind[key.kind.index()] -= 1;
		Some(removed)
	}

	/// Mark `key` as acknowledged.
	///
	/// Returns the receiver and whether this call flipped the entry from
	/// unconfirmed to confirmed.
	pub(crate) fn confirm(&mut self, key: &SubscriptionKey) -> Option<(Arc<dyn EventReceiver>, bool)> {
		let entry = self.entries.get_mut(key)?;
		let newly = !entry.confirmed;
		entry.confirmed = true;
		Some((entry.receiver.clone(), newly))
	}

	pub(crate) fn receiver(&self, key: &SubscriptionKey) -> Option<Arc<dyn EventReceiver>> {
		self.entries.get(key).map(|s| s.receiver.clone())
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}

	pub(crate) fn count(&self, kind: SubscriptionKind) -> usize {
		self.by_kind[kind.index()]
	}

	pub(crate) fn drain(&mut self) -> impl Iterator<Item = (SubscriptionKey, Subscription)> + '_ {
		self.by_kind = [0; 2];
		self.entries.drain()
	}
}
