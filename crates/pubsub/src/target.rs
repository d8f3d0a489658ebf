//! Subscription targets and the keys they are registered under.

use std::fmt;

use bytes::Bytes;

/// Whether a subscription matches a channel exactly or by glob pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
	Channel,
	Pattern,
}

impl SubscriptionKind {
	pub fn as_str(self) -> &'static str {
		match self {
			SubscriptionKind::Channel => "channel",
			SubscriptionKind::Pattern => "pattern",
		}
	}

	pub(crate) fn index(self) -> usize {
		match self {
			SubscriptionKind::Channel => 0,
			SubscriptionKind::Pattern => 1,
		}
	}

	pub(crate) fn subscribe_command(self) -> &'static str {
		match self {
			SubscriptionKind::Channel => "SUBSCRIBE",
			SubscriptionKind::Pattern => "PSUBSCRIBE",
		}
	}

	pub(crate) fn unsubscribe_command(self) -> &'static str {
		match self {
			SubscriptionKind::Channel => "UNSUBSCRIBE",
			SubscriptionKind::Pattern => "PUNSUBSCRIBE",
		}
	}
}

impl fmt::Display for SubscriptionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The channels or patterns a subscription change applies to.
///
/// An empty list passed to a remove operation means "everything of this
/// kind".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionTarget {
	Channels(Vec<Bytes>),
	Patterns(Vec<Bytes>),
}

impl SubscriptionTarget {
	pub fn channels<I, T>(names: I) -> Self
	where
		I: IntoIterator<Item = T>,
		T: Into<Bytes>,
	{
		SubscriptionTarget::Channels(names.into_iter().map(Into::into).collect())
	}

	pub fn patterns<I, T>(names: I) -> Self
	where
		I: IntoIterator<Item = T>,
		T: Into<Bytes>,
	{
		SubscriptionTarget::Patterns(names.into_iter().map(Into::into).collect())
	}

	/// Every channel, for use with remove operations.
	pub fn all_channels() -> Self {
		SubscriptionTarget::Channels(Vec::new())
	}

	/// Every pattern, for use with remove operations.
	pub fn all_patterns() -> Self {
		SubscriptionTarget::Patterns(Vec::new())
	}

	pub fn kind(&self) -> SubscriptionKind {
		match self {
			SubscriptionTarget::Channels(_) => SubscriptionKind::Channel,
			SubscriptionTarget::Patterns(_) => SubscriptionKind::Pattern,
		}
	}

	pub fn names(&self) -> &[Bytes] {
		match self {
			SubscriptionTarget::Channels(names) | SubscriptionTarget::Patterns(names) => names,
		}
	}

	pub fn into_names(self) -> Vec<Bytes> {
		match self {
			SubscriptionTarget::Channels(names) | SubscriptionTarget::Patterns(names) => names,
		}
	}
}

impl fmt::Display for SubscriptionTarget {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let names: Vec<_> = self
			.names()
			.iter()
			.map(|n| String::from_utf8_lossy(n))
			.collect();
		match self {
			SubscriptionTarget::Channels(_) => write!(f, "Channels '{}'", names.join(", ")),
			SubscriptionTarget::Patterns(_) => write!(f, "Patterns '{}'", names.join(", ")),
		}
	}
}

/// Registry key: the kind is part of the key, so channel `foo` and pattern
/// `foo` never share a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
	pub kind: SubscriptionKind,
	pub name: Bytes,
}

impl SubscriptionKey {
	pub fn new(kind: SubscriptionKind, name: impl Into<Bytes>) -> Self {
		Self {
			kind,
			name: name.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_channel_and_pattern_keys_differ() {
		let channel = SubscriptionKey::new(SubscriptionKind::Channel, "x");
		let pattern = SubscriptionKey::new(SubscriptionKind::Pattern, "x");
		assert_ne!(channel, pattern);
	}

	#[test]
	fn test_target_display() {
		let target = SubscriptionTarget::channels(["a", "b"]);
		assert_eq!(target.to_string(), "Channels 'a, b'");
		assert_eq!(SubscriptionTarget::all_patterns().to_string(), "Patterns ''");
	}

	#[test]
	fn test_target_kind_and_names() {
		let target = SubscriptionTarget::patterns(["news.*"]);
		assert_eq!(target.kind(), SubscriptionKind::Pattern);
		assert_eq!(target.names(), &[Bytes::from("news.*")]);
		assert!(SubscriptionTarget::all_channels().names().is_empty());
	}
}
