//! Error types for the Pub/Sub engine.

use resp::ParseError;
use thiserror::Error;

/// Errors surfaced by subscription operations and the connection driver.
///
/// The type is `Clone` because a single cause is fanned out to every pending
/// operation and every active receiver when a connection fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PubSubError {
	/// The inbound byte stream could not be decoded.
	#[error("Protocol error: {0}")]
	Protocol(#[from] ParseError),

	/// A frame carried a Pub/Sub keyword but not the shape Redis guarantees.
	#[error("Malformed Pub/Sub frame: {0}")]
	MalformedFrame(String),

	/// A subscription change was requested after the handler was detached.
	#[error("Subscription change attempted while the Pub/Sub handler is being torn down")]
	SubscriptionModeRaceCondition,

	/// The handler was detached before the change was acknowledged.
	#[error("Pub/Sub handler was removed before the change completed")]
	HandlerRemoved,

	/// The peer closed the connection, or the connection task is gone.
	#[error("Connection closed")]
	ConnectionClosed,

	/// Transport failure.
	#[error("I/O error: {0}")]
	Io(String),
}

impl From<std::io::Error> for PubSubError {
	fn from(e: std::io::Error) -> Self {
		PubSubError::Io(e.to_string())
	}
}
