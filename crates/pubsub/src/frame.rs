//! Recognition of Pub/Sub frames among inbound values.

use bytes::Bytes;
use resp::RespValue;

use crate::error::PubSubError;
use crate::target::SubscriptionKind;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PubSubFrame {
	Message {
		channel: Bytes,
		payload: RespValue,
	},
	PatternMessage {
		pattern: Bytes,
		channel: Bytes,
		payload: RespValue,
	},
	Subscribe {
		kind: SubscriptionKind,
		name: Bytes,
		count: usize,
	},
	/// `name` is absent when the server acknowledges an unsubscribe-all
	/// while nothing of that kind was subscribed.
	Unsubscribe {
		kind: SubscriptionKind,
		name: Option<Bytes>,
		count: usize,
	},
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Inbound {
	PubSub(PubSubFrame),
	/// Not a Pub/Sub frame; belongs to whoever sent the command.
	Other(RespValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
	Message,
	PMessage,
	Subscribe,
	PSubscribe,
	Unsubscribe,
	PUnsubscribe,
}

impl Keyword {
	fn parse(value: &RespValue) -> Option<Self> {
		let keyword = match value.as_bytes()?.as_ref() {
			b"message" => Keyword::Message,
			b"pmessage" => Keyword::PMessage,
			b"subscribe" => Keyword::Subscribe,
			b"psubscribe" => Keyword::PSubscribe,
			b"unsubscribe" => Keyword::Unsubscribe,
			b"punsubscribe" => Keyword::PUnsubscribe,
			_ => return None,
		};
		Some(keyword)
	}

	fn as_str(self) -> &'static str {
		match self {
			Keyword::Message => "message",
			Keyword::PMessage => "pmessage",
			Keyword::Subscribe => "subscribe",
			Keyword::PSubscribe => "psubscribe",
			Keyword::Unsubscribe => "unsubscribe",
			Keyword::PUnsubscribe => "punsubscribe",
		}
	}

	fn is_unsubscribe(self) -> bool {
		matches!(self, Keyword::Unsubscribe | Keyword::PUnsubscribe)
	}
}

/// Split an inbound value into a Pub/Sub frame or a pass-through value.
///
/// A value is a Pub/Sub frame if it is an array of at least three elements
/// whose first element is one of the six keywords and whose second element
/// is a name. Unsubscribe acknowledgements may also carry a null name. Any
/// other value is passed through untouched. The last element is the payload
/// or count, so trailing extras are tolerated. A frame that passes those
/// checks but carries a field of the wrong type means the stream is corrupt.
pub(crate) fn classify(value: RespValue) -> Result<Inbound, PubSubError> {
	let mut items = match value {
		RespValue::Array(items) => items,
		other => return Ok(Inbound::Other(other)),
	};
	let Some(keyword) = recognize(&items) else {
		return Ok(Inbound::Other(RespValue::Array(items)));
	};

	let last = items.pop().unwrap_or(RespValue::Null);
	let mut fields = items.into_iter().skip(1);
	let mut next = || fields.next().unwrap_or(RespValue::Null);

	let frame = match keyword {
		Keyword::Message => PubSubFrame::Message {
			channel: name(keyword, next())?,
			payload: last,
		},
		Keyword::PMessage => {
			let pattern = name(keyword, next())?;
			let channel = match next() {
				RespValue::Null => {
					return Err(malformed(keyword, "missing channel name".to_string()));
				}
				other => name(keyword, other)?,
			};
			PubSubFrame::PatternMessage {
				pattern,
				channel,
				payload: last,
			}
		}
		Keyword::Subscribe | Keyword::PSubscribe => PubSubFrame::Subscribe {
			kind: kind_of(keyword),
			name: name(keyword, next())?,
			count: count(keyword, last)?,
		},
		Keyword::Unsubscribe | Keyword::PUnsubscribe => {
			let target = match next() {
				RespValue::Null => None,
				other => Some(name(keyword, other)?),
			};
			PubSubFrame::Unsubscribe {
				kind: kind_of(keyword),
				name: target,
				count: count(keyword, last)?,
			}
		}
	};
	Ok(Inbound::PubSub(frame))
}

fn recognize(items: &[RespValue]) -> Option<Keyword> {
	if items.len() < 3 {
		return None;
	}
	let keyword = Keyword::parse(&items[0])?;
	match &items[1] {
		RespValue::BulkString(_) | RespValue::SimpleString(_) => Some(keyword),
		RespValue::Null if keyword.is_unsubscribe() => Some(keyword),
		_ => None,
	}
}

fn kind_of(keyword: Keyword) -> SubscriptionKind {
	match keyword {
		Keyword::PSubscribe | Keyword::PUnsubscribe | Keyword::PMessage => SubscriptionKind::Pattern,
		_ => SubscriptionKind::Channel,
	}
}

fn name(keyword: Keyword, value: RespValue) -> Result<Bytes, PubSubError> {
	match value {
		RespValue::BulkString(b) | RespValue::SimpleString(b) => Ok(b),
		other => Err(malformed(keyword, format!("expected a name, got {:?}", other))),
	}
}

fn count(keyword: Keyword, value: RespValue) -> Result<usize, PubSubError> {
	match value {
		RespValue::Integer(n) => usize::try_from(n)
			.map_err(|_| malformed(keyword, format!("negative subscription count {}", n))),
		other => Err(malformed(keyword, format!("expected a count, got {:?}", other))),
	}
}

fn malformed(keyword: Keyword, detail: String) -> PubSubError {
	PubSubError::MalformedFrame(format!("'{}' frame: {}", keyword.as_str(), detail))
}
