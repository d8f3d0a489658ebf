//! RESP data types and value representation.

use bytes::Bytes;

/// Represents a RESP2 protocol value.
///
/// Text-like variants hold raw bytes. Nothing is validated as UTF-8 until an
/// accessor such as [`RespValue::as_str`] asks for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RespValue {
	/// Simple string: `+OK\r\n`
	SimpleString(Bytes),

	/// Error: `-ERR message\r\n`
	Error(Bytes),

	/// Integer: `:1000\r\n`
	Integer(i64),

	/// Bulk string: `$6\r\nfoobar\r\n`
	BulkString(Bytes),

	/// Array: `*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n`
	Array(Vec<RespValue>),

	/// Null bulk string `$-1\r\n` or null array `*-1\r\n`
	Null,
}

impl RespValue {
	/// Check if the value is an error
	pub fn is_error(&self) -> bool {
		matches!(self, RespValue::Error(_))
	}

	/// Check if the value is null
	pub fn is_null(&self) -> bool {
		matches!(self, RespValue::Null)
	}

	/// Try to convert to a string slice
	pub fn as_str(&self) -> Option<&str> {
		match self {
			RespValue::SimpleString(s) | RespValue::BulkString(s) => std::str::from_utf8(s).ok(),
			_ => None,
		}
	}

	/// Try to convert to bytes
	pub fn as_bytes(&self) -> Option<&Bytes> {
		match self {
			RespValue::SimpleString(b) | RespValue::BulkString(b) => Some(b),
			_ => None,
		}
	}

	/// Try to convert to integer
	pub fn as_integer(&self) -> Option<i64> {
		match self {
			RespValue::Integer(i) => Some(*i),
			_ => None,
		}
	}

	/// Try to convert to array
	pub fn as_array(&self) -> Option<&[RespValue]> {
		match self {
			RespValue::Array(a) => Some(a),
			_ => None,
		}
	}

	/// Convert to String with lossy UTF-8 conversion
	pub fn to_string_lossy(&self) -> Option<String> {
		match self {
			RespValue::SimpleString(s) | RespValue::BulkString(s) | RespValue::Error(s) => {
				Some(String::from_utf8_lossy(s).into_owned())
			}
			_ => None,
		}
	}

	/// Try to consume and convert to Vec<RespValue>
	pub fn into_vec(self) -> Option<Vec<RespValue>> {
		match self {
			RespValue::Array(a) => Some(a),
			_ => None,
		}
	}

	// Convenience constructors

	/// Create a simple string value
	pub fn simple_string(s: impl Into<Bytes>) -> Self {
		RespValue::SimpleString(s.into())
	}

	/// Create a bulk string value
	pub fn bulk_string(s: impl Into<Bytes>) -> Self {
		RespValue::BulkString(s.into())
	}

	/// Create an error value
	pub fn error(e: impl Into<Bytes>) -> Self {
		RespValue::Error(e.into())
	}

	/// Create an integer value
	pub fn integer(i: i64) -> Self {
		RespValue::Integer(i)
	}

	/// Create an array value from an iterator
	pub fn array(items: impl IntoIterator<Item = RespValue>) -> Self {
		RespValue::Array(items.into_iter().collect())
	}

	/// Create a null value
	pub fn null() -> Self {
		RespValue::Null
	}

	/// Build a command array of bulk strings, e.g. `SUBSCRIBE a b`.
	pub fn command<I, T>(name: &'static str, args: I) -> Self
	where
		I: IntoIterator<Item = T>,
		T: Into<Bytes>,
	{
		let mut items = vec![RespValue::BulkString(Bytes::from_static(name.as_bytes()))];
		items.extend(args.into_iter().map(|a| RespValue::BulkString(a.into())));
		RespValue::Array(items)
	}
}

// Convenient From implementations
impl From<&str> for RespValue {
	fn from(s: &str) -> Self {
		RespValue::BulkString(Bytes::copy_from_slice(s.as_bytes()))
	}
}

impl From<String> for RespValue {
	fn from(s: String) -> Self {
		RespValue::BulkString(Bytes::from(s))
	}
}

impl From<&[u8]> for RespValue {
	fn from(b: &[u8]) -> Self {
		RespValue::BulkString(Bytes::copy_from_slice(b))
	}
}

impl From<Vec<u8>> for RespValue {
	fn from(v: Vec<u8>) -> Self {
		RespValue::BulkString(Bytes::from(v))
	}
}

impl From<i64> for RespValue {
	fn from(i: i64) -> Self {
		RespValue::Integer(i)
	}
}

impl From<Bytes> for RespValue {
	fn from(b: Bytes) -> Self {
		RespValue::BulkString(b)
	}
}

impl From<Vec<RespValue>> for RespValue {
	fn from(v: Vec<RespValue>) -> Self {
		RespValue::Array(v)
	}
}

impl<T: Into<RespValue>> From<Option<T>> for RespValue {
	fn from(o: Option<T>) -> Self {
		match o {
			Some(v) => v.into(),
			None => RespValue::Null,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_is_error() {
		let err = RespValue::Error(Bytes::from("ERR"));
		assert!(err.is_error());

		let ok = RespValue::SimpleString(Bytes::from("OK"));
		assert!(!ok.is_error());
	}

	#[test]
	fn test_as_str() {
		let val = RespValue::SimpleString(Bytes::from("hello"));
		assert_eq!(val.as_str(), Some("hello"));

		let num = RespValue::Integer(42);
		assert_eq!(num.as_str(), None);
	}

	#[test]
	fn test_as_str_rejects_invalid_utf8_lazily() {
		// Lone lead byte of a two byte sequence
		let val = RespValue::BulkString(Bytes::from_static(&[0b110_10101]));
		assert_eq!(val.as_str(), None);
		assert_eq!(val.as_bytes().map(|b| b.len()), Some(1));
		assert_eq!(val.to_string_lossy(), Some("\u{FFFD}".to_string()));
	}

	#[test]
	fn test_convenience_constructors() {
		let s = RespValue::simple_string("OK");
		assert_eq!(s.as_str(), Some("OK"));

		let b = RespValue::bulk_string("hello");
		assert_eq!(b.as_str(), Some("hello"));

		let e = RespValue::error("ERR");
		assert!(e.is_error());

		let i = RespValue::integer(42);
		assert_eq!(i.as_integer(), Some(42));

		let arr = RespValue::array(vec![RespValue::integer(1), RespValue::integer(2)]);
		assert_eq!(arr.as_array().map(|a| a.len()), Some(2));

		let n = RespValue::null();
		assert!(n.is_null());
	}

	#[test]
	fn test_command_builder() {
		let cmd = RespValue::command("SUBSCRIBE", ["a", "b"]);
		assert_eq!(
			cmd,
			RespValue::Array(vec![
				RespValue::bulk_string("SUBSCRIBE"),
				RespValue::bulk_string("a"),
				RespValue::bulk_string("b"),
			])
		);

		let bare = RespValue::command("UNSUBSCRIBE", Vec::<Bytes>::new());
		assert_eq!(bare.as_array().map(|a| a.len()), Some(1));
	}

	#[test]
	fn test_into_vec() {
		let arr = RespValue::array(vec![RespValue::integer(1), RespValue::integer(2)]);
		let vec = arr.into_vec().unwrap();
		assert_eq!(vec.len(), 2);
	}

	#[test]
	fn test_from_option() {
		let none: RespValue = Option::<&str>::None.into();
		assert!(none.is_null());

		let some: RespValue = Some("x").into();
		assert_eq!(some.as_str(), Some("x"));
	}
}
