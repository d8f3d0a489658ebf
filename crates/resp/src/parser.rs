//! Incremental RESP2 decoder.
//!
//! The decoder keeps no state between calls. Each call looks at the bytes
//! currently buffered and either consumes exactly one complete value or leaves
//! the buffer untouched, so a partially received array is simply re-read from
//! its header once more bytes arrive.

use std::ops::Range;

use bytes::Bytes;
use bytes::BytesMut;

use crate::error::ParseError;
use crate::types::RespValue;
use crate::utils::*;

/// Arrays nested deeper than this are rejected instead of recursing further.
pub const MAX_NESTING_DEPTH: usize = 512;

/// Result of a single decode attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
	/// A complete value was decoded and its bytes consumed. More values may
	/// already be buffered, so the caller should decode again.
	Continue(RespValue),
	/// The buffer does not hold another complete value. Nothing was consumed.
	NeedMoreData,
}

/// A RESP decoder operating on a growable read buffer.
#[derive(Debug, Clone)]
pub struct RespParser {
	max_depth: usize,
}

impl Default for RespParser {
	fn default() -> Self {
		Self::new()
	}
}

impl RespParser {
	pub fn new() -> Self {
		Self {
			max_depth: MAX_NESTING_DEPTH,
		}
	}

	/// Override the maximum array nesting depth.
	pub fn with_max_depth(mut self, max_depth: usize) -> Self {
		self.max_depth = max_depth;
		self
	}

	/// Decode one value starting at the front of `buf`.
	///
	/// On `Continue` the value's bytes have been removed from `buf`. On
	/// `NeedMoreData` and on error `buf` is left as it was.
	///
	/// The value's strings share the storage split off `buf`, no payload is
	/// copied.
	pub fn decode(&self, buf: &mut BytesMut) -> Result<DecodeOutcome, ParseError> {
		match self.scan(&buf[..], 0, 0)? {
			Some((frame, consumed)) => {
				let data = buf.split_to(consumed).freeze();
				Ok(DecodeOutcome::Continue(frame.into_value(&data)))
			}
			None => Ok(DecodeOutcome::NeedMoreData),
		}
	}

	/// Scan the value starting at `pos`, returning its layout together with
	/// the offset just past it.
	fn scan(
		&self,
		buf: &[u8],
		pos: usize,
		depth: usize,
	) -> Result<Option<(Frame, usize)>, ParseError> {
		let Some(&type_marker) = buf.get(pos) else {
			return Ok(None);
		};

		match type_marker {
			SIMPLE_STRING => Ok(scan_line(buf, pos).map(|(line, end)| (Frame::Simple(line), end))),
			ERROR => Ok(scan_line(buf, pos).map(|(line, end)| (Frame::Error(line), end))),
			INTEGER => match scan_line(buf, pos) {
				Some((line, end)) => {
					let num = parse_integer(&buf[line])?;
					Ok(Some((Frame::Integer(num), end)))
				}
				None => Ok(None),
			},
			BULK_STRING => scan_bulk_string(buf, pos),
			ARRAY => self.scan_array(buf, pos, depth),
			other => Err(ParseError::InvalidTypeMarker(other)),
		}
	}

	fn scan_array(
		&self,
		buf: &[u8],
		pos: usize,
		depth: usize,
	) -> Result<Option<(Frame, usize)>, ParseError> {
		// *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n
		let Some((line, header_end)) = scan_line(buf, pos) else {
			return Ok(None);
		};
		let count = parse_integer(&buf[line])?;

		if count == -1 {
			return Ok(Some((Frame::Null, header_end)));
		}
		if count < -1 {
			return Err(ParseError::InvalidArrayLength(count));
		}
		if depth >= self.max_depth {
			return Err(ParseError::InvalidFormat(format!(
				"Array nesting exceeds maximum depth of {}",
				self.max_depth
			)));
		}

		let count = count as usize;
		// Cap the pre-allocation, the count comes from the peer.
		let mut elements = Vec::with_capacity(count.min(1024));
		let mut offset = header_end;
		for _ in 0..count {
			match self.scan(buf, offset, depth + 1)? {
				Some((element, end)) => {
					elements.push(element);
					offset = end;
				}
				None => return Ok(None),
			}
		}

		Ok(Some((Frame::Array(elements), offset)))
	}
}

/// Layout of a scanned value. Strings are ranges into the scanned buffer.
enum Frame {
	Simple(Range<usize>),
	Error(Range<usize>),
	Integer(i64),
	Bulk(Range<usize>),
	Null,
	Array(Vec<Frame>),
}

impl Frame {
	fn into_value(self, data: &Bytes) -> RespValue {
		match self {
			Frame::Simple(range) => RespValue::SimpleString(data.slice(range)),
			Frame::Error(range) => RespValue::Error(data.slice(range)),
			Frame::Integer(num) => RespValue::Integer(num),
			Frame::Bulk(range) => RespValue::BulkString(data.slice(range)),
			Frame::Null => RespValue::Null,
			Frame::Array(elements) => RespValue::Array(
				elements
					.into_iter()
					.map(|element| element.into_value(data))
					.collect(),
			),
		}
	}
}

/// Locate the line following the type marker at `buf[pos]`. Returns the
/// line's range and the offset just past its CRLF.
#[inline]
fn scan_line(buf: &[u8], pos: usize) -> Option<(Range<usize>, usize)> {
	let start = pos + 1;
	peek_line(&buf[start..]).map(|(line, len)| (start..start + line.len(), start + len))
}

fn scan_bulk_string(buf: &[u8], pos: usize) -> Result<Option<(Frame, usize)>, ParseError> {
	// $6\r\nfoobar\r\n
	let Some((line, header_end)) = scan_line(buf, pos) else {
		return Ok(None);
	};
	let length = parse_integer(&buf[line])?;

	if length == -1 {
		return Ok(Some((Frame::Null, header_end)));
	}
	if length < -1 {
		return Err(ParseError::InvalidBulkStringLength(length));
	}

	let length =
		usize::try_from(length).map_err(|_| ParseError::InvalidBulkStringLength(length))?;
	let end = header_end
		.checked_add(length)
		.and_then(|n| n.checked_add(CRLF.len()))
		.ok_or(ParseError::InvalidBulkStringLength(length as i64))?;

	if buf.len() < end {
		return Ok(None);
	}

	let body = header_end..header_end + length;
	if &buf[body.end..end] != CRLF {
		return Err(ParseError::InvalidFormat(
			"Missing CRLF after bulk string".to_string(),
		));
	}

	Ok(Some((Frame::Bulk(body), end)))
}

/// Convenience function for one-off parsing.
///
/// Incomplete input is reported as [`ParseError::UnexpectedEOF`]. Use
/// [`RespParser`] directly when reading from a stream.
pub fn parse(buf: &mut BytesMut) -> Result<RespValue, ParseError> {
	match RespParser::new().decode(buf)? {
		DecodeOutcome::Continue(value) => Ok(value),
		DecodeOutcome::NeedMoreData => Err(ParseError::UnexpectedEOF),
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	fn decode_str(input: &[u8]) -> (Result<DecodeOutcome, ParseError>, usize) {
		let mut buf = BytesMut::from(input);
		let result = RespParser::new().decode(&mut buf);
		(result, input.len() - buf.len())
	}

	#[test]
	fn test_parse_simple_string() {
		let mut buf = BytesMut::from(&b"+OK\r\n"[..]);
		let outcome = RespParser::new().decode(&mut buf).unwrap();
		assert_eq!(
			outcome,
			DecodeOutcome::Continue(RespValue::SimpleString(Bytes::from("OK")))
		);
		assert!(buf.is_empty());
	}

	#[test]
	fn test_parse_error() {
		let mut buf = BytesMut::from(&b"-ERR unknown command\r\n"[..]);
		let value = parse(&mut buf).unwrap();
		assert_eq!(value, RespValue::Error(Bytes::from("ERR unknown command")));
	}

	#[test]
	fn test_parse_integer() {
		let mut buf = BytesMut::from(&b":1000\r\n"[..]);
		let value = parse(&mut buf).unwrap();
		assert_eq!(value, RespValue::Integer(1000));
	}

	#[test]
	fn test_parse_bulk_string() {
		let mut buf = BytesMut::from(&b"$6\r\nfoobar\r\n"[..]);
		let value = parse(&mut buf).unwrap();
		assert_eq!(value, RespValue::BulkString(Bytes::from("foobar")));
	}

	#[test]
	fn test_parse_array() {
		let mut buf = BytesMut::from(&b"*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n"[..]);
		let value = parse(&mut buf).unwrap();

		if let RespValue::Array(arr) = value {
			assert_eq!(arr.len(), 2);
			assert_eq!(arr[0], RespValue::BulkString(Bytes::from("foo")));
			assert_eq!(arr[1], RespValue::BulkString(Bytes::from("bar")));
		} else {
			panic!("Expected Array, got {:?}", value);
		}
	}

	#[test]
	fn test_decoded_strings_share_one_frame() {
		let mut buf = BytesMut::from(&b"*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n+next\r\n"[..]);
		let Ok(DecodeOutcome::Continue(RespValue::Array(items))) = RespParser::new().decode(&mut buf)
		else {
			panic!("expected a complete array");
		};
		let (RespValue::BulkString(foo), RespValue::BulkString(bar)) = (&items[0], &items[1]) else {
			panic!("expected bulk strings, got {:?}", items);
		};
		assert_eq!(foo, &Bytes::from("foo"));
		assert_eq!(bar, &Bytes::from("bar"));
		// Both payloads point into the same split-off frame.
		assert_eq!(bar.as_ptr() as usize - foo.as_ptr() as usize, 9);
		assert_eq!(&buf[..], b"+next\r\n");
	}

	#[rstest]
	#[case(b"+OK")]
	#[case(b"+OK\r")]
	#[case(b"-ERR test\r")]
	#[case(b":2")]
	#[case(b":\r")]
	#[case(b"$0")]
	#[case(b"$0\r\n\r")]
	#[case(b"$-1\r")]
	#[case(b"$2\r\n")]
	#[case(b"$3\r\nfoo\r")]
	#[case(b"*0\r")]
	#[case(b"*1\r\n+OK\r")]
	#[case(b"*2\r\n:1\r\n")]
	#[case(b"*2\r\n*1\r\n")]
	#[case(b"")]
	fn test_partial_needs_more_data(#[case] input: &[u8]) {
		let (result, consumed) = decode_str(input);
		assert_eq!(result, Ok(DecodeOutcome::NeedMoreData));
		assert_eq!(consumed, 0, "partial input must not be consumed");
	}

	#[rstest]
	#[case(b"+OK\r\n")]
	#[case(b"$2\r\naa\r\n")]
	#[case(b"*2\r\n:1\r\n:2\r\n")]
	#[case(b"*2\r\n*1\r\n:1\r\n:2\r\n")]
	#[case(b"-ERR test\r\n")]
	#[case(b":2\r\n")]
	fn test_complete_continues_and_consumes(#[case] input: &[u8]) {
		let (result, consumed) = decode_str(input);
		assert!(matches!(result, Ok(DecodeOutcome::Continue(_))));
		assert_eq!(consumed, input.len());
	}

	#[test]
	fn test_bad_type_marker_fails() {
		let (result, consumed) = decode_str(b"&3\r\n");
		assert_eq!(result, Err(ParseError::InvalidTypeMarker(b'&')));
		assert_eq!(consumed, 0);
	}

	#[rstest]
	#[case(b":abc\r\n")]
	#[case(b":\r\n")]
	#[case(b"$x\r\nfoo\r\n")]
	#[case(b"*1a\r\n")]
	fn test_non_numeric_fields_fail(#[case] input: &[u8]) {
		let (result, _) = decode_str(input);
		assert!(matches!(result, Err(ParseError::InvalidInteger(_))));
	}

	#[test]
	fn test_negative_lengths_rejected() {
		let (result, _) = decode_str(b"$-2\r\n");
		assert_eq!(result, Err(ParseError::InvalidBulkStringLength(-2)));

		let (result, _) = decode_str(b"*-5\r\n");
		assert_eq!(result, Err(ParseError::InvalidArrayLength(-5)));
	}

	#[test]
	fn test_bulk_string_missing_terminator() {
		let (result, _) = decode_str(b"$3\r\nfooXY");
		assert!(matches!(result, Err(ParseError::InvalidFormat(_))));
	}

	#[test]
	fn test_bulk_string_may_contain_crlf() {
		let mut buf = BytesMut::from(&b"$2\r\n\r\n\r\n$1\r\n\r\r\n"[..]);
		let parser = RespParser::new();
		assert_eq!(
			parser.decode(&mut buf).unwrap(),
			DecodeOutcome::Continue(RespValue::bulk_string("\r\n"))
		);
		assert_eq!(
			parser.decode(&mut buf).unwrap(),
			DecodeOutcome::Continue(RespValue::bulk_string("\r"))
		);
		assert_eq!(parser.decode(&mut buf).unwrap(), DecodeOutcome::NeedMoreData);
	}

	#[test]
	fn test_nesting_limit() {
		let parser = RespParser::new().with_max_depth(2);
		let mut ok = BytesMut::from(&b"*1\r\n*1\r\n:1\r\n"[..]);
		assert!(matches!(
			parser.decode(&mut ok),
			Ok(DecodeOutcome::Continue(_))
		));

		let mut too_deep = BytesMut::from(&b"*1\r\n*1\r\n*1\r\n:1\r\n"[..]);
		assert!(matches!(
			parser.decode(&mut too_deep),
			Err(ParseError::InvalidFormat(msg)) if msg.contains("maximum depth")
		));
	}

	#[test]
	fn test_incomplete_input_reported_as_eof() {
		let mut buf = BytesMut::from(&b"$5\r\nhel"[..]);
		assert_eq!(parse(&mut buf), Err(ParseError::UnexpectedEOF));
		assert_eq!(&buf[..], b"$5\r\nhel");
	}
}
