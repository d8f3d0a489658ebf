use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::RespValue;
use crate::utils::ARRAY;
use crate::utils::BULK_STRING;
use crate::utils::CRLF;
use crate::utils::ERROR;
use crate::utils::INTEGER;
use crate::utils::SIMPLE_STRING;

/// Trait for encoding RESP values.
pub trait RespEncoder {
	fn encode_to(&self, buf: &mut BytesMut);

	fn encode(&self) -> Bytes {
		let mut buf = BytesMut::new();
		self.encode_to(&mut buf);
		buf.freeze()
	}
}

impl RespEncoder for RespValue {
	fn encode_to(&self, buf: &mut BytesMut) {
		match self {
			RespValue::SimpleString(s) => encode_line(buf, SIMPLE_STRING, s),
			RespValue::Error(e) => encode_line(buf, ERROR, e),
			RespValue::Integer(i) => encode_integer(buf, *i),
			RespValue::BulkString(s) => encode_bulk_string(buf, s),
			RespValue::Array(arr) => encode_array(buf, arr),
			RespValue::Null => encode_null(buf),
		}
	}
}

#[inline]
fn encode_line(buf: &mut BytesMut, marker: u8, s: &[u8]) {
	buf.put_u8(marker);
	buf.put_slice(s);
	buf.put_slice(CRLF);
}

#[inline]
fn encode_integer(buf: &mut BytesMut, i: i64) {
	buf.put_u8(INTEGER);
	buf.put_slice(i.to_string().as_bytes());
	buf.put_slice(CRLF);
}

#[inline]
fn encode_length(buf: &mut BytesMut, marker: u8, length: usize) {
	buf.put_u8(marker);
	buf.put_slice(length.to_string().as_bytes());
	buf.put_slice(CRLF);
}

#[inline]
fn encode_bulk_string(buf: &mut BytesMut, s: &[u8]) {
	encode_length(buf, BULK_STRING, s.len());
	buf.put_slice(s);
	buf.put_slice(CRLF);
}

fn encode_array(buf: &mut BytesMut, arr: &[RespValue]) {
	encode_length(buf, ARRAY, arr.len());
	for value in arr {
		value.encode_to(buf);
	}
}

// RESP2 has no dedicated null type, the null bulk string stands in.
#[inline]
fn encode_null(buf: &mut BytesMut) {
	buf.put_slice(b"$-1\r\n");
}
