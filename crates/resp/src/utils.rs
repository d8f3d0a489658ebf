//! Utility functions and constants for RESP protocol.

use crate::error::ParseError;

/// CRLF line ending
pub const CRLF: &[u8] = b"\r\n";

/// Type markers for RESP2
pub const SIMPLE_STRING: u8 = b'+';
pub const ERROR: u8 = b'-';
pub const INTEGER: u8 = b':';
pub const BULK_STRING: u8 = b'$';
pub const ARRAY: u8 = b'*';

/// Find the position of CRLF in a byte slice
#[inline]
pub fn find_crlf(buf: &[u8]) -> Option<usize> {
	let mut offset = 0;
	while let Some(pos) = memchr::memchr(b'\r', &buf[offset..]) {
		let cr = offset + pos;
		match buf.get(cr + 1) {
			Some(b'\n') => return Some(cr),
			Some(_) => offset = cr + 1,
			None => return None,
		}
	}
	None
}

/// Peek a line from buffer (without CRLF).
///
/// Returns the line and the number of bytes it occupies including the CRLF,
/// or `None` if the terminator has not arrived yet.
#[inline]
pub fn peek_line(buf: &[u8]) -> Option<(&[u8], usize)> {
	find_crlf(buf).map(|pos| (&buf[..pos], pos + 2))
}

/// Parse a signed decimal integer from a byte slice.
///
/// Digits are accumulated in negative space so that `i64::MIN`, which has
/// no positive counterpart, parses without overflow.
pub fn parse_integer(buf: &[u8]) -> Result<i64, ParseError> {
	let invalid = || ParseError::InvalidInteger(String::from_utf8_lossy(buf).into_owned());

	let (negative, digits) = match buf.split_first() {
		Some((b'-', rest)) => (true, rest),
		Some((b'+', rest)) => (false, rest),
		_ => (false, buf),
	};
	if digits.is_empty() {
		return Err(invalid());
	}

	let mut acc: i64 = 0;
	for &byte in digits {
		if !byte.is_ascii_digit() {
			return Err(invalid());
		}
		let digit = (byte - b'0') as i64;
		acc = acc
			.checked_mul(10)
			.and_then(|v| v.checked_sub(digit))
			.ok_or_else(invalid)?;
	}

	if negative {
		Ok(acc)
	} else {
		acc.checked_neg().ok_or_else(invalid)
	}
}
