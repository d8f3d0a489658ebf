//! Error types for RESP decoding.

use thiserror::Error;

/// Errors that can occur during RESP parsing.
///
/// Every variant is fatal to the stream it was raised on: the decoder does
/// not try to resynchronize after a malformed value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
	/// Unexpected end of input while parsing
	#[error("Unexpected end of input")]
	UnexpectedEOF,

	/// Invalid type marker encountered
	#[error("Invalid type marker: 0x{0:02X}")]
	InvalidTypeMarker(u8),

	/// Invalid format for the current type
	#[error("Invalid format: {0}")]
	InvalidFormat(String),

	/// Invalid integer value
	#[error("Invalid integer: {0}")]
	InvalidInteger(String),

	/// Invalid bulk string length
	#[error("Invalid bulk string length: {0}")]
	InvalidBulkStringLength(i64),

	/// Invalid array length
	#[error("Invalid array length: {0}")]
	InvalidArrayLength(i64),
}
