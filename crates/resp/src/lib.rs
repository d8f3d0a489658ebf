//! # RESP - Redis Serialization Protocol Library
//!
//! An incremental RESP2 decoder and encoder for Rust.
//!
//! The decoder is built for reading from a socket: bytes are appended to a
//! [`bytes::BytesMut`] as they arrive and [`RespParser::decode`] is called in a
//! loop until it reports [`DecodeOutcome::NeedMoreData`]. A value that is only
//! partly buffered is never consumed, so fragmented input needs no special
//! handling by the caller.
//!
//! ## Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use resp::DecodeOutcome;
//! use resp::RespParser;
//!
//! let parser = RespParser::new();
//! let mut buf = BytesMut::from(&b"$2\r\n"[..]);
//! assert_eq!(parser.decode(&mut buf).unwrap(), DecodeOutcome::NeedMoreData);
//!
//! buf.extend_from_slice(b"ok\r\n");
//! match parser.decode(&mut buf).unwrap() {
//! 	DecodeOutcome::Continue(value) => assert_eq!(value.as_str(), Some("ok")),
//! 	DecodeOutcome::NeedMoreData => unreachable!(),
//! }
//! ```

mod encode;
mod error;
mod parser;
mod types;
mod utils;

pub use encode::RespEncoder;
pub use error::ParseError;
pub use parser::DecodeOutcome;
pub use parser::MAX_NESTING_DEPTH;
pub use parser::RespParser;
pub use parser::parse;
pub use types::RespValue;
