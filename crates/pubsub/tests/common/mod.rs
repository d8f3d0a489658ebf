#![allow(dead_code)]

use bytes::Bytes;
use bytes::BytesMut;
use pubsub::Connection;
use pubsub::PubSubClient;
use resp::DecodeOutcome;
use resp::RespEncoder;
use resp::RespParser;
use resp::RespValue;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::DuplexStream;

/// In-memory Redis that answers subscription commands the way a real server
/// does: one acknowledgement per target, each carrying the running total.
pub struct MockRedis {
	stream: DuplexStream,
	buf: BytesMut,
	parser: RespParser,
	channels: Vec<Bytes>,
	patterns: Vec<Bytes>,
}

pub fn pair() -> (Connection<DuplexStream>, PubSubClient, MockRedis) {
	let (client_io, server_io) = tokio::io::duplex(4096);
	let (connection, client) = Connection::new(client_io);
	(connection, client, MockRedis::new(server_io))
}

impl MockRedis {
	pub fn new(stream: DuplexStream) -> Self {
		Self {
			stream,
			buf: BytesMut::new(),
			parser: RespParser::new(),
			channels: Vec::new(),
			patterns: Vec::new(),
		}
	}

	/// Read one command sent by the client.
	pub async fn read_command(&mut self) -> Vec<Bytes> {
		loop {
			if let DecodeOutcome::Continue(value) = self.parser.decode(&mut self.buf).unwrap() {
				return value
					.into_vec()
					.unwrap()
					.into_iter()
					.map(|arg| arg.as_bytes().cloned().unwrap())
					.collect();
			}
			let n = self.stream.read_buf(&mut self.buf).await.unwrap();
			assert!(n > 0, "client closed the connection");
		}
	}

	/// Read one command and reply to it. Returns the command.
	pub async fn handle_next(&mut self) -> Vec<Bytes> {
		let command = self.read_command().await;
		let (name, args) = command.split_first().unwrap();
		match name.as_ref() {
			b"SUBSCRIBE" => {
				for arg in args {
					if !self.channels.contains(arg) {
						self.channels.push(arg.clone());
					}
					self.ack("subscribe", Some(arg.clone())).await;
				}
			}
			b"PSUBSCRIBE" => {
				for arg in args {
					if !self.patterns.contains(arg) {
						self.patterns.push(arg.clone());
					}
					self.ack("psubscribe", Some(arg.clone())).await;
				}
			}
			b"UNSUBSCRIBE" => {
				let targets = if args.is_empty() {
					self.channels.clone()
				} else {
					args.to_vec()
				};
				if targets.is_empty() {
					self.ack("unsubscribe", None).await;
				}
				for target in targets {
					self.channels.retain(|c| *c != target);
					self.ack("unsubscribe", Some(target)).await;
				}
			}
			b"PUNSUBSCRIBE" => {
				let targets = if args.is_empty() {
					self.patterns.clone()
				} else {
					args.to_vec()
				};
				if targets.is_empty() {
					self.ack("punsubscribe", None).await;
				}
				for target in targets {
					self.patterns.retain(|p| *p != target);
					self.ack("punsubscribe", Some(target)).await;
				}
			}
			other => panic!("unexpected command {:?}", other),
		}
		command
	}

	/// Deliver `payload` to every matching channel and pattern subscription.
	pub async fn publish(&mut self, channel: &'static str, payload: &'static str) {
		let mut frames = Vec::new();
		if self.channels.iter().any(|c| c.as_ref() == channel.as_bytes()) {
			frames.push(RespValue::array([
				RespValue::bulk_string("message"),
				RespValue::bulk_string(channel),
				RespValue::bulk_string(payload),
			]));
		}
		for pattern in &self.patterns {
			if glob_match(pattern, channel.as_bytes()) {
				frames.push(RespValue::array([
					RespValue::bulk_string("pmessage"),
					RespValue::BulkString(pattern.clone()),
					RespValue::bulk_string(channel),
					RespValue::bulk_string(payload),
				]));
			}
		}
		for frame in frames {
			self.send(&frame).await;
		}
	}

	pub async fn send(&mut self, value: &RespValue) {
		self.write_raw(&value.encode()).await;
	}

	pub async fn write_raw(&mut self, bytes: &[u8]) {
		self.stream.write_all(bytes).await.unwrap();
		self.stream.flush().await.unwrap();
	}

	fn total(&self) -> i64 {
		(self.channels.len() + self.patterns.len()) as i64
	}

	async fn ack(&mut self, keyword: &'static str, target: Option<Bytes>) {
		let frame = RespValue::array([
			RespValue::bulk_string(keyword),
			target.map(RespValue::BulkString).unwrap_or(RespValue::Null),
			RespValue::integer(self.total()),
		]);
		self.send(&frame).await;
	}
}

fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
	match pattern.split_first() {
		None => text.is_empty(),
		Some((b'*', rest)) => (0..=text.len()).any(|i| glob_match(rest, &text[i..])),
		Some((b'?', rest)) => !text.is_empty() && glob_match(rest, &text[1..]),
		Some((c, rest)) => text.first() == Some(c) && glob_match(rest, &text[1..]),
	}
}
