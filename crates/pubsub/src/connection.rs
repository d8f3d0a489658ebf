//! The per-connection task: socket I/O around a [`PubSubHandler`].

use std::sync::Arc;

use bytes::BytesMut;
use log::debug;
use log::error;
use log::trace;
use log::warn;
use resp::DecodeOutcome;
use resp::RespEncoder;
use resp::RespParser;
use resp::RespValue;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::ToSocketAddrs;
use tokio::sync::mpsc;

use crate::client::PubSubClient;
use crate::client::Request;
use crate::error::PubSubError;
use crate::handler::PubSubHandler;
use crate::metrics::MetricsSink;

pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Owns a stream, its decode buffer and the [`PubSubHandler`] for it.
///
/// Nothing happens until [`Connection::run`] is polled, normally on its own
/// task. Interact with it through the [`PubSubClient`] returned by
/// [`Connection::new`].
pub struct Connection<S> {
	stream: S,
	handler: PubSubHandler,
	requests: mpsc::UnboundedReceiver<Request>,
	outbound: mpsc::UnboundedReceiver<RespValue>,
	replies: Option<mpsc::UnboundedSender<RespValue>>,
	parser: RespParser,
	read_buf: BytesMut,
	write_buf: BytesMut,
}

/// Connect to a Redis server over TCP.
pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<(Connection<TcpStream>, PubSubClient), PubSubError> {
	let stream = TcpStream::connect(addr).await?;
	stream.set_nodelay(true)?;
	Ok(Connection::new(stream))
}

impl<S> Connection<S>
where
	S: AsyncRead + AsyncWrite + Unpin,
{
	pub fn new(stream: S) -> (Self, PubSubClient) {
		let (request_tx, request_rx) = mpsc::unbounded_channel();
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		let connection = Self {
			stream,
			handler: PubSubHandler::new(outbound_tx),
			requests: request_rx,
			outbound: outbound_rx,
			replies: None,
			parser: RespParser::new(),
			read_buf: BytesMut::with_capacity(DEFAULT_READ_BUFFER_SIZE),
			write_buf: BytesMut::new(),
		};
		(connection, PubSubClient::new(request_tx))
	}

	pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
		self.handler = self.handler.with_metrics(metrics);
		self
	}

	/// Receive values that are not Pub/Sub frames, such as replies to other
	/// commands. Without a sink they are logged and dropped.
	pub fn with_reply_sink(mut self, replies: mpsc::UnboundedSender<RespValue>) -> Self {
		self.replies = Some(replies);
		self
	}

	pub fn with_read_buffer_size(mut self, size: usize) -> Self {
		self.read_buf = BytesMut::with_capacity(size);
		self
	}

	pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
		self.handler = self.handler.with_queue_capacity(capacity);
		self
	}

	/// Drive the connection until it is closed by a client handle, every
	/// handle is dropped, or the stream fails.
	pub async fn run(mut self) -> Result<(), PubSubError> {
		let result = self.drive().await;
		match &result {
			Ok(()) => debug!("Pub/Sub connection closed"),
			Err(e) => error!("Pub/Sub connection terminated: {}", e),
		}
		result
	}

	async fn drive(&mut self) -> Result<(), PubSubError> {
		loop {
			tokio::select! {
				request = self.requests.recv() => match request {
					Some(request) => {
						if !self.handle_request(request).await {
							return Ok(());
						}
					}
					None => {
						debug!("All client handles dropped");
						self.handler.remove();
						return Ok(());
					}
				},
				read = self.stream.read_buf(&mut self.read_buf) => match read {
					Ok(0) => {
						self.handler.handle_closed();
						return Err(PubSubError::ConnectionClosed);
					}
					Ok(n) => {
						trace!("Read {} bytes from socket", n);
						self.process_inbound()?;
					}
					Err(e) => return Err(self.fail(e.into())),
				},
			}

			self.flush_outbound().await?;
		}
	}

	/// Returns `false` once the connection should stop.
	async fn handle_request(&mut self, request: Request) -> bool {
		match request {
			Request::Add {
				target,
				receiver,
				reply,
			} => {
				let change = self.handler.add_subscription(target, receiver);
				let _ = reply.send(change);
			}
			Request::Remove { target, reply } => {
				let change = self.handler.remove_subscription(target);
				let _ = reply.send(change);
			}
			Request::Count { kind, reply } => {
				let count = match kind {
					Some(kind) => self.handler.subscription_count(kind),
					None => self.handler.total_subscriptions(),
				};
				let _ = reply.send(count);
			}
			Request::Close { reply } => {
				self.handler.remove();
				if let Err(e) = self.stream.shutdown().await {
					debug!("Failed to shut down stream: {}", e);
				}
				let _ = reply.send(());
				return false;
			}
		}
		true
	}

	fn process_inbound(&mut self) -> Result<(), PubSubError> {
		loop {
			match self.parser.decode(&mut self.read_buf) {
				Ok(DecodeOutcome::Continue(value)) => match self.handler.handle_value(value) {
					Ok(Some(reply)) => self.forward(reply),
					Ok(None) => {}
					Err(e) => return Err(self.fail(e)),
				},
				Ok(DecodeOutcome::NeedMoreData) => return Ok(()),
				Err(e) => return Err(self.fail(e.into())),
			}
		}
	}

	fn forward(&self, reply: RespValue) {
		match &self.replies {
			Some(tx) => {
				if tx.send(reply).is_err() {
					warn!("Reply receiver dropped, discarding reply");
				}
			}
			None => warn!("Discarding unexpected reply: {:?}", reply),
		}
	}

	async fn flush_outbound(&mut self) -> Result<(), PubSubError> {
		while let Ok(command) = self.outbound.try_recv() {
			command.encode_to(&mut self.write_buf);
		}
		if self.write_buf.is_empty() {
			return Ok(());
		}

		let written = self.write_buf.len();
		let result = self.write_out().await;
		self.write_buf.clear();
		match result {
			Ok(()) => {
				trace!("Wrote {} bytes to socket", written);
				Ok(())
			}
			Err(e) => Err(self.fail(e.into())),
		}
	}

	async fn write_out(&mut self) -> std::io::Result<()> {
		self.stream.write_all(&self.write_buf).await?;
		self.stream.flush().await
	}

	fn fail(&mut self, cause: PubSubError) -> PubSubError {
		self.handler.handle_error(cause.clone());
		cause
	}
}
