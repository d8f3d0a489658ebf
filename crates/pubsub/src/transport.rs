use resp::RespValue;
use tokio::sync::mpsc;

use crate::error::PubSubError;

/// Ordered outbound path for commands issued by the handler.
///
/// `write` only stages the command. Nothing reaches the peer until `flush`,
/// and commands reach it in the order they were written.
pub trait CommandSink: Send {
	fn write(&mut self, command: RespValue) -> Result<(), PubSubError>;

	fn flush(&mut self) -> Result<(), PubSubError> {
		Ok(())
	}
}

/// Hands commands to the connection task, which encodes and writes them.
impl CommandSink for mpsc::UnboundedSender<RespValue> {
	fn write(&mut self, command: RespValue) -> Result<(), PubSubError> {
		self.send(command).map_err(|_| PubSubError::ConnectionClosed)
	}
}
