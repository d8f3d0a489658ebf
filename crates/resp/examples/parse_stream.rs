use bytes::BytesMut;
use resp::DecodeOutcome;
use resp::RespParser;

fn main() {
	println!("--- RESP Streaming Decode Example ---");

	// A subscribe acknowledgement followed by a published message, split into
	// arbitrary chunks the way a socket might deliver them.
	let data_chunks = vec![
		b"*3\r\n$9\r\nsubscr".as_slice(),
		b"ibe\r\n$4\r\nnews\r\n:1".as_slice(),
		b"\r\n*3\r\n$7\r\nmessage\r\n$4\r\nne".as_slice(),
		b"ws\r\n$5\r\nhello\r\n".as_slice(),
	];

	let parser = RespParser::new();
	let mut buffer = BytesMut::new();

	for (i, chunk) in data_chunks.iter().enumerate() {
		println!("\n[Stream] Received Chunk {}: {:?}", i, String::from_utf8_lossy(chunk));

		buffer.extend_from_slice(chunk);

		loop {
			match parser.decode(&mut buffer) {
				Ok(DecodeOutcome::Continue(value)) => {
					println!("[Decoder] Complete: {:?}", value);
				}
				Ok(DecodeOutcome::NeedMoreData) => {
					println!("[Decoder] Need more data ({} bytes buffered)", buffer.len());
					break;
				}
				Err(e) => {
					eprintln!("[Decoder] Error: {:?}", e);
					return;
				}
			}
		}
	}
}
