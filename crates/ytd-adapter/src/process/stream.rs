//! Async, non-UTF8-safe line reader for the downloader subprocess's stdout
//! and stderr.
//!
//! yt-dlp can emit non-UTF8 bytes (filenames, foreign-language titles) on
//! either stream. `BufReader::lines()` would terminate the reader task on
//! invalid UTF-8, so this reads raw bytes up to `\n` and decodes lossily.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

/// One decoded line from a subprocess stream, tagged by origin.
#[derive(Debug, Clone)]
pub struct StreamLine {
    pub stream: &'static str,
    pub text: String,
}

/// Spawn a task that reads lines from `stream` and forwards them on `tx`
/// until EOF or a read error. Exits silently if the receiver is dropped.
pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    stream_name: &'static str,
    tx: mpsc::UnboundedSender<StreamLine>,
) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }
                    let text = String::from_utf8_lossy(&buf).to_string();
                    if tx
                        .send(StreamLine {
                            stream: stream_name,
                            text,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
}
