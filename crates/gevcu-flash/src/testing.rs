//! Test utilities for gevcu-flash.
//!
//! Provides a scripted in-process controller so integration tests can
//! assert on framing, acknowledgment pacing, and byte fidelity without a
//! real GEVCU7 on the bench.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::protocol::LINE_ACK;

/// Everything the mock controller observed during one connection.
#[derive(Debug, Default)]
pub struct Transcript {
    /// First byte received after the connection came up, if any.
    pub start_byte: Option<u8>,
    /// Payload lines in receipt order (start byte excluded).
    pub lines: Vec<Vec<u8>>,
    /// Acknowledgment bytes the mock sent.
    pub acks_sent: u64,
    /// Bytes that arrived after the last expected line (should stay empty).
    pub trailing: Vec<u8>,
}

impl Transcript {
    /// Concatenation of all received payload lines.
    pub fn payload(&self) -> Vec<u8> {
        self.lines.concat()
    }
}

/// A scripted controller for integration tests.
///
/// The mock is told the exact image the uploader is expected to send. It
/// acknowledges each line only once that line has arrived in full, and can
/// inject noise bytes ahead of every genuine acknowledgment.
pub struct MockGevcu {
    addr: SocketAddr,
    handle: JoinHandle<std::io::Result<Transcript>>,
}

impl MockGevcu {
    /// Start a mock controller expecting `firmware` to be uploaded.
    pub async fn start(firmware: &[u8]) -> std::io::Result<Self> {
        Self::start_with_noise(firmware, &[]).await
    }

    /// Start a mock that sends `noise` before each acknowledgment byte.
    pub async fn start_with_noise(firmware: &[u8], noise: &[u8]) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let expected = split_lines(firmware);
        let noise = noise.to_vec();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await?;
            let mut transcript = Transcript::default();

            // Start sentinel. An uploader that bails out before arming the
            // flasher shows up here as a clean EOF.
            let mut byte = [0u8; 1];
            if stream.read(&mut byte).await? == 0 {
                return Ok(transcript);
            }
            transcript.start_byte = Some(byte[0]);

            for expected_line in &expected {
                let mut line = vec![0u8; expected_line.len()];
                stream.read_exact(&mut line).await?;
                transcript.lines.push(line);

                if !noise.is_empty() {
                    stream.write_all(&noise).await?;
                }
                stream.write_all(&[LINE_ACK]).await?;
                transcript.acks_sent += 1;
            }

            // Anything past the last line is a framing bug.
            stream.read_to_end(&mut transcript.trailing).await?;
            Ok(transcript)
        });

        Ok(Self { addr, handle })
    }

    /// Address the mock is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Host string for an [`UploadConfig`](crate::UploadConfig).
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Wait for the controller task and return what it observed.
    pub async fn finish(self) -> std::io::Result<Transcript> {
        self.handle.await.expect("mock controller task panicked")
    }
}

/// Split an image the way the uploader frames it: through each newline,
/// plus a final partial line if the image does not end in one.
fn split_lines(image: &[u8]) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut rest = image;
    while !rest.is_empty() {
        match rest.iter().position(|&b| b == b'\n') {
            Some(idx) => {
                lines.push(rest[..=idx].to_vec());
                rest = &rest[idx + 1..];
            }
            None => {
                lines.push(rest.to_vec());
                rest = &[];
            }
        }
    }
    lines
}
