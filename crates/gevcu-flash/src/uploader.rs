//! The firmware uploader.
//!
//! Implements the stop-and-wait transfer loop: connect, settle, arm the
//! flasher with the start sentinel, then stream the image line by line,
//! blocking on the controller's acknowledgment before sending the next
//! line. Exactly one line is in flight at any time; that ordering is the
//! protocol's only flow-control mechanism.

use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::config::UploadConfig;
use crate::error::{Result, UploadError};
use crate::protocol::{await_ack, START_TRANSFER};

/// Lines between progress milestones.
const PROGRESS_INTERVAL: u64 = 1000;

/// Progress events emitted during a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferProgress {
    /// TCP connection to the controller is up.
    Connected,
    /// Start sentinel sent; line transfer is beginning.
    Started,
    /// Another batch of lines has been sent and acknowledged.
    Milestone { lines_sent: u64 },
    /// All lines acknowledged; waiting out the drain delay.
    Draining,
}

/// Summary of a completed transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferReport {
    /// Lines sent and acknowledged.
    pub lines_sent: u64,
    /// Total payload bytes sent (start sentinel excluded).
    pub bytes_sent: u64,
    /// Bytes received that were not the acknowledgment sentinel.
    pub noise_bytes: u64,
}

/// Runs a single firmware transfer to one controller.
///
/// The transfer is fully sequential on the calling task: the per-line
/// acknowledgment wait is unbounded, so a controller that stops responding
/// stalls the upload rather than failing it.
pub struct Uploader {
    config: UploadConfig,
}

impl Uploader {
    /// Create an uploader for the given configuration
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    /// Run the transfer to completion.
    pub async fn upload(&self) -> Result<TransferReport> {
        self.upload_with_progress(|_| {}).await
    }

    /// Run the transfer, reporting progress through `progress`.
    pub async fn upload_with_progress(
        &self,
        mut progress: impl FnMut(&TransferProgress),
    ) -> Result<TransferReport> {
        let cfg = &self.config;

        info!(host = %cfg.host, port = cfg.port, "Connecting to controller");
        let mut stream = TcpStream::connect((cfg.host.as_str(), cfg.port))
            .await
            .map_err(|source| UploadError::Connect {
                host: cfg.host.clone(),
                port: cfg.port,
                source,
            })?;
        progress(&TransferProgress::Connected);

        // Give the controller's listener a moment to come up.
        sleep_if_nonzero(cfg.timing.connect_settle()).await;

        let file = File::open(&cfg.firmware)
            .await
            .map_err(|source| UploadError::FirmwareOpen {
                path: cfg.firmware.clone(),
                source,
            })?;
        let mut image = BufReader::new(file);

        info!(firmware = %cfg.firmware.display(), "Beginning transfer");
        stream.write_all(&[START_TRANSFER]).await?;
        progress(&TransferProgress::Started);
        sleep_if_nonzero(cfg.timing.start_settle()).await;

        let mut report = TransferReport::default();
        let mut rolling = 0u64;
        let mut line = Vec::new();

        loop {
            line.clear();
            let n = image.read_until(b'\n', &mut line).await?;
            if n == 0 {
                break;
            }

            stream.write_all(&line).await?;
            report.lines_sent += 1;
            report.bytes_sent += n as u64;

            rolling += 1;
            if rolling > PROGRESS_INTERVAL {
                rolling = 0;
                debug!(lines_sent = report.lines_sent, "Still transferring");
                progress(&TransferProgress::Milestone {
                    lines_sent: report.lines_sent,
                });
            }

            report.noise_bytes += await_ack(&mut stream).await?;
        }

        progress(&TransferProgress::Draining);
        // Let the controller finish committing the final chunk before the
        // connection goes away.
        sleep_if_nonzero(cfg.timing.drain()).await;

        // Best-effort FIN; both handles close on drop regardless.
        let _ = stream.shutdown().await;

        info!(
            lines = report.lines_sent,
            bytes = report.bytes_sent,
            noise = report.noise_bytes,
            "Firmware sent"
        );
        Ok(report)
    }
}

async fn sleep_if_nonzero(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
