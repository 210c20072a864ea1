//! Firmware upload client for the GEVCU7 vehicle control unit.
//!
//! The GEVCU7 exposes a minimal flashing service on the telnet port: a
//! single `0xA5` byte arms the flasher, then the hex image is streamed line
//! by line, with each line held back until the controller has acknowledged
//! the previous one with a `0x97` byte (stop-and-wait flow control).
//!
//! # Example
//!
//! ```no_run
//! use gevcu_flash::{UploadConfig, Uploader};
//!
//! # async fn run() -> gevcu_flash::Result<()> {
//! let uploader = Uploader::new(UploadConfig::default());
//! let report = uploader.upload().await?;
//! println!("sent {} lines", report.lines_sent);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod testing;
pub mod uploader;

pub use config::{TimingConfig, UploadConfig};
pub use error::{Result, UploadError};
pub use uploader::{TransferProgress, TransferReport, Uploader};
