//! GEVCU CLI - firmware upload tool for the GEVCU7 vehicle control unit
//!
//! Streams a hex image to the controller's telnet flashing service one line
//! at a time, pacing each line on the controller's acknowledgment byte.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gevcu_flash::{TransferProgress, UploadConfig, Uploader};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "gevcu-cli")]
#[command(author, version, about = "GEVCU7 firmware upload tool")]
struct Cli {
    /// Controller hostname or IP address
    host: Option<String>,

    /// TCP port of the controller's flashing service
    #[arg(long)]
    port: Option<u16>,

    /// Firmware image to upload
    #[arg(short, long)]
    firmware: Option<PathBuf>,

    /// Configuration file path (TOML)
    #[arg(short, long, env = "GEVCU_CONFIG")]
    config: Option<PathBuf>,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file, then let CLI args override it
    let mut config = match &cli.config {
        Some(path) => UploadConfig::load_from(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => UploadConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(firmware) = &cli.firmware {
        config.firmware = firmware.clone();
    }

    if !cli.quiet {
        println!(
            "Starting firmware update with address {}:{}",
            config.host, config.port
        );
    }

    let pb = if cli.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );

    let uploader = Uploader::new(config);
    let report = uploader
        .upload_with_progress(|progress| match progress {
            TransferProgress::Connected => pb.set_message("Connected, settling..."),
            TransferProgress::Started => pb.set_message("Transferring..."),
            TransferProgress::Milestone { lines_sent } => {
                // Milestone notices go to stdout; the spinner only tracks phase
                if !cli.quiet {
                    println!("Still transferring... ({lines_sent} lines)");
                }
            }
            TransferProgress::Draining => pb.set_message("Waiting for the controller to commit..."),
        })
        .await
        .context("Firmware upload failed")?;

    pb.finish_and_clear();
    if !cli.quiet {
        println!(
            "Done sending firmware: {} lines, {} bytes ({} noise bytes discarded)",
            report.lines_sent, report.bytes_sent, report.noise_bytes
        );
    }

    Ok(())
}
