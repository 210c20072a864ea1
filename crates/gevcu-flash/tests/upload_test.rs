//! Integration tests for the upload loop against a scripted controller.
//!
//! These run the real uploader over loopback TCP with all settle/drain
//! delays zeroed, and assert on the transcript the mock controller kept.

use std::path::Path;

use gevcu_flash::protocol::START_TRANSFER;
use gevcu_flash::testing::MockGevcu;
use gevcu_flash::{TimingConfig, UploadConfig, UploadError, Uploader};

fn test_config(mock: &MockGevcu, firmware: &Path) -> UploadConfig {
    UploadConfig {
        host: mock.host(),
        port: mock.port(),
        firmware: firmware.to_path_buf(),
        timing: TimingConfig::immediate(),
    }
}

fn write_firmware(dir: &tempfile::TempDir, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join("GEVCU7.hex");
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn lines_are_sent_in_order_one_ack_each() {
    let firmware = b":100000000102\n:100010000304\n:00000001FF\n";
    let dir = tempfile::tempdir().unwrap();
    let path = write_firmware(&dir, firmware);

    let mock = MockGevcu::start(firmware).await.unwrap();
    let report = Uploader::new(test_config(&mock, &path))
        .upload()
        .await
        .unwrap();

    let transcript = mock.finish().await.unwrap();
    assert_eq!(transcript.start_byte, Some(START_TRANSFER));
    assert_eq!(transcript.lines.len(), 3);
    assert_eq!(transcript.lines[0], b":100000000102\n");
    assert_eq!(transcript.lines[1], b":100010000304\n");
    assert_eq!(transcript.lines[2], b":00000001FF\n");
    assert_eq!(transcript.acks_sent, 3);
    assert!(transcript.trailing.is_empty());

    assert_eq!(report.lines_sent, 3);
    assert_eq!(report.bytes_sent, firmware.len() as u64);
    assert_eq!(report.noise_bytes, 0);
}

#[tokio::test]
async fn start_sentinel_precedes_all_payload() {
    let firmware = b":00000001FF\n";
    let dir = tempfile::tempdir().unwrap();
    let path = write_firmware(&dir, firmware);

    let mock = MockGevcu::start(firmware).await.unwrap();
    Uploader::new(test_config(&mock, &path))
        .upload()
        .await
        .unwrap();

    let transcript = mock.finish().await.unwrap();
    assert_eq!(transcript.start_byte, Some(START_TRANSFER));
    assert_eq!(transcript.payload(), firmware);
}

#[tokio::test]
async fn noise_before_ack_is_discarded_not_advanced_on() {
    let firmware = b"line one\nline two\nline three\n";
    let dir = tempfile::tempdir().unwrap();
    let path = write_firmware(&dir, firmware);

    let mock = MockGevcu::start_with_noise(firmware, &[0x00, 0xFF])
        .await
        .unwrap();
    let report = Uploader::new(test_config(&mock, &path))
        .upload()
        .await
        .unwrap();

    let transcript = mock.finish().await.unwrap();
    assert_eq!(transcript.lines.len(), 3);
    assert_eq!(transcript.payload(), firmware);
    // Two noise bytes swallowed ahead of each of the three acks
    assert_eq!(report.noise_bytes, 6);
}

#[tokio::test]
async fn single_line_image_goes_straight_to_teardown() {
    let firmware = b":00000001FF";
    let dir = tempfile::tempdir().unwrap();
    let path = write_firmware(&dir, firmware);

    let mock = MockGevcu::start(firmware).await.unwrap();
    let report = Uploader::new(test_config(&mock, &path))
        .upload()
        .await
        .unwrap();

    let transcript = mock.finish().await.unwrap();
    assert_eq!(transcript.lines.len(), 1);
    assert_eq!(transcript.lines[0], firmware.to_vec());
    assert!(transcript.trailing.is_empty());
    assert_eq!(report.lines_sent, 1);
}

#[tokio::test]
async fn image_without_trailing_newline_roundtrips_exactly() {
    let firmware = b":100000000102\n:00000001FF";
    let dir = tempfile::tempdir().unwrap();
    let path = write_firmware(&dir, firmware);

    let mock = MockGevcu::start(firmware).await.unwrap();
    let report = Uploader::new(test_config(&mock, &path))
        .upload()
        .await
        .unwrap();

    let transcript = mock.finish().await.unwrap();
    assert_eq!(transcript.payload(), firmware);
    assert_eq!(report.bytes_sent, firmware.len() as u64);
}

#[tokio::test]
async fn missing_firmware_fails_before_the_handshake() {
    let mock = MockGevcu::start(b"").await.unwrap();
    let config = UploadConfig {
        host: mock.host(),
        port: mock.port(),
        firmware: "/nonexistent/GEVCU7.hex".into(),
        timing: TimingConfig::immediate(),
    };

    let err = Uploader::new(config).upload().await.unwrap_err();
    assert!(matches!(err, UploadError::FirmwareOpen { .. }));

    // The connection came up, but nothing was ever sent on it
    let transcript = mock.finish().await.unwrap();
    assert_eq!(transcript.start_byte, None);
    assert!(transcript.payload().is_empty());
}

#[tokio::test]
async fn connect_failure_is_fatal() {
    // Bind and immediately drop a listener to get a port nobody serves
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let path = write_firmware(&dir, b":00000001FF\n");
    let config = UploadConfig {
        host: "127.0.0.1".to_string(),
        port,
        firmware: path,
        timing: TimingConfig::immediate(),
    };

    let err = Uploader::new(config).upload().await.unwrap_err();
    assert!(matches!(err, UploadError::Connect { .. }));
}

#[tokio::test]
async fn milestone_fires_every_thousand_lines() {
    use gevcu_flash::TransferProgress;

    // 2200 lines: the rolling counter trips past 1000 twice
    let firmware = b":10FFFF00\n".repeat(2200);
    let dir = tempfile::tempdir().unwrap();
    let path = write_firmware(&dir, &firmware);

    let mock = MockGevcu::start(&firmware).await.unwrap();
    let mut milestones = Vec::new();
    let report = Uploader::new(test_config(&mock, &path))
        .upload_with_progress(|p| {
            if let TransferProgress::Milestone { lines_sent } = p {
                milestones.push(*lines_sent);
            }
        })
        .await
        .unwrap();
    mock.finish().await.unwrap();

    assert_eq!(milestones, vec![1001, 2002]);
    assert_eq!(report.lines_sent, 2200);
}

#[tokio::test]
async fn progress_reports_connection_and_start() {
    use gevcu_flash::TransferProgress;

    let firmware = b"one\ntwo\n";
    let dir = tempfile::tempdir().unwrap();
    let path = write_firmware(&dir, firmware);

    let mock = MockGevcu::start(firmware).await.unwrap();
    let mut events = Vec::new();
    Uploader::new(test_config(&mock, &path))
        .upload_with_progress(|p| events.push(*p))
        .await
        .unwrap();
    mock.finish().await.unwrap();

    assert_eq!(
        events,
        vec![
            TransferProgress::Connected,
            TransferProgress::Started,
            TransferProgress::Draining,
        ]
    );
}
