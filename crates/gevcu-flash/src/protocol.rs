//! Wire protocol of the GEVCU7 telnet flashing service.
//!
//! The protocol is two sentinel bytes and nothing else: the uploader sends
//! `0xA5` once to arm the flasher, then streams the image line by line, and
//! the controller answers each line with a single `0x97` byte once it has
//! consumed it. Any other byte from the controller is noise and is dropped.

use tokio::io::{AsyncRead, AsyncReadExt};

/// Begin-firmware-transfer sentinel, sent once after connecting.
pub const START_TRANSFER: u8 = 0xA5;

/// Per-line acknowledgment sentinel sent by the controller.
pub const LINE_ACK: u8 = 0x97;

/// The controller's flashing service listens on the telnet port.
pub const GEVCU_PORT: u16 = 23;

/// Block until a [`LINE_ACK`] byte arrives on `reader`.
///
/// Returns the number of non-sentinel bytes discarded along the way. The
/// wait is unbounded: if the controller never acknowledges, this never
/// returns. The read stops at the first sentinel and consumes nothing past
/// it; a clean EOF before the sentinel surfaces as `UnexpectedEof`.
pub async fn await_ack<R>(reader: &mut R) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut noise = 0u64;
    loop {
        let byte = reader.read_u8().await?;
        if byte == LINE_ACK {
            return Ok(noise);
        }
        noise += 1;
    }
}
