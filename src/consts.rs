use std::time::Duration;

/// Default timeout for writing a chunk to the cutter.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(10000);

/// Timeout of the non-blocking read which drains stray diagnostics before a write.
pub const DRAIN_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Timeout for reading the reply to the status enquiry.
pub const STATUS_READ_TIMEOUT: Duration = Duration::from_millis(5000);

/// Timeout for reading the reply to a generic query.
pub const QUERY_READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Timeout for reading the firmware version.
pub const VERSION_READ_TIMEOUT: Duration = Duration::from_millis(10000);

/// The automatic registration mark search may take a while.
pub const REGMARK_READ_TIMEOUT: Duration = Duration::from_millis(40000);

/// Pause before retrying a chunk which timed out or was not accepted.
pub const WRITE_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Maximum number of retries of a chunk which the cutter accepted with zero length.
pub const ZERO_WRITE_RETRIES: u32 = 5;

/// Interval between two status polls while a plot fragment is executed.
pub const SAFE_WRITE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Time a single plot fragment may take before we stop polling.
pub const SAFE_WRITE_READY_TIMEOUT: Duration = Duration::from_secs(120);

/// Defaults of a plain `wait_for_ready` call.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Interval between status polls while the Portrait3 searches registration marks.
pub const REGMARK_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Waiting for the Portrait3 to settle after a successful registration mark search.
pub const REGMARK_READY_TIMEOUT: Duration = Duration::from_secs(10);
pub const REGMARK_READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Raw writes are split into chunks of this size.
pub const RAW_CHUNK_SIZE: usize = 4096;

/// Plot streams are split into fragments of at most this size, at command boundaries.
/// Silhouette Studio uses up to 3k, 1k is its default.
pub const SAFE_CHUNK_SIZE: usize = 1024;

/// Receive buffer size for replies.
pub const DEFAULT_RX_BUF_SIZE: usize = 64;

pub const ENDPOINT_IN_ADDR: u8 = 0x82;
pub const ENDPOINT_OUT_ADDR: u8 = 0x01;

pub const VENDOR_ID_GRAPHTEC: u16 = 0x0B4D;

/// End Of Text, terminates every command and every reply.
pub const CMD_ETX: u8 = 0x03;

/// Escape, prefixes the single byte escape commands.
pub const CMD_ESC: u8 = 0x1B;

/// Escape command codes.
pub mod esc {
    /// Initializes the device.
    pub const EOT: u8 = 0x04;
    /// Enquiry, returns the device status.
    pub const ENQ: u8 = 0x05;
    /// Returns the device name and firmware (Portrait3).
    pub const DC1: u8 = 0x11;
    /// Negative acknowledge, returns the tool setup.
    pub const NAK: u8 = 0x15;
}

/// Firmware version query.
pub const QUERY_FIRMWARE_VERSION: &str = "FG";

/// Status replies, without the terminator.
pub mod resp {
    pub const READY: &[u8] = b"0";
    pub const MOVING: &[u8] = b"1";
    pub const UNLOADED: &[u8] = b"2";
    pub const FAIL: &[u8] = b"-1";

    /// Stands in for the status reply when the status could not be read at all.
    pub const NO_DEVICE: &[u8] = b"None";

    /// Reply of a successful registration mark search.
    pub const REGMARK_FOUND: &[u8] = b"    0\x03";
}
