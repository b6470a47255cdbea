//! Protocol constants for the UT2000 family.
//!
//! Command codes, endpoints, vendor request numbers and timing defaults live
//! here so the rest of the codebase references named constants instead of
//! raw hex.

use std::time::Duration;

// ---------------------------------------------------------------------------
// USB device identifiers
// ---------------------------------------------------------------------------

/// UNI-T vendor ID used by the control-transfer models.
pub const VENDOR_ID_UNIT: u16 = 0x5656;
/// WCH vendor ID; the UT2052CEL enumerates through a CH375 bridge.
pub const VENDOR_ID_WCH: u16 = 0x4348;

/// UT2025B product ID.
pub const PID_UT2025B: u16 = 0x0832;
/// UT2102C product ID.
pub const PID_UT2102C: u16 = 0x0834;
/// UT2052CEL product ID.
pub const PID_UT2052CEL: u16 = 0x5537;

/// USB configuration selected after opening the device.
pub const USB_CONFIGURATION: u8 = 1;
/// The only interface the scopes expose.
pub const USB_INTERFACE: u8 = 0;

// ---------------------------------------------------------------------------
// Endpoints and vendor requests
// ---------------------------------------------------------------------------

/// Bulk IN endpoint carrying screenshot and sample data.
pub const ENDPOINT_BULK_IN: u8 = 0x82;
/// Bulk OUT endpoint accepting single command bytes (bulk family).
pub const ENDPOINT_BULK_OUT: u8 = 0x02;

const REQ_VENDOR: u8 = 0x40;
const REQ_RECIPIENT_ENDPOINT: u8 = 0x02;
const REQ_DEVICE_TO_HOST: u8 = 0x80;
const REQ_HOST_TO_DEVICE: u8 = 0x00;

/// bmRequestType for vendor host-to-device requests (0x42).
pub const CTRL_OUT: u8 = REQ_RECIPIENT_ENDPOINT | REQ_VENDOR | REQ_HOST_TO_DEVICE;
/// bmRequestType for vendor device-to-host requests (0xC2).
pub const CTRL_IN: u8 = REQ_RECIPIENT_ENDPOINT | REQ_VENDOR | REQ_DEVICE_TO_HOST;

/// bRequest carrying a command byte in wValue.
pub const VENDOR_REQ_COMMAND: u8 = 0xB1;
/// bRequest selecting the bulk transfer mode before a read.
pub const VENDOR_REQ_MODE_SELECT: u8 = 0xB0;
/// bRequest reading the device status/reply buffer.
pub const VENDOR_REQ_STATUS: u8 = 0xB2;

/// Length of the reply buffer flushed during the connect handshake.
pub const STATUS_REPLY_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Command codes
// ---------------------------------------------------------------------------

/// Enter remote ("far") mode.
pub const CMD_ENTER_REMOTE: u8 = 0xF0;
/// Leave remote mode and return control to the front panel.
pub const CMD_LEAVE_REMOTE: u8 = 0xF1;
/// Request a screenshot.
pub const CMD_GET_SCREENSHOT: u8 = 0xE2;
/// Request a sample dump.
pub const CMD_GET_SAMPLES: u8 = 0xE1;

/// Priming code sent by the connect handshake and after entering remote mode.
pub const CMD_PRIME_A: u8 = 0x2C;
/// Priming code sent before a sample dump.
pub const CMD_PRIME_B: u8 = 0xDC;
/// Priming code closing every priming sequence.
pub const CMD_PRIME_C: u8 = 0xCC;

/// How many times each priming code is repeated.
pub const PRIME_REPEAT: usize = 10;

// ---------------------------------------------------------------------------
// Frame geometry
// ---------------------------------------------------------------------------

/// Size of one channel's metadata header in a sample frame.
pub const CHANNEL_HEADER_LEN: usize = 32;
/// Both channel headers together.
pub const HEADER_BLOCK_LEN: usize = 2 * CHANNEL_HEADER_LEN;
/// Largest sample frame any model returns.
pub const MAX_SAMPLE_FRAME_LEN: usize = 2560;

// ---------------------------------------------------------------------------
// Timing defaults
// ---------------------------------------------------------------------------

/// Timeout for single command transfers.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(1);
/// Timeout for the screenshot read; rendering on the device is slow.
pub const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for the sample dump read.
pub const DATA_TIMEOUT: Duration = Duration::from_secs(2);
/// Timeout for the secondary read that detects a screenshot transfer header.
pub const HEADER_PROBE_TIMEOUT: Duration = Duration::from_millis(100);
/// Pause between a data request and the read.
pub const SETTLE_DELAY: Duration = Duration::from_millis(50);
/// Default ceiling for short-read retries.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Chunk size used when reading large bulk transfers.
pub const BULK_CHUNK_LEN: usize = 8192;
