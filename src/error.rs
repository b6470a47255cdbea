//! Error types for the ut2000-linux library.
//!
//! Callers can tell apart a missing device, a USB transport failure, a reply
//! the decoders could not make sense of, and a model we have no table for.

use std::fmt;

use thiserror::Error;

/// What a raw buffer was requested as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Screenshot,
    Samples,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Screenshot => write!(f, "screenshot"),
            Self::Samples => write!(f, "sample"),
        }
    }
}

/// Why a reply could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The buffer length is not one the decoder knows.
    #[error("{kind} frame has {got} bytes, expected {expected}")]
    Length {
        kind: FrameKind,
        expected: String,
        got: usize,
    },

    /// A header byte indexes past the end of its lookup table.
    #[error("{field} index {index} out of range (table has {len} entries)")]
    IndexOutOfRange {
        field: &'static str,
        index: u8,
        len: usize,
    },

    /// A buffer was handed to the decoder for the other frame kind.
    #[error("expected a {expected} frame, got a {got} frame")]
    WrongKind { expected: FrameKind, got: FrameKind },
}

/// Top-level error type for all scope operations.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// No supported oscilloscope was found on the USB bus.
    #[error("UT2000 series oscilloscope not found. Check the USB connection.\n\
             Known IDs: 5656:0832 (UT2025B), 5656:0834 (UT2102C), 4348:5537 (UT2052CEL)")]
    DeviceNotFound,

    /// The identified device has no model configuration.
    #[error("unsupported device {vendor_id:04x}:{product_id:04x}")]
    UnsupportedModel { vendor_id: u16, product_id: u16 },

    /// A USB/libusb transfer failed.
    #[error("USB transfer failed: {0}")]
    Transport(#[from] rusb::Error),

    /// The device replied with something the decoders reject.
    #[error("malformed reply: {0}")]
    MalformedFrame(#[from] FrameError),

    /// The device kept returning incomplete sample frames.
    #[error("sample frame still incomplete after {attempts} attempts (last read {last_len} bytes)")]
    RetryExhausted { attempts: u32, last_len: usize },

    /// A colormap could not be parsed.
    #[error("invalid colormap at line {line}: {reason}")]
    InvalidColormap { line: usize, reason: String },
}
