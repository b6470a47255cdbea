//! Supported oscilloscope models and their fixed configuration.
//!
//! Every per-model difference (command transport, screen size, scale tables,
//! header offsets, sample window layout) is an immutable [`ModelConfig`]
//! value selected once from the [`DeviceModel`] variant.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::error::ScopeError;
use crate::protocol::*;

/// A supported oscilloscope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceModel {
    Ut2025B,
    Ut2102C,
    Ut2052Cel,
}

/// How command bytes reach the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolFamily {
    /// Command byte in wValue of a vendor control request (0xB1).
    Control,
    /// Command byte written to the bulk OUT endpoint.
    Bulk,
}

/// Input coupling as reported in a channel header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Coupling {
    #[serde(rename = "DC")]
    Dc,
    #[serde(rename = "AC")]
    Ac,
    #[serde(rename = "GND")]
    Gnd,
}

impl fmt::Display for Coupling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dc => write!(f, "DC"),
            Self::Ac => write!(f, "AC"),
            Self::Gnd => write!(f, "GND"),
        }
    }
}

/// Byte offsets inside a 32-byte channel header.
///
/// `channel_enable` is read from the first header only; every other field
/// is relative to the start of the channel's own header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    pub channel_enable: usize,
    pub vertical_sense: usize,
    pub vertical_position: usize,
    pub horizontal_position_low: usize,
    pub horizontal_position_high: usize,
    pub inverted: usize,
    pub horizontal_scale: usize,
    pub horizontal_cursor: usize,
    pub coupling: usize,
    pub bandwidth_limit: usize,
    pub probe_exponent: usize,
}

/// Where each channel's samples sit inside a sample frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleLayout {
    /// Fixed byte ranges chosen by total frame length.
    Windowed {
        short_len: usize,
        short: [Range<usize>; 2],
        long_len: usize,
        long: [Range<usize>; 2],
    },
    /// Both channels back to back after the two headers, followed by filler.
    Contiguous {
        frame_len: usize,
        trailing_filler: usize,
    },
}

/// Vendor mode-select control transfer issued after a data command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSelect {
    pub value: u16,
    pub index: u16,
}

/// Immutable per-model configuration.
#[derive(Debug)]
pub struct ModelConfig {
    pub name: &'static str,
    pub family: ProtocolFamily,
    pub screen_resolution: (u32, u32),
    pub y_range_table: &'static [f64],
    pub x_range_table: &'static [f64],
    pub coupling_table: &'static [Coupling],
    pub probe_table: &'static [f64],
    pub sample_zero_reference: u8,
    pub header: HeaderLayout,
    pub screenshot_header_len: Option<usize>,
    pub sample_layout: SampleLayout,
    pub connect_handshake: bool,
    pub attach_priming: &'static [u8],
    pub sample_priming: &'static [u8],
    pub screenshot_mode: Option<ModeSelect>,
    pub sample_mode: Option<ModeSelect>,
}

impl ModelConfig {
    /// Number of bytes a screenshot occupies on the wire (two pixels per byte).
    pub fn screenshot_len(&self) -> usize {
        let (w, h) = self.screen_resolution;
        (w as usize * h as usize) / 2
    }
}

/// `(vendor_id, product_id, model)` for every supported device.
pub const SUPPORTED_DEVICES: &[(u16, u16, DeviceModel)] = &[
    (VENDOR_ID_UNIT, PID_UT2025B, DeviceModel::Ut2025B),
    (VENDOR_ID_UNIT, PID_UT2102C, DeviceModel::Ut2102C),
    (VENDOR_ID_WCH, PID_UT2052CEL, DeviceModel::Ut2052Cel),
];

/// Volts/div, indexed by the vertical sense code.
const Y_RANGE: [f64; 11] = [
    2e-3, 5e-3, 10e-3, 20e-3, 50e-3, 100e-3, 200e-3, 500e-3, 1.0, 2.0, 5.0,
];

/// Seconds/div, indexed by the horizontal scale code.
const X_RANGE: [f64; 33] = [
    0.0, 2.5e-9, 5e-9, 10e-9, 20e-9, 50e-9, 100e-9, 200e-9, 500e-9,
    1e-6, 2e-6, 5e-6, 10e-6, 20e-6, 50e-6, 100e-6, 200e-6, 500e-6,
    1e-3, 2e-3, 5e-3, 10e-3, 20e-3, 50e-3, 100e-3, 200e-3, 500e-3,
    1.0, 2.0, 5.0, 10.0, 20.0, 50.0,
];

const COUPLING: [Coupling; 3] = [Coupling::Dc, Coupling::Ac, Coupling::Gnd];

/// Probe attenuation, indexed by the probe exponent (10^n).
const PROBE: [f64; 4] = [1.0, 10.0, 100.0, 1000.0];

const UT2000_HEADER: HeaderLayout = HeaderLayout {
    channel_enable: 2,
    vertical_sense: 5,
    vertical_position: 6,
    horizontal_position_low: 7,
    horizontal_position_high: 8,
    inverted: 9,
    horizontal_scale: 10,
    horizontal_cursor: 11,
    coupling: 12,
    bandwidth_limit: 15,
    probe_exponent: 19,
};

/// Expand `codes` so each one is repeated [`PRIME_REPEAT`] times.
const fn priming<const N: usize>(codes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let mut i = 0;
    while i < N {
        out[i] = codes[i / PRIME_REPEAT];
        i += 1;
    }
    out
}

const CONTROL_ATTACH_PRIMING: [u8; 2 * PRIME_REPEAT] = priming(&[CMD_PRIME_A, CMD_PRIME_C]);
const CONTROL_SAMPLE_PRIMING: [u8; 2 * PRIME_REPEAT] = priming(&[CMD_PRIME_B, CMD_PRIME_C]);

static UT2000_CONTROL: ModelConfig = ModelConfig {
    name: "UT2000 (control transfer)",
    family: ProtocolFamily::Control,
    screen_resolution: (320, 240),
    y_range_table: &Y_RANGE,
    x_range_table: &X_RANGE,
    coupling_table: &COUPLING,
    probe_table: &PROBE,
    sample_zero_reference: 128,
    header: UT2000_HEADER,
    screenshot_header_len: Some(512),
    sample_layout: SampleLayout::Windowed {
        short_len: 1024,
        short: [516..766, 770..1020],
        long_len: 2560,
        long: [516..1266, 1520..2270],
    },
    connect_handshake: true,
    attach_priming: &CONTROL_ATTACH_PRIMING,
    sample_priming: &CONTROL_SAMPLE_PRIMING,
    screenshot_mode: Some(ModeSelect { value: 0, index: 38 }),
    sample_mode: Some(ModeSelect { value: 1, index: 2 }),
};

static UT2052CEL: ModelConfig = ModelConfig {
    name: "UT2052CEL",
    family: ProtocolFamily::Bulk,
    screen_resolution: (400, 240),
    y_range_table: &Y_RANGE,
    x_range_table: &X_RANGE,
    coupling_table: &COUPLING,
    probe_table: &PROBE,
    sample_zero_reference: 130,
    header: UT2000_HEADER,
    screenshot_header_len: Some(64),
    sample_layout: SampleLayout::Contiguous {
        frame_len: 704,
        trailing_filler: 40,
    },
    connect_handshake: false,
    attach_priming: &[],
    sample_priming: &[],
    screenshot_mode: None,
    sample_mode: None,
};

impl DeviceModel {
    /// Look up the model for a USB vendor/product ID pair.
    pub fn from_usb_id(vendor_id: u16, product_id: u16) -> Result<Self, ScopeError> {
        SUPPORTED_DEVICES
            .iter()
            .find(|&&(vid, pid, _)| vid == vendor_id && pid == product_id)
            .map(|&(_, _, model)| model)
            .ok_or(ScopeError::UnsupportedModel { vendor_id, product_id })
    }

    /// The fixed configuration for this model.
    pub fn config(&self) -> &'static ModelConfig {
        match self {
            Self::Ut2025B | Self::Ut2102C => &UT2000_CONTROL,
            Self::Ut2052Cel => &UT2052CEL,
        }
    }

    pub fn family(&self) -> ProtocolFamily {
        self.config().family
    }

    /// Parse a model name as typed on the command line.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ut2025b" | "ut2025" => Some(Self::Ut2025B),
            "ut2102c" | "ut2102" => Some(Self::Ut2102C),
            "ut2052cel" | "ut2052" => Some(Self::Ut2052Cel),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ut2025B => write!(f, "UT2025B"),
            Self::Ut2102C => write!(f, "UT2102C"),
            Self::Ut2052Cel => write!(f, "UT2052CEL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids_resolve() {
        assert_eq!(DeviceModel::from_usb_id(0x5656, 0x0832).unwrap(), DeviceModel::Ut2025B);
        assert_eq!(DeviceModel::from_usb_id(0x5656, 0x0834).unwrap(), DeviceModel::Ut2102C);
        assert_eq!(DeviceModel::from_usb_id(0x4348, 0x5537).unwrap(), DeviceModel::Ut2052Cel);
    }

    #[test]
    fn unknown_id_is_unsupported() {
        let err = DeviceModel::from_usb_id(0x5656, 0x9999).unwrap_err();
        assert!(matches!(
            err,
            ScopeError::UnsupportedModel { vendor_id: 0x5656, product_id: 0x9999 }
        ));
    }

    #[test]
    fn scale_tables_cover_code_ranges() {
        for &(_, _, model) in SUPPORTED_DEVICES {
            let cfg = model.config();
            assert_eq!(cfg.y_range_table.len(), 11, "{model}: codes 0-10");
            assert_eq!(cfg.x_range_table.len(), 33, "{model}: codes 0-32");
            assert_eq!(cfg.coupling_table, &[Coupling::Dc, Coupling::Ac, Coupling::Gnd]);
        }
    }

    #[test]
    fn control_priming_sequences() {
        let cfg = DeviceModel::Ut2025B.config();
        assert_eq!(cfg.attach_priming.len(), 20);
        assert!(cfg.attach_priming[..10].iter().all(|&c| c == CMD_PRIME_A));
        assert!(cfg.attach_priming[10..].iter().all(|&c| c == CMD_PRIME_C));
        assert!(cfg.sample_priming[..10].iter().all(|&c| c == CMD_PRIME_B));
        assert!(cfg.sample_priming[10..].iter().all(|&c| c == CMD_PRIME_C));
    }

    #[test]
    fn screenshot_lengths() {
        assert_eq!(DeviceModel::Ut2102C.config().screenshot_len(), 38400);
        assert_eq!(DeviceModel::Ut2052Cel.config().screenshot_len(), 48000);
    }

    #[test]
    fn zero_references() {
        assert_eq!(DeviceModel::Ut2025B.config().sample_zero_reference, 128);
        assert_eq!(DeviceModel::Ut2052Cel.config().sample_zero_reference, 130);
    }

    #[test]
    fn model_names_parse() {
        assert_eq!(DeviceModel::from_name("UT2052CEL"), Some(DeviceModel::Ut2052Cel));
        assert_eq!(DeviceModel::from_name("ut2025b"), Some(DeviceModel::Ut2025B));
        assert_eq!(DeviceModel::from_name("ut9999"), None);
        assert_eq!(DeviceModel::Ut2102C.to_string(), "UT2102C");
    }
}
