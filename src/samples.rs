//! Sample frame acquisition and decoding.
//!
//! A sample frame starts with two 32-byte channel headers (scale codes,
//! coupling, flags, positions) followed by the raw 8-bit samples of both
//! channels. Where the samples sit depends on the model's
//! [`SampleLayout`]. Scale codes index the model's lookup tables; a code
//! past the end of its table is a decode error.

use std::ops::Range;

use serde::Serialize;

use crate::device::Device;
use crate::error::{FrameError, FrameKind, ScopeError};
use crate::frame::RawFrame;
use crate::model::{Coupling, DeviceModel, ModelConfig, SampleLayout};
use crate::protocol::*;
use crate::transport::Transport;

/// Vertical position byte that corresponds to a centred trace.
const VERTICAL_CENTER: i32 = 0x7E;

/// One of the scope's two input channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Channel {
    #[serde(rename = "CH1")]
    Ch1,
    #[serde(rename = "CH2")]
    Ch2,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Ch1, Channel::Ch2];

    /// Zero-based index, as used for header offsets and the enable bitmask.
    pub fn index(self) -> usize {
        match self {
            Self::Ch1 => 0,
            Self::Ch2 => 1,
        }
    }
}

/// Settings decoded from a channel header, before samples are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelHeader {
    pub channel: Channel,
    /// Volts per division at the probe tip (probe attenuation applied).
    pub volts_per_div: f64,
    pub volts_per_div_index: u8,
    pub probe_attenuation: f64,
    pub probe_index: u8,
    pub coupling: Coupling,
    pub coupling_index: u8,
    pub seconds_per_div: f64,
    pub seconds_per_div_index: u8,
    pub active: bool,
    pub vertical_offset: i32,
    pub bandwidth_limited: bool,
    pub inverted: bool,
    pub horizontal_cursor_offset: u8,
    pub horizontal_position: u16,
}

/// A fully decoded channel: settings, raw samples and physical units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelReading {
    pub channel: Channel,
    pub volts_per_div: f64,
    pub volts_per_div_index: u8,
    pub probe_attenuation: f64,
    pub probe_index: u8,
    pub coupling: Coupling,
    pub coupling_index: u8,
    pub seconds_per_div: f64,
    pub seconds_per_div_index: u8,
    pub active: bool,
    pub vertical_offset: i32,
    pub bandwidth_limited: bool,
    pub inverted: bool,
    pub horizontal_cursor_offset: u8,
    pub horizontal_position: u16,
    pub raw_samples: Vec<u8>,
    pub sample_voltages: Vec<f64>,
    pub sample_period: f64,
    pub sample_time_offset: f64,
}

impl ChannelReading {
    /// Attach samples to a decoded header and derive volts and seconds.
    pub fn new(header: ChannelHeader, raw_samples: Vec<u8>, zero_reference: u8) -> Self {
        let sample_voltages = raw_samples
            .iter()
            .map(|&raw| sample_to_volts(raw, zero_reference, header.volts_per_div))
            .collect();

        Self {
            channel: header.channel,
            volts_per_div: header.volts_per_div,
            volts_per_div_index: header.volts_per_div_index,
            probe_attenuation: header.probe_attenuation,
            probe_index: header.probe_index,
            coupling: header.coupling,
            coupling_index: header.coupling_index,
            seconds_per_div: header.seconds_per_div,
            seconds_per_div_index: header.seconds_per_div_index,
            active: header.active,
            vertical_offset: header.vertical_offset,
            bandwidth_limited: header.bandwidth_limited,
            inverted: header.inverted,
            horizontal_cursor_offset: header.horizontal_cursor_offset,
            horizontal_position: header.horizontal_position,
            raw_samples,
            sample_voltages,
            sample_period: header.seconds_per_div * 10.0,
            sample_time_offset: f64::from(header.horizontal_cursor_offset) / 255.0 * header.seconds_per_div,
        }
    }
}

/// Convert a raw sample byte to volts: the screen is 10 divisions tall and
/// spans 256 codes.
pub fn sample_to_volts(raw: u8, zero_reference: u8, volts_per_div: f64) -> f64 {
    (f64::from(raw) - f64::from(zero_reference)) / 256.0 * volts_per_div * 10.0
}

fn lookup<V: Copy>(table: &[V], index: u8, field: &'static str) -> Result<V, FrameError> {
    table
        .get(usize::from(index))
        .copied()
        .ok_or(FrameError::IndexOutOfRange {
            field,
            index,
            len: table.len(),
        })
}

/// Decode one channel's header from the header block at the start of a frame.
///
/// The channel's fields are read from its own 32-byte header; the channel
/// enable bitmask always comes from the first header.
pub fn parse_header(model: &ModelConfig, headers: &[u8], channel: Channel) -> Result<ChannelHeader, ScopeError> {
    let needed = (channel.index() + 1) * CHANNEL_HEADER_LEN;
    if headers.len() < needed {
        return Err(FrameError::Length {
            kind: FrameKind::Samples,
            expected: format!("at least {}", needed),
            got: headers.len(),
        }
        .into());
    }

    let layout = &model.header;
    let h = &headers[channel.index() * CHANNEL_HEADER_LEN..needed];

    let volts_per_div_index = h[layout.vertical_sense];
    let probe_index = h[layout.probe_exponent];
    let coupling_index = h[layout.coupling];
    let seconds_per_div_index = h[layout.horizontal_scale];

    let volts = lookup(model.y_range_table, volts_per_div_index, "vertical sense")?;
    let probe_attenuation = lookup(model.probe_table, probe_index, "probe attenuation")?;
    let coupling = lookup(model.coupling_table, coupling_index, "coupling")?;
    let seconds_per_div = lookup(model.x_range_table, seconds_per_div_index, "horizontal scale")?;

    let enable_mask = headers[layout.channel_enable];

    Ok(ChannelHeader {
        channel,
        volts_per_div: volts * probe_attenuation,
        volts_per_div_index,
        probe_attenuation,
        probe_index,
        coupling,
        coupling_index,
        seconds_per_div,
        seconds_per_div_index,
        active: enable_mask & (1 << channel.index()) != 0,
        vertical_offset: VERTICAL_CENTER - i32::from(h[layout.vertical_position]),
        bandwidth_limited: h[layout.bandwidth_limit] != 0,
        inverted: h[layout.inverted] != 0,
        horizontal_cursor_offset: h[layout.horizontal_cursor],
        horizontal_position: u16::from(h[layout.horizontal_position_high]) << 8
            | u16::from(h[layout.horizontal_position_low]),
    })
}

/// Locate one channel's raw samples inside a full sample frame.
pub fn get_raw_samples<'a>(model: &ModelConfig, frame: &'a [u8], channel: Channel) -> Result<&'a [u8], ScopeError> {
    let range = sample_window(&model.sample_layout, frame.len(), channel)?;
    Ok(&frame[range])
}

fn sample_window(layout: &SampleLayout, len: usize, channel: Channel) -> Result<Range<usize>, FrameError> {
    match layout {
        SampleLayout::Windowed {
            short_len,
            short,
            long_len,
            long,
        } => {
            if len == *short_len {
                Ok(short[channel.index()].clone())
            } else if len == *long_len {
                Ok(long[channel.index()].clone())
            } else {
                Err(FrameError::Length {
                    kind: FrameKind::Samples,
                    expected: format!("{} or {}", short_len, long_len),
                    got: len,
                })
            }
        }
        SampleLayout::Contiguous {
            frame_len,
            trailing_filler,
        } => {
            if len != *frame_len {
                return Err(FrameError::Length {
                    kind: FrameKind::Samples,
                    expected: frame_len.to_string(),
                    got: len,
                });
            }
            let per_channel = (frame_len - HEADER_BLOCK_LEN - trailing_filler) / 2;
            let start = HEADER_BLOCK_LEN + channel.index() * per_channel;
            Ok(start..start + per_channel)
        }
    }
}

/// Decode a complete sample frame into both channels.
pub fn decode_samples(model: DeviceModel, frame: &RawFrame) -> Result<(ChannelReading, ChannelReading), ScopeError> {
    let cfg = model.config();
    let frame = frame.payload(FrameKind::Samples)?;
    let decode = |channel| -> Result<ChannelReading, ScopeError> {
        let header = parse_header(cfg, frame, channel)?;
        let raw = get_raw_samples(cfg, frame, channel)?;
        Ok(ChannelReading::new(header, raw.to_vec(), cfg.sample_zero_reference))
    };

    Ok((decode(Channel::Ch1)?, decode(Channel::Ch2)?))
}

impl<T: Transport> Device<T> {
    /// Request a sample dump and return the raw frame.
    ///
    /// For models with a fixed frame size, a read of any other length is
    /// treated as incomplete and the whole request is repeated, up to the
    /// configured retry ceiling.
    pub(crate) fn get_data_raw(&mut self) -> Result<RawFrame, ScopeError> {
        let cfg = self.model.config();
        let (attempts, expected_len) = match cfg.sample_layout {
            SampleLayout::Contiguous { frame_len, .. } => (self.config.max_retries.max(1), Some(frame_len)),
            SampleLayout::Windowed { .. } => (1, None),
        };

        let mut last_len = 0;
        for attempt in 1..=attempts {
            for &code in cfg.sample_priming {
                self.send_command(code)?;
            }
            self.send_command(CMD_GET_SAMPLES)?;
            self.settle();
            if let Some(mode) = cfg.sample_mode {
                self.mode_select(mode)?;
            }

            let buf = self
                .transport
                .read(ENDPOINT_BULK_IN, MAX_SAMPLE_FRAME_LEN, self.config.data_timeout)?;
            log::debug!("sample read {} bytes (attempt {})", buf.len(), attempt);

            match expected_len {
                Some(expected) if buf.len() != expected => {
                    log::warn!(
                        "incomplete sample frame: {} of {} bytes, retrying ({}/{})",
                        buf.len(),
                        expected,
                        attempt,
                        attempts
                    );
                    last_len = buf.len();
                }
                _ => return Ok(RawFrame::new(FrameKind::Samples, buf)),
            }
        }

        Err(ScopeError::RetryExhausted { attempts, last_len })
    }

    pub(crate) fn get_samples(&mut self) -> Result<(ChannelReading, ChannelReading), ScopeError> {
        let frame = self.get_data_raw()?;
        decode_samples(self.model, &frame)
    }
}
