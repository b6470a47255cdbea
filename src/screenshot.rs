//! Screenshot capture and decoding.
//!
//! The scope sends its framebuffer as 4-bit palette codes, two pixels per
//! byte. Bytes come in little-endian pairs: for a pair `[A, B]` the pixel
//! order is high(B), low(B), high(A), low(A).

use crate::device::Device;
use crate::error::{FrameError, FrameKind, ScopeError};
use crate::frame::RawFrame;
use crate::protocol::*;
use crate::transport::Transport;

/// Number of palette entries addressable by a 4-bit pixel code.
pub const COLORMAP_LEN: usize = 16;

/// An RGB triple.
pub type Rgb = [u8; 3];

/// Maps 4-bit pixel codes to colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Colormap([Rgb; COLORMAP_LEN]);

impl Colormap {
    pub const fn new(entries: [Rgb; COLORMAP_LEN]) -> Self {
        Self(entries)
    }

    /// Parse a colormap file: one `r,g,b` line per entry, 16 entries.
    ///
    /// Blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self, ScopeError> {
        let mut entries = [[0u8; 3]; COLORMAP_LEN];
        let mut count = 0;

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let lineno = idx + 1;

            if count == COLORMAP_LEN {
                return Err(ScopeError::InvalidColormap {
                    line: lineno,
                    reason: format!("more than {} entries", COLORMAP_LEN),
                });
            }

            let parts: Vec<&str> = line.split(',').map(str::trim).collect();
            if parts.len() != 3 {
                return Err(ScopeError::InvalidColormap {
                    line: lineno,
                    reason: format!("expected r,g,b but found {} fields", parts.len()),
                });
            }

            for (channel, part) in parts.iter().enumerate() {
                entries[count][channel] = part.parse::<u8>().map_err(|e| ScopeError::InvalidColormap {
                    line: lineno,
                    reason: format!("'{}': {}", part, e),
                })?;
            }
            count += 1;
        }

        if count != COLORMAP_LEN {
            return Err(ScopeError::InvalidColormap {
                line: text.lines().count(),
                reason: format!("expected {} entries, found {}", COLORMAP_LEN, count),
            });
        }

        Ok(Self(entries))
    }

    pub fn color(&self, code: u8) -> Rgb {
        self.0[usize::from(code & 0x0f)]
    }

    pub fn entries(&self) -> &[Rgb; COLORMAP_LEN] {
        &self.0
    }
}

impl Default for Colormap {
    /// Dark background with the trace colors the scope uses on screen.
    fn default() -> Self {
        Self([
            [0, 0, 0],
            [0, 0, 128],
            [0, 128, 0],
            [0, 128, 128],
            [128, 0, 0],
            [128, 0, 128],
            [128, 128, 0],
            [192, 192, 192],
            [128, 128, 128],
            [0, 0, 255],
            [0, 255, 0],
            [0, 255, 255],
            [255, 0, 0],
            [255, 0, 255],
            [255, 255, 0],
            [255, 255, 255],
        ])
    }
}

/// A decoded screen capture, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl ScreenshotImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// The color at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Flatten into packed RGB8 bytes, as image encoders expect.
    pub fn into_rgb_bytes(self) -> Vec<u8> {
        self.pixels.into_iter().flatten().collect()
    }
}

/// Decode a nibble-packed screenshot frame.
///
/// The frame must hold exactly `width * height / 2` bytes.
pub fn decode_screenshot(
    frame: &RawFrame,
    resolution: (u32, u32),
    colormap: &Colormap,
) -> Result<ScreenshotImage, ScopeError> {
    let buf = frame.payload(FrameKind::Screenshot)?;
    let (width, height) = resolution;
    let pixel_count = width as usize * height as usize;
    let expected = pixel_count / 2;

    if buf.len() != expected {
        return Err(FrameError::Length {
            kind: FrameKind::Screenshot,
            expected: expected.to_string(),
            got: buf.len(),
        }
        .into());
    }

    let mut pixels = Vec::with_capacity(pixel_count);
    for pair in buf.chunks(2) {
        for &byte in pair.iter().rev() {
            pixels.push(colormap.color(byte >> 4));
            pixels.push(colormap.color(byte & 0x0f));
        }
    }

    Ok(ScreenshotImage { width, height, pixels })
}

impl<T: Transport> Device<T> {
    /// Request a screenshot and return the raw framebuffer bytes.
    ///
    /// Models that prepend a transfer header get a short secondary read for
    /// the remaining bytes; a timeout there means the header was absent.
    pub(crate) fn get_raw_screenshot(&mut self) -> Result<RawFrame, ScopeError> {
        let cfg = self.model.config();

        self.send_command(CMD_GET_SCREENSHOT)?;
        self.settle();
        if let Some(mode) = cfg.screenshot_mode {
            self.mode_select(mode)?;
        }

        let expected = cfg.screenshot_len();
        let mut buf = self
            .transport
            .read(ENDPOINT_BULK_IN, expected, self.config.screenshot_timeout)?;
        log::debug!("screenshot read {} of {} bytes", buf.len(), expected);

        if let Some(header_len) = cfg.screenshot_header_len {
            match self
                .transport
                .read(ENDPOINT_BULK_IN, header_len, self.config.header_probe_timeout)
            {
                Ok(rest) if !rest.is_empty() => {
                    log::debug!("stripping {} byte transfer header", header_len);
                    buf.extend_from_slice(&rest);
                    buf.drain(..header_len.min(buf.len()));
                }
                Ok(_) | Err(rusb::Error::Timeout) => {
                    log::debug!("no transfer header");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(RawFrame::new(FrameKind::Screenshot, buf))
    }

    pub(crate) fn get_screenshot(&mut self, colormap: &Colormap) -> Result<ScreenshotImage, ScopeError> {
        let frame = self.get_raw_screenshot()?;
        decode_screenshot(&frame, self.model.config().screen_resolution, colormap)
    }
}
