//! UNI-T UT2000 series oscilloscope library.
//!
//! Retrieves screenshots and captured waveforms from UT2025B, UT2102C and
//! UT2052CEL scopes over USB and decodes the replies into RGB images and
//! per-channel voltage/time series.
//!
//! # Quick Start
//!
//! ```no_run
//! use ut2000_linux::{AcquisitionConfig, Colormap, Device};
//!
//! let mut device = Device::open(AcquisitionConfig::default())?;
//! let mut session = device.attach()?;
//! let image = session.get_screenshot(&Colormap::default())?;
//! let (ch1, ch2) = session.get_samples()?;
//! session.detach()?;
//!
//! println!("{}x{} screenshot", image.width(), image.height());
//! println!("CH1: {} samples at {} V/div", ch1.raw_samples.len(), ch1.volts_per_div);
//! println!("CH2 active: {}", ch2.active);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod bulk;
mod config;
mod control;
mod device;
mod error;
mod frame;
mod model;
pub mod protocol;
mod samples;
mod screenshot;
mod transport;

pub use config::AcquisitionConfig;
pub use device::{Device, DeviceState, RemoteSession};
pub use error::{FrameError, FrameKind, ScopeError};
pub use frame::RawFrame;
pub use model::{
    Coupling, DeviceModel, HeaderLayout, ModeSelect, ModelConfig, ProtocolFamily,
    SampleLayout, SUPPORTED_DEVICES,
};
pub use samples::{
    decode_samples, get_raw_samples, parse_header, sample_to_volts, Channel,
    ChannelHeader, ChannelReading,
};
pub use screenshot::{decode_screenshot, Colormap, Rgb, ScreenshotImage, COLORMAP_LEN};
pub use transport::{Transport, UsbTransport};
