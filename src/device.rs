//! Device façade: construction, remote-mode bracketing and lifecycle.
//!
//! A [`Device`] is `Connected` once constructed (the model's connect
//! handshake has run). [`Device::attach`] puts the scope into remote mode
//! and returns a [`RemoteSession`]; acquisitions happen on the session, and
//! the scope leaves remote mode when the session is detached or dropped,
//! whichever comes first. The transport is owned exclusively by the device
//! and released when the device is dropped.

use crate::config::AcquisitionConfig;
use crate::error::ScopeError;
use crate::frame::RawFrame;
use crate::model::{DeviceModel, ProtocolFamily};
use crate::protocol::*;
use crate::samples::ChannelReading;
use crate::screenshot::{Colormap, ScreenshotImage};
use crate::transport::{Transport, UsbTransport};

/// Where the scope is in the remote-mode state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Handshake done, front panel in control.
    Connected,
    /// Remote mode entered; the scope accepts data requests.
    Remote,
}

/// Handle to a connected UT2000 series oscilloscope.
pub struct Device<T: Transport = UsbTransport> {
    pub(crate) transport: T,
    pub(crate) model: DeviceModel,
    pub(crate) config: AcquisitionConfig,
    state: DeviceState,
}

impl Device<UsbTransport> {
    /// Scan the USB bus, open the first supported scope and run its handshake.
    pub fn open(config: AcquisitionConfig) -> Result<Self, ScopeError> {
        let (model, transport) = UsbTransport::open()?;
        log::info!("Device: {} ({})", model, model.config().name);
        Self::for_model(model, transport, config)
    }
}

impl<T: Transport> Device<T> {
    /// Wrap an already opened transport for a known model.
    ///
    /// Runs the model's connect handshake, which must succeed before any
    /// other request is accepted by the firmware.
    pub fn for_model(model: DeviceModel, transport: T, config: AcquisitionConfig) -> Result<Self, ScopeError> {
        let mut device = Self {
            transport,
            model,
            config,
            state: DeviceState::Connected,
        };
        device.connect()?;
        Ok(device)
    }

    /// The model this device was constructed for.
    pub fn model(&self) -> DeviceModel {
        self.model
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a single command byte using the model's transport mechanism.
    pub fn send_command(&mut self, code: u8) -> Result<(), ScopeError> {
        log::debug!("command 0x{:02x}", code);
        match self.model.family() {
            ProtocolFamily::Control => self.send_control_command(code),
            ProtocolFamily::Bulk => self.send_bulk_command(code),
        }
    }

    /// Enter remote mode.
    ///
    /// Sends 0xF0 followed by the model's priming codes. If priming fails
    /// the scope is taken back out of remote mode before the error returns.
    pub fn attach(&mut self) -> Result<RemoteSession<'_, T>, ScopeError> {
        let priming = self.model.config().attach_priming;

        self.send_command(CMD_ENTER_REMOTE)?;
        self.state = DeviceState::Remote;
        log::info!("Entered remote mode");

        let session = RemoteSession { device: self, attached: true };
        for &code in priming {
            session.device.send_command(code)?;
        }
        Ok(session)
    }

    fn connect(&mut self) -> Result<(), ScopeError> {
        if self.model.config().connect_handshake {
            self.control_handshake()?;
        }
        Ok(())
    }

    fn leave_remote(&mut self) -> Result<(), ScopeError> {
        self.send_command(CMD_LEAVE_REMOTE)?;
        self.state = DeviceState::Connected;
        log::info!("Left remote mode");
        Ok(())
    }

    /// Pause so the scope can prepare the requested data.
    pub(crate) fn settle(&self) {
        if !self.config.settle_delay.is_zero() {
            std::thread::sleep(self.config.settle_delay);
        }
    }
}

/// A scope in remote mode.
///
/// Dropping the session sends the leave-remote command, so an error
/// propagated with `?` between attach and detach still hands the front
/// panel back. Call [`detach`](Self::detach) to observe the result of that
/// command instead.
pub struct RemoteSession<'a, T: Transport> {
    device: &'a mut Device<T>,
    attached: bool,
}

impl<T: Transport> RemoteSession<'_, T> {
    pub fn model(&self) -> DeviceModel {
        self.device.model
    }

    /// Capture and decode the current screen.
    pub fn get_screenshot(&mut self, colormap: &Colormap) -> Result<ScreenshotImage, ScopeError> {
        self.device.get_screenshot(colormap)
    }

    /// Capture the screen without decoding it.
    pub fn get_raw_screenshot(&mut self) -> Result<RawFrame, ScopeError> {
        self.device.get_raw_screenshot()
    }

    /// Acquire and decode both channels.
    pub fn get_samples(&mut self) -> Result<(ChannelReading, ChannelReading), ScopeError> {
        self.device.get_samples()
    }

    /// Acquire a sample frame without decoding it.
    pub fn get_data_raw(&mut self) -> Result<RawFrame, ScopeError> {
        self.device.get_data_raw()
    }

    /// Leave remote mode.
    pub fn detach(mut self) -> Result<(), ScopeError> {
        self.attached = false;
        self.device.leave_remote()
    }
}

impl<T: Transport> Drop for RemoteSession<'_, T> {
    fn drop(&mut self) {
        if self.attached {
            if let Err(e) = self.device.leave_remote() {
                log::warn!("Failed to leave remote mode: {}", e);
            }
        }
    }
}
