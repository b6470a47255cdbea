//! Vendor control-transfer command encoding (UT2025B, UT2102C).
//!
//! Commands travel in wValue of vendor request 0xB1 addressed to an
//! endpoint recipient. Before bulk data flows, the firmware also expects a
//! mode-select request (0xB0) naming the transfer that follows.

use crate::device::Device;
use crate::error::ScopeError;
use crate::model::ModeSelect;
use crate::protocol::*;
use crate::transport::Transport;

impl<T: Transport> Device<T> {
    /// Send one command byte as a vendor control OUT request.
    pub(crate) fn send_control_command(&mut self, code: u8) -> Result<(), ScopeError> {
        self.transport.control_out(
            CTRL_OUT,
            VENDOR_REQ_COMMAND,
            u16::from(code),
            0,
            &[],
            self.config.command_timeout,
        )?;
        Ok(())
    }

    /// Connect handshake: prime, then flush the device's reply buffer.
    ///
    /// The reply content carries no information we use.
    pub(crate) fn control_handshake(&mut self) -> Result<(), ScopeError> {
        self.send_control_command(CMD_PRIME_A)?;
        let reply = self.transport.control_in(
            CTRL_IN,
            VENDOR_REQ_STATUS,
            0,
            0,
            STATUS_REPLY_LEN,
            self.config.command_timeout,
        )?;
        log::debug!("handshake reply: {:02x?}", reply);
        Ok(())
    }

    /// Issue a mode-select request ahead of a bulk read.
    pub(crate) fn mode_select(&mut self, mode: ModeSelect) -> Result<(), ScopeError> {
        log::debug!("mode select value={} index={}", mode.value, mode.index);
        self.transport.control_out(
            CTRL_OUT,
            VENDOR_REQ_MODE_SELECT,
            mode.value,
            mode.index,
            &[],
            self.config.command_timeout,
        )?;
        Ok(())
    }
}
