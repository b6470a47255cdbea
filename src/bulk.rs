//! Bulk-write command encoding (UT2052CEL).
//!
//! The CH375 bridge in this model has no vendor requests; each command is a
//! one-byte bulk OUT transfer.

use crate::device::Device;
use crate::error::ScopeError;
use crate::protocol::*;
use crate::transport::Transport;

impl<T: Transport> Device<T> {
    /// Send one command byte on the bulk OUT endpoint.
    pub(crate) fn send_bulk_command(&mut self, code: u8) -> Result<(), ScopeError> {
        let written = self
            .transport
            .write(ENDPOINT_BULK_OUT, &[code], self.config.command_timeout)?;
        if written != 1 {
            return Err(ScopeError::Transport(rusb::Error::Io));
        }
        Ok(())
    }
}
