//! USB transport abstraction and the libusb-backed implementation.
//!
//! [`Transport`] is the seam between the protocol code and the bus: the
//! façade only ever talks to a `Transport`, which keeps the protocol logic
//! testable without hardware. [`UsbTransport`] claims the scope's interface
//! on open and releases it (reattaching any kernel driver) on drop.

use std::time::Duration;

use rusb::{Context, Device, DeviceHandle, UsbContext};

use crate::error::ScopeError;
use crate::model::{DeviceModel, SUPPORTED_DEVICES};
use crate::protocol::*;

/// Blocking USB primitives the scope protocol is built on.
///
/// Every call carries an explicit timeout; expiry surfaces as
/// [`rusb::Error::Timeout`].
pub trait Transport {
    /// Write `data` to a bulk OUT endpoint.
    fn write(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize, rusb::Error>;

    /// Read up to `length` bytes from a bulk IN endpoint.
    ///
    /// A transfer that ends early (short packet) returns what was received.
    fn read(&mut self, endpoint: u8, length: usize, timeout: Duration) -> Result<Vec<u8>, rusb::Error>;

    /// Host-to-device control transfer.
    fn control_out(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error>;

    /// Device-to-host control transfer of up to `length` bytes.
    fn control_in(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        length: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, rusb::Error>;
}

/// Handle to an opened scope on the USB bus.
pub struct UsbTransport {
    handle: DeviceHandle<Context>,
    kernel_driver_was_active: bool,
}

impl UsbTransport {
    /// Scan the bus and open the first supported scope.
    pub fn open() -> Result<(DeviceModel, Self), ScopeError> {
        let context = Context::new()?;
        let (device, model) = Self::find_device(&context)?;
        let transport = Self::from_device(&device)?;
        Ok((model, transport))
    }

    /// Open a specific device, select its configuration and claim the interface.
    pub fn from_device(device: &Device<Context>) -> Result<Self, ScopeError> {
        let handle = device.open()?;

        // Not every platform reports kernel driver state.
        let kernel_driver_was_active = handle.kernel_driver_active(USB_INTERFACE).unwrap_or(false);
        if kernel_driver_was_active {
            handle.detach_kernel_driver(USB_INTERFACE)?;
            log::info!("Temporarily detached kernel driver from interface {}", USB_INTERFACE);
        }

        handle.set_active_configuration(USB_CONFIGURATION)?;
        handle.claim_interface(USB_INTERFACE)?;
        log::info!("Claimed interface {}", USB_INTERFACE);

        Ok(Self { handle, kernel_driver_was_active })
    }

    fn find_device(context: &Context) -> Result<(Device<Context>, DeviceModel), ScopeError> {
        for device in context.devices()?.iter() {
            let desc = match device.device_descriptor() {
                Ok(d) => d,
                Err(_) => continue,
            };

            for &(vid, pid, model) in SUPPORTED_DEVICES {
                if desc.vendor_id() == vid && desc.product_id() == pid {
                    log::info!("Found {} ({:04x}:{:04x})", model, vid, pid);
                    return Ok((device, model));
                }
            }
        }

        Err(ScopeError::DeviceNotFound)
    }
}

impl Transport for UsbTransport {
    fn write(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize, rusb::Error> {
        self.handle.write_bulk(endpoint, data, timeout)
    }

    fn read(&mut self, endpoint: u8, length: usize, timeout: Duration) -> Result<Vec<u8>, rusb::Error> {
        let mut buf = vec![0u8; length];
        let mut filled = 0;

        // Large transfers are read in chunks; a short chunk ends the transfer.
        while filled < length {
            let want = (length - filled).min(BULK_CHUNK_LEN);
            let got = self.handle.read_bulk(endpoint, &mut buf[filled..filled + want], timeout)?;
            filled += got;
            if got < want {
                break;
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }

    fn control_out(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.handle.write_control(request_type, request, value, index, data, timeout)
    }

    fn control_in(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        length: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, rusb::Error> {
        let mut buf = vec![0u8; length];
        let len = self.handle.read_control(request_type, request, value, index, &mut buf, timeout)?;
        buf.truncate(len);
        Ok(buf)
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(USB_INTERFACE) {
            log::warn!("Failed to release interface: {}", e);
        }

        if self.kernel_driver_was_active {
            let _ = self.handle.attach_kernel_driver(USB_INTERFACE);
        }
    }
}
