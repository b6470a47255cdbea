//! Acquisition timing and retry settings.

use std::time::Duration;

use crate::protocol::*;

/// Timeouts and retry policy used by a [`Device`](crate::Device).
///
/// `Default` gives values that work with the known firmware; the CLI lets
/// users stretch the read timeouts for slow units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionConfig {
    /// Timeout for every single-byte command transfer.
    pub command_timeout: Duration,
    /// Timeout for the main screenshot read.
    pub screenshot_timeout: Duration,
    /// Timeout for the sample dump read.
    pub data_timeout: Duration,
    /// Timeout for the secondary read that detects a screenshot header.
    pub header_probe_timeout: Duration,
    /// Pause between a data command and the read.
    pub settle_delay: Duration,
    /// Maximum acquisitions attempted when the device returns a short frame.
    pub max_retries: u32,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            command_timeout: COMMAND_TIMEOUT,
            screenshot_timeout: SCREENSHOT_TIMEOUT,
            data_timeout: DATA_TIMEOUT,
            header_probe_timeout: HEADER_PROBE_TIMEOUT,
            settle_delay: SETTLE_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl AcquisitionConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_screenshot_timeout(mut self, timeout: Duration) -> Self {
        self.screenshot_timeout = timeout;
        self
    }

    pub fn with_data_timeout(mut self, timeout: Duration) -> Self {
        self.data_timeout = timeout;
        self
    }
}
