//! Scripted [`Transport`] for driving the façade without hardware.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use ut2000_linux::protocol::*;
use ut2000_linux::{AcquisitionConfig, Transport};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Write { endpoint: u8, data: Vec<u8> },
    Read { endpoint: u8, length: usize, timeout: Duration },
    ControlOut { request_type: u8, request: u8, value: u16, index: u16 },
    ControlIn { request_type: u8, request: u8, length: usize },
}

/// Records every call and answers bulk reads from a queue.
///
/// Once the queue is empty, reads time out.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub calls: Vec<Call>,
    reads: VecDeque<Result<Vec<u8>, rusb::Error>>,
    control_outs: usize,
    fail_control_out: Option<usize>,
}

impl MockTransport {
    pub fn with_reads(reads: impl IntoIterator<Item = Result<Vec<u8>, rusb::Error>>) -> Self {
        Self {
            reads: reads.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Fail the `n`th control OUT transfer (1-based) with a pipe error.
    pub fn failing_control_out(mut self, n: usize) -> Self {
        self.fail_control_out = Some(n);
        self
    }

    /// Command bytes in the order they were sent, whichever family encoded them.
    pub fn commands(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::ControlOut { request: VENDOR_REQ_COMMAND, value, .. } => Some(*value as u8),
                Call::Write { endpoint: ENDPOINT_BULK_OUT, data } => data.first().copied(),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, code: u8) -> usize {
        self.commands().iter().filter(|&&c| c == code).count()
    }

    pub fn reads(&self) -> Vec<&Call> {
        self.calls.iter().filter(|c| matches!(c, Call::Read { .. })).collect()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, endpoint: u8, data: &[u8], _timeout: Duration) -> Result<usize, rusb::Error> {
        self.calls.push(Call::Write { endpoint, data: data.to_vec() });
        Ok(data.len())
    }

    fn read(&mut self, endpoint: u8, length: usize, timeout: Duration) -> Result<Vec<u8>, rusb::Error> {
        self.calls.push(Call::Read { endpoint, length, timeout });
        match self.reads.pop_front() {
            Some(Ok(mut data)) => {
                data.truncate(length);
                Ok(data)
            }
            Some(Err(e)) => Err(e),
            None => Err(rusb::Error::Timeout),
        }
    }

    fn control_out(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        _data: &[u8],
        _timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.calls.push(Call::ControlOut { request_type, request, value, index });
        self.control_outs += 1;
        if self.fail_control_out == Some(self.control_outs) {
            return Err(rusb::Error::Pipe);
        }
        Ok(0)
    }

    fn control_in(
        &mut self,
        request_type: u8,
        request: u8,
        _value: u16,
        _index: u16,
        length: usize,
        _timeout: Duration,
    ) -> Result<Vec<u8>, rusb::Error> {
        self.calls.push(Call::ControlIn { request_type, request, length });
        Ok(vec![0; length])
    }
}

/// Default config without the settle pause.
pub fn fast_config() -> AcquisitionConfig {
    AcquisitionConfig {
        settle_delay: Duration::ZERO,
        ..AcquisitionConfig::default()
    }
}

/// A sample frame with valid scale codes in both headers and both channels on.
pub fn sample_frame(len: usize) -> Vec<u8> {
    let mut data = vec![128u8; len];
    for base in [0, CHANNEL_HEADER_LEN] {
        data[base..base + CHANNEL_HEADER_LEN].fill(0);
        data[base + 5] = 8; // 1 V/div
        data[base + 10] = 18; // 1 ms/div
    }
    data[2] = 0b11;
    data
}
