//! Raw reply buffers as received from the transport.

use crate::error::{FrameError, FrameKind};

/// One complete reply, tagged with the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    kind: FrameKind,
    bytes: Vec<u8>,
}

impl RawFrame {
    pub fn new(kind: FrameKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The payload, provided the frame was requested as `kind`.
    pub(crate) fn payload(&self, kind: FrameKind) -> Result<&[u8], FrameError> {
        if self.kind != kind {
            return Err(FrameError::WrongKind {
                expected: kind,
                got: self.kind,
            });
        }
        Ok(&self.bytes)
    }
}
