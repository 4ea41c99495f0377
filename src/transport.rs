//! The transport abstraction: one implementation per physical framing,
//! each turning a logical PTP transaction into the bytes its channel
//! requires.

pub mod escape;
pub mod ip;
pub mod usb;

use crate::error::{Error, Result};
use crate::ptp::{PtpEvent, Request, Response};

/// Distinguishes the framing prefix reserved ahead of caller payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Caller-to-device payload; the prefix carries the data-phase header.
    DataIn,
    /// Device-to-caller payload; the prefix receives the leading frame
    /// header on transports that read header and payload in one transfer.
    DataOut,
}

/// An owned transfer buffer whose payload sits after a fixed,
/// transport-reserved framing prefix.
///
/// The transport owns the prefix bytes and serializes its frame header
/// there, so a data phase goes out as one contiguous write without copying
/// the caller's payload. The payload region never aliases the prefix.
pub struct TransferBuffer {
    prefix: usize,
    mem: Vec<u8>,
}

impl TransferBuffer {
    pub fn new(prefix: usize) -> Self {
        Self {
            prefix,
            mem: vec![0; prefix],
        }
    }

    pub fn with_payload_capacity(prefix: usize, payload: usize) -> Result<Self> {
        let mut buf = Self::new(prefix);
        buf.resize_payload(payload)?;
        Ok(buf)
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix
    }

    pub fn payload_len(&self) -> usize {
        self.mem.len() - self.prefix
    }

    /// Grow or shrink the payload region. Capacity only ever grows; the
    /// new payload bytes are zeroed.
    pub fn resize_payload(&mut self, payload: usize) -> Result<()> {
        let total = self.prefix + payload;
        if total > self.mem.capacity() {
            self.mem
                .try_reserve(total - self.mem.len())
                .map_err(|_| Error::OutOfMemory)?;
        }
        self.mem.resize(total, 0);
        self.mem[self.prefix..].fill(0);
        Ok(())
    }

    pub fn payload(&self) -> &[u8] {
        &self.mem[self.prefix..]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.mem[self.prefix..]
    }

    pub fn prefix_mut(&mut self) -> &mut [u8] {
        &mut self.mem[..self.prefix]
    }

    /// Prefix and payload as one contiguous frame.
    pub fn frame(&self) -> &[u8] {
        &self.mem
    }

    pub fn frame_mut(&mut self) -> &mut [u8] {
        &mut self.mem
    }
}

/// A channel to one device, able to run one PTP transaction at a time.
///
/// `send_and_recv` performs, in order: the command frame, the optional
/// data-in phase from `data_in`, the optional data-out phase into
/// `data_out` (overflow is truncated but the true byte count is returned),
/// and the response frame into `response`. The device's response code is
/// reported in `response`, not as an `Err`; errors are transport-level
/// conditions only.
pub trait Transport {
    /// Fixed framing-prefix size for buffers of the given kind.
    fn prefix_len(&self, kind: BufferKind) -> usize;

    /// Allocate a transfer buffer with this transport's prefix reserved.
    fn alloc_buffer(&self, kind: BufferKind, payload: usize) -> Result<TransferBuffer> {
        TransferBuffer::with_payload_capacity(self.prefix_len(kind), payload)
    }

    fn send_and_recv(
        &mut self,
        request: &Request,
        data_in: &mut TransferBuffer,
        response: &mut Response,
        data_out: &mut TransferBuffer,
    ) -> Result<usize>;

    /// Best-effort recovery from stalled endpoints. Returns false when the
    /// transport has no reset mechanism.
    fn reset(&mut self) -> bool {
        false
    }

    /// Drain one pending device event, if the channel carries events.
    /// `Ok(None)` when nothing arrived within the channel's timeout.
    fn read_event(&mut self) -> Result<Option<PtpEvent>> {
        Ok(None)
    }

    /// Whether the engine must bracket this channel with OpenSession /
    /// CloseSession. False when an OS service owns the PTP session.
    fn requires_session_open_close(&self) -> bool;
}
