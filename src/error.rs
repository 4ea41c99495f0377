use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by transports, backends and the session engine.
///
/// Device-level failures carry the raw PTP response code; everything else
/// maps a transport or engine condition. Transports never retry on error,
/// and a [`Error::ConnectionClosed`] permanently marks the device
/// disconnected.
#[derive(Debug, Error)]
pub enum Error {
    /// The device answered with a PTP response code other than 0x2001 (OK).
    #[error("device returned response code {0:#06x}")]
    DeviceResponse(u16),
    /// A transport read or write exceeded its configured timeout.
    #[error("transport timed out")]
    Timeout,
    /// The peer closed the channel in the middle of a transaction.
    #[error("connection closed by peer")]
    ConnectionClosed,
    /// A frame was shorter than its declared length, carried an unknown
    /// packet type, or its parameters were truncated.
    #[error("malformed response frame")]
    MalformedResponse,
    /// A bounded read requested more bytes than the buffer holds.
    #[error("short buffer: needed {needed} bytes, {remaining} remaining")]
    ShortBuffer { needed: usize, remaining: usize },
    /// Growing a transfer buffer failed.
    #[error("buffer allocation failed")]
    OutOfMemory,
    /// The value cannot be encoded in the declared data type.
    #[error("value cannot be encoded")]
    InvalidValue,
    /// The operation, property or control is not in the device's supported
    /// sets.
    #[error("operation or property not supported by this device")]
    NotSupported,
    /// Absolute set on a notch property, or a notch step on a regular one.
    #[error("not a notch property")]
    NotANotchProperty,
    /// No backend of the requested type has been initialized.
    #[error("no backend of the requested type is available")]
    BackendUnavailable,
    /// Discovery or HTTP plumbing failed below the PTP layer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Map a stream error to the transport error kinds. Timeouts show up as
    /// `WouldBlock` on sockets with a read timeout and as `TimedOut` on
    /// others; orderly closes as the connection-level kinds.
    pub(crate) fn from_stream(err: io::Error) -> Error {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Error::Timeout,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Error::ConnectionClosed,
            _ => Error::Io(err),
        }
    }
}
