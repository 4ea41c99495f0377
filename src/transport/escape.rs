//! Escape-ferried PTP transactions.
//!
//! Some OS imaging services expose no pipes, only a single vendor escape
//! primitive that carries a serialized request structure out and a
//! serialized response structure back. The service owns the PTP session,
//! so the engine must not bracket this transport with OpenSession /
//! CloseSession. The request's next-phase hint is passed through verbatim.

use crate::error::{Error, Result};
use crate::ptp::{NextPhase, Request, Response, MAX_PARAMS};
use crate::transport::{BufferKind, Transport, TransferBuffer};
use crate::wire::{Reader, Writer};

/// op u16, session u32, transaction u32, 5 params, num-params u32,
/// next-phase u32.
pub const REQUEST_PREFIX_LEN: usize = 2 + 4 + 4 + MAX_PARAMS * 4 + 4 + 4;

/// code u16, session u32, transaction u32, num-params u32, 5 params.
pub const RESPONSE_PREFIX_LEN: usize = 2 + 4 + 4 + 4 + MAX_PARAMS * 4;

/// The vendor escape primitive of the underlying imaging service.
pub trait VendorEscape {
    /// Ferry one serialized request and fill `data_out` with the
    /// serialized response; returns the number of bytes written.
    fn escape(&mut self, data_in: &[u8], data_out: &mut [u8]) -> Result<usize>;

    fn clear_stalls(&mut self) -> bool {
        false
    }
}

pub struct EscapeTransport {
    chan: Box<dyn VendorEscape>,
}

impl EscapeTransport {
    pub fn new(chan: Box<dyn VendorEscape>) -> Self {
        Self { chan }
    }
}

impl Transport for EscapeTransport {
    fn prefix_len(&self, kind: BufferKind) -> usize {
        match kind {
            BufferKind::DataIn => REQUEST_PREFIX_LEN,
            BufferKind::DataOut => RESPONSE_PREFIX_LEN,
        }
    }

    fn send_and_recv(
        &mut self,
        request: &Request,
        data_in: &mut TransferBuffer,
        response: &mut Response,
        data_out: &mut TransferBuffer,
    ) -> Result<usize> {
        let mut w = Writer::with_capacity(REQUEST_PREFIX_LEN);
        w.u16_le(request.op_code);
        w.u32_le(request.session_id);
        w.u32_le(request.transaction_id);
        for i in 0..MAX_PARAMS {
            w.u32_le(request.params[i]);
        }
        w.u32_le(request.num_params as u32);
        w.u32_le(match request.next_phase {
            NextPhase::ReadData => 3,
            NextPhase::WriteData => 4,
            NextPhase::NoData => 5,
        });
        data_in.prefix_mut().copy_from_slice(w.as_slice());

        let written = self.chan.escape(data_in.frame(), data_out.frame_mut())?;
        if written < RESPONSE_PREFIX_LEN {
            return Err(Error::MalformedResponse);
        }

        let frame = data_out.frame();
        let mut r = Reader::new(&frame[..RESPONSE_PREFIX_LEN]);
        response.response_code = r.u16_le()?;
        response.session_id = r.u32_le()?;
        response.transaction_id = r.u32_le()?;
        response.num_params = (r.u32_le()? as usize).min(MAX_PARAMS);
        // Response parameters arrive big-endian on this path.
        for i in 0..MAX_PARAMS {
            let param = r.u32_be()?;
            if i < response.num_params {
                response.params[i] = param;
            }
        }
        Ok(written - RESPONSE_PREFIX_LEN)
    }

    fn reset(&mut self) -> bool {
        self.chan.clear_stalls()
    }

    fn requires_session_open_close(&self) -> bool {
        false
    }
}
