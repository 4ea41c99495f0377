//! Container-framed PTP transactions over a USB still-image interface.
//!
//! Every transfer on the bulk pipes is a container: a 12-byte header
//! followed by parameters (command/response) or opaque bytes (data). The
//! device may split a data container across short packets, so reads loop
//! until the declared length has arrived; a trailing response container
//! follows every data phase.

use packed_struct::prelude::*;

use crate::error::{Error, Result};
use crate::ptp::{
    ContainerHeader, PtpEvent, Request, Response, CONTAINER_COMMAND, CONTAINER_DATA,
    CONTAINER_EVENT, CONTAINER_HEADER_LEN, CONTAINER_RESPONSE, MAX_PARAMS,
};
use crate::transport::{BufferKind, Transport, TransferBuffer};
use crate::wire::{Reader, Writer};

/// The bulk and interrupt pipes of one opened still-image interface.
/// Implementations wrap a native USB stack and apply their configured
/// per-call timeout, reporting it as [`Error::Timeout`].
pub trait UsbPipes {
    fn bulk_out(&mut self, data: &[u8]) -> Result<usize>;
    fn bulk_in(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn interrupt_in(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Clear halted endpoints. Returns false when unsupported.
    fn clear_stalls(&mut self) -> bool {
        false
    }
}

pub struct UsbTransport {
    pipes: Box<dyn UsbPipes>,
}

impl UsbTransport {
    pub fn new(pipes: Box<dyn UsbPipes>) -> Self {
        Self { pipes }
    }

    fn send_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let n = self.pipes.bulk_out(data)?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
            data = &data[n..];
        }
        Ok(())
    }

    fn parse_response(frame: &[u8], response: &mut Response) -> Result<()> {
        let header = ContainerHeader::read_from(frame)?;
        if header.container_type.to_primitive() != CONTAINER_RESPONSE {
            return Err(Error::MalformedResponse);
        }
        let length = header.length.to_primitive() as usize;
        if length < CONTAINER_HEADER_LEN || length > frame.len() {
            return Err(Error::MalformedResponse);
        }
        response.response_code = header.code.to_primitive();
        response.transaction_id = header.transaction_id.to_primitive();
        response.num_params = ((length - CONTAINER_HEADER_LEN) / 4).min(MAX_PARAMS);
        let mut r = Reader::new(&frame[CONTAINER_HEADER_LEN..length]);
        for i in 0..response.num_params {
            response.params[i] = r.u32_le()?;
        }
        Ok(())
    }
}

impl Transport for UsbTransport {
    fn prefix_len(&self, _kind: BufferKind) -> usize {
        CONTAINER_HEADER_LEN
    }

    fn send_and_recv(
        &mut self,
        request: &Request,
        data_in: &mut TransferBuffer,
        response: &mut Response,
        data_out: &mut TransferBuffer,
    ) -> Result<usize> {
        // Command container.
        let mut cmd = Writer::with_capacity(CONTAINER_HEADER_LEN + request.num_params * 4);
        let cmd_len = (CONTAINER_HEADER_LEN + request.num_params * 4) as u32;
        ContainerHeader::new(cmd_len, CONTAINER_COMMAND, request.op_code, request.transaction_id)
            .write_to(cmd.grow(CONTAINER_HEADER_LEN))?;
        for &param in request.params() {
            cmd.u32_le(param);
        }
        self.send_all(cmd.as_slice())?;

        // Data-in phase, framed in place through the reserved prefix.
        if data_in.payload_len() > 0 {
            let frame_len = (CONTAINER_HEADER_LEN + data_in.payload_len()) as u32;
            ContainerHeader::new(frame_len, CONTAINER_DATA, request.op_code, request.transaction_id)
                .write_to(data_in.prefix_mut())?;
            self.send_all(data_in.frame())?;
        }

        // First bulk-in transfer: either the data container or the response.
        let capacity = data_out.frame_mut().len();
        let mut received = self.pipes.bulk_in(data_out.frame_mut())?;
        if received < CONTAINER_HEADER_LEN {
            return Err(Error::MalformedResponse);
        }
        let header = ContainerHeader::read_from(data_out.frame())?;

        match header.container_type.to_primitive() {
            CONTAINER_RESPONSE => {
                Self::parse_response(&data_out.frame()[..received], response)?;
                Ok(0)
            }
            CONTAINER_DATA => {
                let total = header.length.to_primitive() as usize;
                if total < CONTAINER_HEADER_LEN {
                    return Err(Error::MalformedResponse);
                }
                // The device is allowed to return short packets; keep
                // reading until the declared container length arrived.
                // Bytes beyond the buffer are drained and counted but not
                // kept.
                let mut scratch = [0u8; 16 * 1024];
                while received < total {
                    let n = if received < capacity {
                        let window = capacity.min(total);
                        self.pipes.bulk_in(&mut data_out.frame_mut()[received..window])?
                    } else {
                        let want = (total - received).min(scratch.len());
                        self.pipes.bulk_in(&mut scratch[..want])?
                    };
                    if n == 0 {
                        return Err(Error::ConnectionClosed);
                    }
                    received += n;
                }
                if received > capacity {
                    log::warn!(
                        "data phase of {} bytes truncated to {} byte buffer",
                        total - CONTAINER_HEADER_LEN,
                        capacity - CONTAINER_HEADER_LEN
                    );
                }

                // Trailing response container.
                let mut tail = [0u8; CONTAINER_HEADER_LEN + MAX_PARAMS * 4];
                let n = self.pipes.bulk_in(&mut tail)?;
                if n < CONTAINER_HEADER_LEN {
                    return Err(Error::MalformedResponse);
                }
                Self::parse_response(&tail[..n], response)?;
                Ok(total - CONTAINER_HEADER_LEN)
            }
            _ => Err(Error::MalformedResponse),
        }
    }

    fn reset(&mut self) -> bool {
        self.pipes.clear_stalls()
    }

    fn read_event(&mut self) -> Result<Option<PtpEvent>> {
        let mut buf = [0u8; 512];
        let n = match self.pipes.interrupt_in(&mut buf) {
            Ok(n) => n,
            Err(Error::Timeout) => return Ok(None),
            Err(e) => return Err(e),
        };
        if n < CONTAINER_HEADER_LEN {
            return Ok(None);
        }
        let header = ContainerHeader::read_from(&buf)?;
        if header.container_type.to_primitive() != CONTAINER_EVENT {
            return Ok(None);
        }
        let length = (header.length.to_primitive() as usize).min(n);
        let mut event = PtpEvent {
            code: header.code.to_primitive(),
            ..Default::default()
        };
        let mut r = Reader::new(&buf[CONTAINER_HEADER_LEN..length]);
        while event.num_params < 3 && r.remaining() >= 4 {
            event.params[event.num_params] = r.u32_le()?;
            event.num_params += 1;
        }
        Ok(Some(event))
    }

    fn requires_session_open_close(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ptp::op;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    type Sent = Rc<RefCell<Vec<Vec<u8>>>>;

    struct StubPipes {
        sent: Sent,
        reads: VecDeque<Vec<u8>>,
        events: VecDeque<Vec<u8>>,
    }

    impl StubPipes {
        fn new(reads: Vec<Vec<u8>>) -> (Self, Sent) {
            let sent: Sent = Rc::default();
            let stub = Self {
                sent: sent.clone(),
                reads: reads.into(),
                events: VecDeque::new(),
            };
            (stub, sent)
        }
    }

    impl UsbPipes for StubPipes {
        fn bulk_out(&mut self, data: &[u8]) -> Result<usize> {
            self.sent.borrow_mut().push(data.to_vec());
            Ok(data.len())
        }

        fn bulk_in(&mut self, buf: &mut [u8]) -> Result<usize> {
            let chunk = self.reads.pop_front().ok_or(Error::Timeout)?;
            assert!(chunk.len() <= buf.len(), "stub chunk exceeds read window");
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }

        fn interrupt_in(&mut self, buf: &mut [u8]) -> Result<usize> {
            let chunk = self.events.pop_front().ok_or(Error::Timeout)?;
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    fn response_container(code: u16, tid: u32, params: &[u32]) -> Vec<u8> {
        let mut w = Writer::new();
        let len = (CONTAINER_HEADER_LEN + params.len() * 4) as u32;
        ContainerHeader::new(len, CONTAINER_RESPONSE, code, tid)
            .write_to(w.grow(CONTAINER_HEADER_LEN))
            .unwrap();
        for &p in params {
            w.u32_le(p);
        }
        w.into_vec()
    }

    fn run(
        pipes: StubPipes,
        request: &Request,
        data_in: &[u8],
        data_out_cap: usize,
    ) -> (Response, TransferBuffer, Result<usize>) {
        let mut transport = UsbTransport::new(Box::new(pipes));
        let mut din = transport.alloc_buffer(BufferKind::DataIn, data_in.len()).unwrap();
        din.payload_mut().copy_from_slice(data_in);
        let mut dout = transport.alloc_buffer(BufferKind::DataOut, data_out_cap).unwrap();
        let mut response = Response::default();
        let r = transport.send_and_recv(request, &mut din, &mut response, &mut dout);
        (response, dout, r)
    }

    #[test]
    fn command_container_round_trips() {
        for params in [vec![], vec![1u32], vec![1, 2, 3], vec![1, 2, 3, 4, 5]] {
            let (pipes, sent) = StubPipes::new(vec![response_container(0x2001, 7, &[])]);
            let request = Request::new(op::OPEN_SESSION, 0, 7).with_params(&params);
            let (response, _dout, r) = run(pipes, &request, &[], 64);
            assert_eq!(r.unwrap(), 0);
            assert_eq!(response.response_code, 0x2001);

            let frames = sent.borrow().clone();
            assert_eq!(frames.len(), 1);
            let header = ContainerHeader::read_from(&frames[0]).unwrap();
            assert_eq!(
                header.length.to_primitive() as usize,
                CONTAINER_HEADER_LEN + 4 * params.len()
            );
            assert_eq!(header.container_type.to_primitive(), CONTAINER_COMMAND);
            assert_eq!(header.code.to_primitive(), op::OPEN_SESSION);
            assert_eq!(header.transaction_id.to_primitive(), 7);
            let mut rd = Reader::new(&frames[0][CONTAINER_HEADER_LEN..]);
            let mut got = Vec::new();
            while !rd.is_empty() {
                got.push(rd.u32_le().unwrap());
            }
            assert_eq!(got, params);
        }
    }

    #[test]
    fn data_in_phase_is_framed_in_place() {
        let (pipes, sent) = StubPipes::new(vec![response_container(0x2001, 3, &[])]);
        let request = Request::new(op::SDIO_SET_EXT_DEVICE_PROP_VALUE, 1, 3).with_params(&[0xD005]);
        let (_response, _dout, r) = run(pipes, &request, &[0x04, 0x00], 64);
        r.unwrap();

        let frames = sent.borrow().clone();
        assert_eq!(frames.len(), 2);
        let header = ContainerHeader::read_from(&frames[1]).unwrap();
        assert_eq!(header.length.to_primitive(), 14);
        assert_eq!(header.container_type.to_primitive(), CONTAINER_DATA);
        assert_eq!(header.transaction_id.to_primitive(), 3);
        assert_eq!(&frames[1][CONTAINER_HEADER_LEN..], &[0x04, 0x00]);
    }

    #[test]
    fn data_out_accumulates_short_packets() {
        let payload: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let total = CONTAINER_HEADER_LEN + payload.len();

        let mut first = Vec::new();
        let mut w = Writer::new();
        ContainerHeader::new(total as u32, CONTAINER_DATA, op::GET_OBJECT, 9)
            .write_to(w.grow(CONTAINER_HEADER_LEN))
            .unwrap();
        first.extend_from_slice(w.as_slice());
        first.extend_from_slice(&payload[..100]);

        let reads = vec![
            first,
            payload[100..600].to_vec(),
            payload[600..].to_vec(),
            response_container(0x2001, 9, &[]),
        ];
        let (pipes, _sent) = StubPipes::new(reads);
        let request = Request::new(op::GET_OBJECT, 1, 9).with_params(&[0xFFFF_C001]);
        let (response, dout, r) = run(pipes, &request, &[], payload.len());
        assert_eq!(r.unwrap(), payload.len());
        assert_eq!(response.response_code, 0x2001);
        assert_eq!(dout.payload(), &payload[..]);
    }

    #[test]
    fn oversized_data_out_is_truncated_but_counted() {
        let payload: Vec<u8> = (0..256u32).map(|i| i as u8).collect();
        let total = CONTAINER_HEADER_LEN + payload.len();
        let mut first = Vec::new();
        let mut w = Writer::new();
        ContainerHeader::new(total as u32, CONTAINER_DATA, op::GET_OBJECT, 2)
            .write_to(w.grow(CONTAINER_HEADER_LEN))
            .unwrap();
        first.extend_from_slice(w.as_slice());
        first.extend_from_slice(&payload[..64]);

        let (pipes, _sent) = StubPipes::new(vec![
            first,
            payload[64..].to_vec(),
            response_container(0x2001, 2, &[]),
        ]);
        let request = Request::new(op::GET_OBJECT, 1, 2).with_params(&[0xFFFF_C001]);
        let (_response, dout, r) = run(pipes, &request, &[], 64);
        assert_eq!(r.unwrap(), 256);
        assert_eq!(dout.payload(), &payload[..64]);
    }

    #[test]
    fn response_parameters_are_little_endian() {
        let (pipes, _sent) =
            StubPipes::new(vec![response_container(0x2001, 5, &[0x11111111, 0x00010002])]);
        let request = Request::new(op::GET_NUM_OBJECTS, 1, 5);
        let (response, _dout, r) = run(pipes, &request, &[], 32);
        r.unwrap();
        assert_eq!(response.params(), &[0x11111111, 0x00010002]);
        assert_eq!(response.transaction_id, 5);
    }

    #[test]
    fn unknown_container_type_is_malformed() {
        let mut bogus = response_container(0x2001, 1, &[]);
        bogus[4] = 0x09;
        let (pipes, _sent) = StubPipes::new(vec![bogus]);
        let request = Request::new(op::GET_DEVICE_INFO, 1, 1);
        let (_response, _dout, r) = run(pipes, &request, &[], 32);
        assert!(matches!(r, Err(Error::MalformedResponse)));
    }

    #[test]
    fn event_container_parses() {
        let mut w = Writer::new();
        ContainerHeader::new(16, CONTAINER_EVENT, 0xC203, 0)
            .write_to(w.grow(CONTAINER_HEADER_LEN))
            .unwrap();
        w.u32_le(0xD20D);
        let (mut pipes, _sent) = StubPipes::new(Vec::new());
        pipes.events = vec![w.into_vec()].into();
        let mut transport = UsbTransport::new(Box::new(pipes));
        let event = transport.read_event().unwrap().unwrap();
        assert_eq!(event.code, 0xC203);
        assert_eq!(event.params[0], 0xD20D);
        assert_eq!(event.num_params, 1);
        // Timeout drains to None.
        assert!(transport.read_event().unwrap().is_none());
    }
}
