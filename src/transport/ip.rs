//! PTP-over-IP framing.
//!
//! Every packet on the wire is a little-endian u32 length (covering the
//! whole packet) and u32 packet type, then a type-specific payload. One
//! device uses two TCP connections: the data socket carries the init
//! handshake, commands, data phases and responses; the event socket is
//! opened after the data socket is authenticated and only ever carries
//! Event packets.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::ptp::{PtpEvent, Request, Response, MAX_PARAMS};
use crate::transport::{BufferKind, Transport, TransferBuffer};
use crate::wire::{Reader, Writer};

pub const INIT_COMMAND_REQUEST: u32 = 0x01;
pub const INIT_COMMAND_ACK: u32 = 0x02;
pub const INIT_EVENT_REQUEST: u32 = 0x03;
pub const INIT_EVENT_ACK: u32 = 0x04;
pub const INIT_FAIL: u32 = 0x05;
pub const CMD_REQUEST: u32 = 0x06;
pub const CMD_RESPONSE: u32 = 0x07;
pub const EVENT: u32 = 0x08;
pub const DATA_START: u32 = 0x09;
pub const DATA: u32 = 0x0A;
pub const DATA_CANCEL: u32 = 0x0B;
pub const DATA_END: u32 = 0x0C;
pub const PROBE_REQUEST: u32 = 0x0D;
pub const PROBE_RESPONSE: u32 = 0x0E;

const PACKET_HEADER_LEN: usize = 8;

/// PTP-IP init protocol version sent in the Init Command Request.
pub const INIT_PROTOCOL_VERSION: u32 = 0x0001_0000;

/// The initiator GUID presented to the camera. Any valid 16-byte value is
/// accepted; cameras echo it in their pairing UI.
pub const INITIATOR_GUID: [u8; 16] = *b"alphalink-ptpip!";

/// The initiator friendly name shown on the camera when pairing.
pub const FRIENDLY_NAME: &str = "AlphaWire";

pub fn init_fail_reason(code: u32) -> &'static str {
    match code {
        0x0000_0001 => "connection rejected for this initiator (GUID/name mismatch)",
        0x0000_0002 => "device busy, maximum sessions reached",
        0x0000_0003 => "unspecified failure during init phase",
        0x0000_0004 => "initiator GUID invalid or not recognized",
        _ => "unknown failure code",
    }
}

/// Accumulates stream bytes and hands out one length-framed packet at a
/// time. A read may deliver more bytes than the current packet; the
/// residue stays buffered for the next packet.
pub(crate) struct PacketReader {
    buf: Vec<u8>,
    filled: usize,
}

impl PacketReader {
    pub fn new() -> Self {
        Self {
            buf: vec![0; 1024],
            filled: 0,
        }
    }

    fn fill<S: Read>(&mut self, stream: &mut S, need: usize) -> Result<()> {
        while self.filled < need {
            if self.buf.len() - self.filled < 1024 {
                self.buf.resize(self.buf.len() + 1024, 0);
            }
            let n = stream
                .read(&mut self.buf[self.filled..])
                .map_err(Error::from_stream)?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
            self.filled += n;
        }
        Ok(())
    }

    /// Read the next packet, returning its type and payload. Leaves any
    /// bytes past the declared length in place for the following packet.
    pub fn next_packet<S: Read>(&mut self, stream: &mut S) -> Result<(u32, Vec<u8>)> {
        self.fill(stream, PACKET_HEADER_LEN)?;
        let mut header = Reader::new(&self.buf[..PACKET_HEADER_LEN]);
        let length = header.u32_le()? as usize;
        let packet_type = header.u32_le()?;
        if length < PACKET_HEADER_LEN {
            return Err(Error::MalformedResponse);
        }
        self.fill(stream, length)?;
        let payload = self.buf[PACKET_HEADER_LEN..length].to_vec();
        self.buf.copy_within(length..self.filled, 0);
        self.filled -= length;
        Ok((packet_type, payload))
    }

    #[cfg(test)]
    fn residue(&self) -> usize {
        self.filled
    }
}

fn send_all<S: Write>(stream: &mut S, mut data: &[u8]) -> Result<()> {
    while !data.is_empty() {
        let n = stream.write(data).map_err(Error::from_stream)?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        data = &data[n..];
    }
    Ok(())
}

pub(crate) fn send_init_command_request<S: Write>(
    stream: &mut S,
    guid: &[u8; 16],
    friendly_name: &str,
) -> Result<()> {
    let units: Vec<u16> = friendly_name.encode_utf16().collect();
    let length = PACKET_HEADER_LEN + 16 + (units.len() + 1) * 2 + 4;
    let mut w = Writer::with_capacity(length);
    w.u32_le(length as u32);
    w.u32_le(INIT_COMMAND_REQUEST);
    w.bytes(guid);
    for unit in units {
        w.u16_le(unit);
    }
    w.u16_le(0);
    w.u32_le(INIT_PROTOCOL_VERSION);
    send_all(stream, w.as_slice())
}

/// Wait for the Init Command Ack and return the connection number the
/// responder assigned. An Init Fail packet surfaces as `ConnectionClosed`
/// after logging the coded reason.
pub(crate) fn recv_init_command_ack<S: Read>(
    reader: &mut PacketReader,
    stream: &mut S,
) -> Result<u32> {
    let (packet_type, payload) = reader.next_packet(stream)?;
    match packet_type {
        INIT_COMMAND_ACK => Reader::new(&payload).u32_le(),
        INIT_FAIL => {
            let code = Reader::new(&payload).u32_le().unwrap_or(0);
            log::error!("PTP-IP init failed: {} ({code:#010x})", init_fail_reason(code));
            Err(Error::ConnectionClosed)
        }
        _ => {
            log::error!("unexpected init response packet type {packet_type:#010x}");
            Err(Error::MalformedResponse)
        }
    }
}

pub(crate) fn send_init_event_request<S: Write>(stream: &mut S, session_id: u32) -> Result<()> {
    let mut w = Writer::with_capacity(12);
    w.u32_le(12);
    w.u32_le(INIT_EVENT_REQUEST);
    w.u32_le(session_id);
    send_all(stream, w.as_slice())
}

pub(crate) fn recv_init_event_ack<S: Read>(reader: &mut PacketReader, stream: &mut S) -> Result<()> {
    let (packet_type, _payload) = reader.next_packet(stream)?;
    if packet_type != INIT_EVENT_ACK {
        return Err(Error::MalformedResponse);
    }
    Ok(())
}

/// A PTP transport over an established pair of PTP-IP sockets.
pub struct IpTransport<S: Read + Write> {
    data: S,
    event: Option<S>,
    reader: PacketReader,
    event_reader: PacketReader,
}

impl<S: Read + Write> IpTransport<S> {
    pub fn new(data: S, event: Option<S>) -> Self {
        Self::with_readers(data, event, PacketReader::new(), PacketReader::new())
    }

    /// Build from sockets whose init handshake already consumed stream
    /// bytes, keeping any buffered residue.
    pub(crate) fn with_readers(
        data: S,
        event: Option<S>,
        reader: PacketReader,
        event_reader: PacketReader,
    ) -> Self {
        Self {
            data,
            event,
            reader,
            event_reader,
        }
    }
}

impl<S: Read + Write> Transport for IpTransport<S> {
    fn prefix_len(&self, _kind: BufferKind) -> usize {
        // Packets are assembled in their own buffers; payload needs no
        // reserved framing prefix on this transport.
        0
    }

    fn send_and_recv(
        &mut self,
        request: &Request,
        data_in: &mut TransferBuffer,
        response: &mut Response,
        data_out: &mut TransferBuffer,
    ) -> Result<usize> {
        // Command Request packet. The data-phase word is 1 for no/inbound
        // data and 2 when a data-out phase to the device follows.
        let length = PACKET_HEADER_LEN + 4 + 2 + 4 + request.num_params * 4;
        let mut w = Writer::with_capacity(length);
        w.u32_le(length as u32);
        w.u32_le(CMD_REQUEST);
        w.u32_le(if data_in.payload_len() == 0 { 1 } else { 2 });
        w.u16_le(request.op_code);
        w.u32_le(request.transaction_id);
        for &param in request.params() {
            w.u32_le(param);
        }
        send_all(&mut self.data, w.as_slice())?;

        // Data phase to the device: Start-Data, one Data packet, End-Data.
        if data_in.payload_len() > 0 {
            let payload = data_in.payload();
            let mut w = Writer::with_capacity(44 + payload.len());
            w.u32_le(20);
            w.u32_le(DATA_START);
            w.u32_le(request.transaction_id);
            w.u64_le(payload.len() as u64);
            w.u32_le((12 + payload.len()) as u32);
            w.u32_le(DATA);
            w.u32_le(request.transaction_id);
            w.bytes(payload);
            w.u32_le(12);
            w.u32_le(DATA_END);
            w.u32_le(request.transaction_id);
            send_all(&mut self.data, w.as_slice())?;
        }

        // Read until the Command Response, accumulating any data phase.
        let capacity = data_out.payload_len();
        let mut copied = 0usize;
        let mut transferred = 0usize;
        loop {
            let (packet_type, payload) = self.reader.next_packet(&mut self.data)?;
            match packet_type {
                CMD_RESPONSE => {
                    if payload.len() < 6 {
                        return Err(Error::MalformedResponse);
                    }
                    let mut r = Reader::new(&payload);
                    response.response_code = r.u16_le()?;
                    response.transaction_id = r.u32_le()?;
                    response.num_params = ((payload.len() - 6) / 4).min(MAX_PARAMS);
                    for i in 0..response.num_params {
                        response.params[i] = r.u32_le()?;
                    }
                    break;
                }
                DATA_START => {
                    if payload.len() < 12 {
                        return Err(Error::MalformedResponse);
                    }
                    let mut r = Reader::new(&payload);
                    let _tid = r.u32_le()?;
                    let total = r.u64_le()?;
                    if total > capacity as u64 {
                        log::warn!("response data of {total} bytes exceeds {capacity} byte buffer");
                    }
                }
                DATA => {
                    if payload.len() < 4 {
                        return Err(Error::MalformedResponse);
                    }
                    let chunk = &payload[4..];
                    let fit = chunk.len().min(capacity - copied);
                    data_out.payload_mut()[copied..copied + fit].copy_from_slice(&chunk[..fit]);
                    copied += fit;
                    transferred += chunk.len();
                }
                DATA_END => {
                    if payload.len() != 4 {
                        return Err(Error::MalformedResponse);
                    }
                }
                _ => return Err(Error::MalformedResponse),
            }
        }
        Ok(transferred)
    }

    fn read_event(&mut self) -> Result<Option<PtpEvent>> {
        let Some(event_sock) = self.event.as_mut() else {
            return Ok(None);
        };
        let (packet_type, payload) = match self.event_reader.next_packet(event_sock) {
            Ok(p) => p,
            Err(Error::Timeout) => return Ok(None),
            Err(e) => return Err(e),
        };
        if packet_type != EVENT || payload.len() < 6 {
            return Ok(None);
        }
        let mut r = Reader::new(&payload);
        let mut event = PtpEvent {
            code: r.u16_le()?,
            ..Default::default()
        };
        let _tid = r.u32_le()?;
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
