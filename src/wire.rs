//! Byte cursors for the PTP wire formats.
//!
//! [`Reader`] walks a borrowed byte region and fails with
//! [`Error::ShortBuffer`] without advancing when fewer bytes remain than
//! requested. [`Writer`] appends to an owned, growable region. Both sides
//! speak little-endian by default (the byte order of every PTP framing
//! handled here) with big-endian variants for the odd transport that needs
//! them.
//!
//! PTP strings are a single-byte UTF-16 code-unit count followed by that
//! many little-endian code units. Encoding appends a NUL code unit and
//! counts it; decoding tolerates and strips one.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};

pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reposition the cursor, e.g. to follow an offset field in the payload.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(Error::ShortBuffer {
                needed: pos,
                remaining: self.buf.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::ShortBuffer {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    pub fn copy_into(&mut self, out: &mut [u8]) -> Result<()> {
        let src = self.take(out.len())?;
        out.copy_from_slice(src);
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn u16_le(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn u16_be(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn i16_le(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub fn u32_le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn u32_be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn i32_le(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn u64_le(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    pub fn u64_be(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(self.take(8)?))
    }

    pub fn i64_le(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.take(8)?))
    }

    pub fn u128_le(&mut self) -> Result<u128> {
        Ok(LittleEndian::read_u128(self.take(16)?))
    }

    pub fn i128_le(&mut self) -> Result<i128> {
        Ok(LittleEndian::read_i128(self.take(16)?))
    }

    /// Decode a PTP string into UTF-8. A zero count yields an empty string.
    pub fn ptp_string(&mut self) -> Result<String> {
        let count = self.u8()? as usize;
        if count == 0 {
            return Ok(String::new());
        }
        let mut units = Vec::with_capacity(count);
        for _ in 0..count {
            units.push(self.u16_le()?);
        }
        if units.last() == Some(&0) {
            units.pop();
        }
        String::from_utf16(&units).map_err(|_| Error::MalformedResponse)
    }
}

#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    /// Append `n` zero bytes and hand back the new region for in-place
    /// serialization of packed headers.
    pub fn grow(&mut self, n: usize) -> &mut [u8] {
        let start = self.buf.len();
        self.buf.resize(start + n, 0);
        &mut self.buf[start..]
    }

    pub fn bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn u16_le(&mut self, v: u16) {
        LittleEndian::write_u16(self.grow(2), v);
    }

    pub fn u16_be(&mut self, v: u16) {
        BigEndian::write_u16(self.grow(2), v);
    }

    pub fn i16_le(&mut self, v: i16) {
        LittleEndian::write_i16(self.grow(2), v);
    }

    pub fn u32_le(&mut self, v: u32) {
        LittleEndian::write_u32(self.grow(4), v);
    }

    pub fn u32_be(&mut self, v: u32) {
        BigEndian::write_u32(self.grow(4), v);
    }

    pub fn i32_le(&mut self, v: i32) {
        LittleEndian::write_i32(self.grow(4), v);
    }

    pub fn u64_le(&mut self, v: u64) {
        LittleEndian::write_u64(self.grow(8), v);
    }

    pub fn i64_le(&mut self, v: i64) {
        LittleEndian::write_i64(self.grow(8), v);
    }

    pub fn u128_le(&mut self, v: u128) {
        LittleEndian::write_u128(self.grow(16), v);
    }

    pub fn i128_le(&mut self, v: i128) {
        LittleEndian::write_i128(self.grow(16), v);
    }

    /// Encode a PTP string: count byte, UTF-16LE code units, NUL terminator
    /// counted in the length.
    pub fn ptp_string(&mut self, s: &str) -> Result<()> {
        let mut units: Vec<u16> = s.encode_utf16().collect();
        units.push(0);
        if units.len() > u8::MAX as usize {
            return Err(Error::InvalidValue);
        }
        self.u8(units.len() as u8);
        for unit in units {
            self.u16_le(unit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_read_does_not_advance() {
        let data = [0x01u8, 0x02];
        let mut r = Reader::new(&data);
        assert!(matches!(
            r.u32_le(),
            Err(Error::ShortBuffer {
                needed: 4,
                remaining: 2
            })
        ));
        // Cursor untouched, the u16 still reads.
        assert_eq!(r.u16_le().unwrap(), 0x0201);
        assert!(r.is_empty());
    }

    #[test]
    fn primitives_round_trip() {
        let mut w = Writer::new();
        w.u8(0xAB);
        w.i8(-5);
        w.u16_le(0x1234);
        w.u32_le(0xDEADBEEF);
        w.i32_le(-1000);
        w.u64_le(0x0102030405060708);
        w.u128_le(0x000102030405060708090A0B0C0D0E0F);
        w.u16_be(0x1234);
        w.u32_be(0xCAFEBABE);

        let buf = w.into_vec();
        let mut r = Reader::new(&buf);
        assert_eq!(r.u8().unwrap(), 0xAB);
        assert_eq!(r.i8().unwrap(), -5);
        assert_eq!(r.u16_le().unwrap(), 0x1234);
        assert_eq!(r.u32_le().unwrap(), 0xDEADBEEF);
        assert_eq!(r.i32_le().unwrap(), -1000);
        assert_eq!(r.u64_le().unwrap(), 0x0102030405060708);
        assert_eq!(r.u128_le().unwrap(), 0x000102030405060708090A0B0C0D0E0F);
        assert_eq!(r.u16_be().unwrap(), 0x1234);
        assert_eq!(r.u32_be().unwrap(), 0xCAFEBABE);
    }

    #[test]
    fn ptp_string_round_trip() {
        for s in ["", "ILCE-7M4", "Sony Corporation", "日本語テスト", "a\u{1F4F7}b"] {
            let mut w = Writer::new();
            w.ptp_string(s).unwrap();
            let buf = w.into_vec();
            let mut r = Reader::new(&buf);
            assert_eq!(r.ptp_string().unwrap(), s);
            assert!(r.is_empty());
        }
    }

    #[test]
    fn ptp_string_zero_count_is_empty() {
        let mut r = Reader::new(&[0x00]);
        assert_eq!(r.ptp_string().unwrap(), "");
    }

    #[test]
    fn ptp_string_without_terminator_decodes() {
        // 2 code units, no NUL: "Hi"
        let data = [0x02, b'H', 0x00, b'i', 0x00];
        let mut r = Reader::new(&data);
        assert_eq!(r.ptp_string().unwrap(), "Hi");
    }

    #[test]
    fn ptp_string_encodes_terminator_in_count() {
        let mut w = Writer::new();
        w.ptp_string("AlphaWire").unwrap();
        let buf = w.into_vec();
        assert_eq!(buf[0], 10); // 9 chars + NUL
        assert_eq!(buf.len(), 1 + 10 * 2);
        assert_eq!(&buf[buf.len() - 2..], &[0, 0]);
    }

    #[test]
    fn utf16_round_trip_up_to_255_units() {
        let long: String = std::iter::repeat('x').take(254).collect();
        let mut w = Writer::new();
        w.ptp_string(&long).unwrap();
        let buf = w.into_vec();
        let mut r = Reader::new(&buf);
        assert_eq!(r.ptp_string().unwrap(), long);

        let too_long: String = std::iter::repeat('x').take(255).collect();
        let mut w = Writer::new();
        assert!(matches!(w.ptp_string(&too_long), Err(Error::InvalidValue)));
    }

    #[test]
    fn seek_and_skip() {
        let data = [0u8, 1, 2, 3, 4, 5, 6, 7];
        let mut r = Reader::new(&data);
        r.skip(4).unwrap();
        assert_eq!(r.u8().unwrap(), 4);
        r.seek(1).unwrap();
        assert_eq!(r.u8().unwrap(), 1);
        assert!(r.seek(9).is_err());
    }
}
