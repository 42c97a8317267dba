use std::io::{Read, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use log::trace;

use crate::err::{Result, XbfError};
use crate::utils::utf16::decode_utf16_units;
use crate::xbf_parser::ReadSeek;

/// Upper bound on speculative preallocation for counts read from the stream.
const MAX_PREALLOCATED_ELEMENTS: usize = 1024;

/// Primitive readers over any `Read + Seek` source.
///
/// All multi-byte values are little-endian. Every read reports the offset it started at, so a
/// failure deep inside a table can be traced back to the exact byte.
pub(crate) trait ReadExt: ReadSeek + Sized {
    #[inline]
    fn position_or_zero(&mut self) -> u64 {
        self.tell().unwrap_or(0)
    }

    #[inline]
    fn try_seek_abs_named(&mut self, offset: u64, name: &'static str) -> Result<u64> {
        self.seek(SeekFrom::Start(offset))
            .map_err(|e| XbfError::io(e, name, offset))
    }

    #[inline]
    fn try_u8_named(&mut self, name: &'static str) -> Result<u8> {
        let offset = self.position_or_zero();
        self.read_u8()
            .map_err(|e| XbfError::from_read(e, name, offset))
    }

    #[inline]
    fn try_u16_named(&mut self, name: &'static str) -> Result<u16> {
        let offset = self.position_or_zero();
        self.read_u16::<LittleEndian>()
            .map_err(|e| XbfError::from_read(e, name, offset))
    }

    #[inline]
    fn try_i16_named(&mut self, name: &'static str) -> Result<i16> {
        let offset = self.position_or_zero();
        self.read_i16::<LittleEndian>()
            .map_err(|e| XbfError::from_read(e, name, offset))
    }

    #[inline]
    fn try_u32_named(&mut self, name: &'static str) -> Result<u32> {
        let offset = self.position_or_zero();
        self.read_u32::<LittleEndian>()
            .map_err(|e| XbfError::from_read(e, name, offset))
    }

    #[inline]
    fn try_i32_named(&mut self, name: &'static str) -> Result<i32> {
        let offset = self.position_or_zero();
        self.read_i32::<LittleEndian>()
            .map_err(|e| XbfError::from_read(e, name, offset))
    }

    #[inline]
    fn try_f32_named(&mut self, name: &'static str) -> Result<f32> {
        let offset = self.position_or_zero();
        self.read_f32::<LittleEndian>()
            .map_err(|e| XbfError::from_read(e, name, offset))
    }

    /// A boolean stored as a single byte. Only `0` and `1` are accepted.
    fn try_bool_u8_named(&mut self, name: &'static str) -> Result<bool> {
        let offset = self.position_or_zero();
        match self.try_u8_named(name)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(XbfError::malformed(
                offset,
                format!("`{other}` is not a valid boolean for {name}"),
            )),
        }
    }

    fn try_bytes_named(&mut self, len: usize, name: &'static str) -> Result<Vec<u8>> {
        let offset = self.position_or_zero();
        let mut buf = Vec::with_capacity(len.min(1 << 16));
        let read = Read::take(&mut *self, len as u64)
            .read_to_end(&mut buf)
            .map_err(|e| XbfError::from_read(e, name, offset))?;

        if read != len {
            return Err(XbfError::malformed(
                offset,
                format!("unexpected end of data while reading {name} (need {len} bytes, have {read})"),
            ));
        }

        Ok(buf)
    }

    /// Reads a 7-bit encoded integer: each byte carries 7 bits of payload, least significant
    /// group first, with the high bit set on every byte but the last.
    ///
    /// At most five bytes are consumed; a fifth byte carrying more than the remaining four bits
    /// would describe a value wider than 32 bits and is rejected.
    fn try_7bit_encoded_int_named(&mut self, name: &'static str) -> Result<i32> {
        let offset = self.position_or_zero();
        let mut value: u32 = 0;

        for shift in (0..35).step_by(7) {
            let byte = self.try_u8_named(name)?;

            if shift == 28 && byte > 0x0F {
                return Err(XbfError::malformed(
                    offset,
                    format!("7-bit encoded {name} does not fit in 32 bits"),
                ));
            }

            value |= u32::from(byte & 0x7F) << shift;

            if byte & 0x80 == 0 {
                return Ok(value as i32);
            }
        }

        Err(XbfError::malformed(
            offset,
            format!("7-bit encoded {name} does not fit in 32 bits"),
        ))
    }

    /// A length-prefixed UTF-16 string: a signed 32 bit count of code units, followed by the
    /// code units themselves.
    fn try_xbf_string_named(&mut self, name: &'static str) -> Result<String> {
        let offset = self.position_or_zero();
        let len = self.try_i32_named(name)?;

        if len < 0 {
            return Err(XbfError::malformed(
                offset,
                format!("negative string length `{len}` for {name}"),
            ));
        }

        trace!(
            "Offset `0x{offset:08x} ({offset})` reading {name} of len {len}",
            offset = offset,
            name = name,
            len = len
        );

        let byte_len = (len as usize).checked_mul(2).ok_or_else(|| {
            XbfError::malformed(offset, format!("string length `{len}` for {name} overflows"))
        })?;

        let raw = self.try_bytes_named(byte_len, name)?;
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();

        decode_utf16_units(&units)
            .map_err(|_| XbfError::malformed(offset, format!("invalid UTF-16 data in {name}")))
    }

    /// Reads a count followed by that many elements.
    ///
    /// The count is either a plain little-endian `i32` or a 7-bit encoded integer, as chosen by
    /// the caller. Negative counts are rejected.
    fn try_read_vector<T, F>(
        &mut self,
        use_7bit_length: bool,
        name: &'static str,
        mut read_one: F,
    ) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let offset = self.position_or_zero();
        let count = if use_7bit_length {
            self.try_7bit_encoded_int_named(name)?
        } else {
            self.try_i32_named(name)?
        };

        if count < 0 {
            return Err(XbfError::malformed(
                offset,
                format!("negative element count `{count}` for {name}"),
            ));
        }

        let count = count as usize;
        let mut out = Vec::with_capacity(count.min(MAX_PREALLOCATED_ELEMENTS));
        for _ in 0..count {
            out.push(read_one(self)?);
        }

        Ok(out)
    }
}

impl<T: ReadSeek> ReadExt for T {}
