//! Bounds-checked reading of DWARF section images.
//!
//! [`ReadCtx`] is a cursor over a read-only byte slice with an explicit
//! byte order. Every typed read advances the cursor only if it succeeds;
//! on failure the cursor is unchanged, so the caller can report the exact
//! offset at which the violation occurred and decide how to recover.

use core::fmt;

use crate::consts::{DWARF_LENGTH_64BIT, DWARF_LENGTH_MIN_ESCAPE};

/// Byte order of all fixed-width integer fields in a DWARF image.
///
/// Carried explicitly; DWARF data inherits the byte order of the
/// containing object file, which need not match the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

/// Failure of a typed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// The read would pass the end of the data, or a variable-length
    /// encoding overflows its target width.
    Truncated,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated read"),
        }
    }
}

impl core::error::Error for ReadError {}

/// Result type of [`ReadCtx`] operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// Failure of an initial-length read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthError {
    /// The 64-bit extended length did not fit in the remaining data.
    Truncated,
    /// The 32-bit length used a reserved escape value other than the
    /// 64-bit announcement.
    UnknownEscape(u32),
}

/// A bounds-checked cursor over a byte slice.
#[derive(Debug, Clone)]
pub struct ReadCtx<'a> {
    data: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "offsets into in-memory sections fit usize"
)]
impl<'a> ReadCtx<'a> {
    /// Creates a cursor over the whole of `data`.
    #[must_use]
    pub fn new(data: &'a [u8], order: ByteOrder) -> Self {
        Self {
            data,
            pos: 0,
            order,
        }
    }

    /// Creates a cursor bounded to `[begin, end)` of the same data.
    ///
    /// The new cursor's offsets are relative to `begin`; its position is
    /// carried over from `self`, which must lie inside the subrange.
    #[must_use]
    pub fn sub(&self, begin: u64, end: u64) -> ReadCtx<'a> {
        let (begin, end) = (begin as usize, end as usize);
        debug_assert!(begin <= self.pos && self.pos <= end && end <= self.data.len());
        ReadCtx {
            data: &self.data[begin..end],
            pos: self.pos - begin,
            order: self.order,
        }
    }

    /// Current offset from the start of the cursor's range.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.pos as u64
    }

    /// Moves the cursor to an absolute offset within the range.
    ///
    /// # Panics
    ///
    /// Panics if `offset` lies past the end of the data.
    pub fn set_offset(&mut self, offset: u64) {
        assert!(offset <= self.data.len() as u64);
        self.pos = offset as usize;
    }

    /// Moves the cursor to the end of the data.
    pub fn seek_to_end(&mut self) {
        self.pos = self.data.len();
    }

    /// Total size of the cursor's range in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Number of bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns `true` if no bytes are left to read.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: usize) -> ReadResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(ReadError::Truncated);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Fails with [`ReadError::Truncated`] at end of data.
    pub fn read_u8(&mut self) -> ReadResult<u8> {
        let b = self.take(1)?;
        Ok(b[0])
    }

    /// Reads a 2-byte integer in the cursor's byte order.
    ///
    /// # Errors
    ///
    /// Fails with [`ReadError::Truncated`] if fewer than 2 bytes remain.
    pub fn read_u16(&mut self) -> ReadResult<u16> {
        let b = self.take(2)?;
        let raw = [b[0], b[1]];
        Ok(match self.order {
            ByteOrder::Little => u16::from_le_bytes(raw),
            ByteOrder::Big => u16::from_be_bytes(raw),
        })
    }

    /// Reads a 4-byte integer in the cursor's byte order.
    ///
    /// # Errors
    ///
    /// Fails with [`ReadError::Truncated`] if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> ReadResult<u32> {
        let b = self.take(4)?;
        let raw = [b[0], b[1], b[2], b[3]];
        Ok(match self.order {
            ByteOrder::Little => u32::from_le_bytes(raw),
            ByteOrder::Big => u32::from_be_bytes(raw),
        })
    }

    /// Reads an 8-byte integer in the cursor's byte order.
    ///
    /// # Errors
    ///
    /// Fails with [`ReadError::Truncated`] if fewer than 8 bytes remain.
    pub fn read_u64(&mut self) -> ReadResult<u64> {
        let b = self.take(8)?;
        let raw = [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]];
        Ok(match self.order {
            ByteOrder::Little => u64::from_le_bytes(raw),
            ByteOrder::Big => u64::from_be_bytes(raw),
        })
    }

    /// Reads a DWARF offset: 8 bytes in the 64-bit format, 4 otherwise.
    ///
    /// # Errors
    ///
    /// Fails with [`ReadError::Truncated`] if insufficient data remains.
    pub fn read_offset(&mut self, dwarf64: bool) -> ReadResult<u64> {
        if dwarf64 {
            self.read_u64()
        } else {
            self.read_u32().map(u64::from)
        }
    }

    /// Reads an integer of the given width (1, 2, 4 or 8 bytes).
    ///
    /// # Errors
    ///
    /// Fails with [`ReadError::Truncated`] if insufficient data remains.
    ///
    /// # Panics
    ///
    /// Any other width is a programming error and panics.
    pub fn read_var(&mut self, width: u8) -> ReadResult<u64> {
        match width {
            1 => self.read_u8().map(u64::from),
            2 => self.read_u16().map(u64::from),
            4 => self.read_u32().map(u64::from),
            8 => self.read_u64(),
            _ => panic!("invalid read width {width}"),
        }
    }

    /// Reads an unsigned LEB128 value.
    ///
    /// Returns the value and a flag that is `true` when the last
    /// continuation byte carried an all-zero payload that could have been
    /// omitted (an unnecessarily long encoding).
    ///
    /// # Errors
    ///
    /// Fails with [`ReadError::Truncated`] if the encoding runs past the
    /// end of the data or overflows `u64`; the cursor is left unchanged.
    pub fn read_uleb128(&mut self) -> ReadResult<(u64, bool)> {
        let start = self.pos;
        let mut result: u64 = 0;
        let mut shift: u32 = 0;
        let mut zero_tail = false;

        loop {
            let Ok(byte) = self.read_u8() else {
                self.pos = start;
                return Err(ReadError::Truncated);
            };
            let payload = u64::from(byte & 0x7f);
            if shift >= 64 || (payload << shift) >> shift != payload {
                self.pos = start;
                return Err(ReadError::Truncated);
            }
            zero_tail = payload == 0 && shift > 0;
            result |= payload << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                return Ok((result, zero_tail));
            }
        }
    }

    /// Reads a signed LEB128 value.
    ///
    /// The flag is `true` when the last continuation byte repeated the
    /// sign (all-zero payload for non-negative values, all-ones for
    /// negative ones) and could have been omitted.
    ///
    /// # Errors
    ///
    /// Fails with [`ReadError::Truncated`] if the encoding runs past the
    /// end of the data or overflows `i64`; the cursor is left unchanged.
    pub fn read_sleb128(&mut self) -> ReadResult<(i64, bool)> {
        let start = self.pos;
        let mut result: i64 = 0;
        let mut shift: u32 = 0;
        let mut zero_tail = false;
        let mut sign = false;

        loop {
            let Ok(byte) = self.read_u8() else {
                self.pos = start;
                return Err(ReadError::Truncated);
            };
            let payload = i64::from(byte & 0x7f);
            zero_tail = shift > 0 && ((payload == 0x7f && sign) || (payload == 0 && !sign));
            sign = byte & 0x40 != 0;
            if shift >= 64 {
                self.pos = start;
                return Err(ReadError::Truncated);
            }
            result |= payload << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                if shift < 64 && sign {
                    result |= -1i64 << shift;
                }
                return Ok((result, zero_tail));
            }
        }
    }

    /// Advances the cursor by `len` bytes without interpreting them.
    ///
    /// # Errors
    ///
    /// Fails with [`ReadError::Truncated`] if fewer than `len` bytes
    /// remain; the cursor is left unchanged.
    pub fn skip(&mut self, len: u64) -> ReadResult<()> {
        if (self.remaining() as u64) < len {
            return Err(ReadError::Truncated);
        }
        self.pos += len as usize;
        Ok(())
    }

    /// Consumes a NUL-terminated string, including the terminator.
    ///
    /// # Errors
    ///
    /// Fails with [`ReadError::Truncated`] if no NUL byte follows before
    /// the end of the data; the cursor is left unchanged.
    pub fn skip_cstr(&mut self) -> ReadResult<()> {
        match self.data[self.pos..].iter().position(|&b| b == 0) {
            Some(nul) => {
                self.pos += nul + 1;
                Ok(())
            }
            None => Err(ReadError::Truncated),
        }
    }

    /// Resolves a 32-bit initial-length value that has already been read.
    ///
    /// `0xffffffff` announces the 64-bit DWARF format: the real length is
    /// read as the following 8 bytes and `dwarf64` is reported as `true`.
    /// Other values at or above [`DWARF_LENGTH_MIN_ESCAPE`] are reserved.
    ///
    /// # Errors
    ///
    /// Fails with [`LengthError::Truncated`] if the extended length cannot
    /// be read, or [`LengthError::UnknownEscape`] for a reserved value.
    pub fn read_size_extra(&mut self, size32: u32) -> Result<(u64, bool), LengthError> {
        if size32 == DWARF_LENGTH_64BIT {
            let size = self.read_u64().map_err(|_| LengthError::Truncated)?;
            Ok((size, true))
        } else if size32 >= DWARF_LENGTH_MIN_ESCAPE {
            Err(LengthError::UnknownEscape(size32))
        } else {
            Ok((u64::from(size32), false))
        }
    }
}
