use core::fmt;

use crate::decode::{Decode, DecodeError};
use crate::encode::Encode;

/// Length prefix of a Chirp payload or `Bytes`/`Nested` value.
///
/// Lengths up to 127 take one byte. Longer ones take two, with the high bit of
/// the first byte set and the length stored big-endian in the remaining 15
/// bits, so no length can exceed [`MAX_PAYLOAD_SIZE`](crate::MAX_PAYLOAD_SIZE).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarU16 {
    inner: u16,
}

impl VarU16 {
    /// Largest value a [`VarU16`] can hold.
    pub const MAX: u16 = u16::MAX >> 1;

    /// Creates a new [`VarU16`].
    ///
    /// # Panics
    ///
    /// Panics if the given value exceeds [`VarU16::MAX`].
    pub fn new(value: u16) -> Self {
        Self::try_new(value).expect("Value too large for variable-length u16")
    }

    /// Tries to create a new [`VarU16`].
    ///
    /// # Errors
    ///
    /// Returns a [`VarU16SizeError`] if the given value exceeds [`VarU16::MAX`].
    pub const fn try_new(value: u16) -> Result<Self, VarU16SizeError> {
        if value > Self::MAX {
            Err(VarU16SizeError { value: value as usize })
        } else {
            Ok(Self { inner: value })
        }
    }

    /// Tries to create a [`VarU16`] holding a buffer length.
    pub fn try_from_len(len: usize) -> Result<Self, VarU16SizeError> {
        u16::try_from(len)
            .map_err(|_| VarU16SizeError { value: len })
            .and_then(Self::try_new)
            .map_err(|_| VarU16SizeError { value: len })
    }

    pub fn into_inner(self) -> u16 {
        self.inner
    }

    /// Checks whether the given first byte indicates a wide (two-byte) value.
    pub fn check_wide(first: u8) -> bool {
        first > (u8::MAX >> 1)
    }

    /// Number of bytes needed to encode a length of `len`.
    pub(crate) fn encoded_len(len: usize) -> usize {
        if len > (u8::MAX >> 1) as usize { 2 } else { 1 }
    }
}

impl Encode for VarU16 {
    fn size(&self) -> usize {
        Self::encoded_len(self.inner as usize)
    }

    fn encode(&self, data: &mut [u8]) {
        if self.inner > (u8::MAX >> 1) as u16 {
            data[0] = (self.inner >> 8) as u8 | 0x80;
            data[1] = (self.inner & u8::MAX as u16) as u8;
        } else {
            data[0] = self.inner as u8;
        }
    }
}

impl Decode for VarU16 {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let first = u8::decode(data)?;

        Ok(Self {
            inner: if Self::check_wide(first) {
                let last = u8::decode(data)?;
                u16::from_be_bytes([first & (u8::MAX >> 1), last])
            } else {
                first as u16
            },
        })
    }
}

/// Returned when a [`VarU16`] cannot fit the specified value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct VarU16SizeError {
    pub value: usize,
}

impl fmt::Display for VarU16SizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value {} cannot fit in a variable-length u16",
            self.value
        )
    }
}

impl core::error::Error for VarU16SizeError {}
