use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    type_name: &'static str,
}

impl DecodeError {
    pub fn new<T>(kind: DecodeErrorKind) -> Self {
        Self {
            kind,
            type_name: core::any::type_name::<T>(),
        }
    }

    pub const fn kind(&self) -> DecodeErrorKind {
        self.kind
    }
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Failed to decode {}: {}", self.type_name, self.kind)
    }
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("Frame was too short.")]
    UnexpectedEnd,

    #[error("Declared length of {declared} bytes exceeds the {remaining} bytes remaining.")]
    LengthOverrun { declared: usize, remaining: usize },

    #[error("Nested values exceed the maximum depth of {max}.")]
    NestingTooDeep { max: usize },

    #[error("Unrecognized value type tag {0:#04x}.")]
    UnknownTag(u8),

    #[error("Frame flags {0:#04x} do not name a known frame kind.")]
    InvalidFlags(u8),

    #[error("CRC16 checksum mismatch. Found {value:x}, expected {expected:x}.")]
    Checksum { value: u16, expected: u16 },

    #[error("Frame did not start with a valid sync sequence.")]
    InvalidHeader,

    #[error("Payload does not match the expected layout.")]
    InvalidPayload,
}

/// A type that can be reconstructed (decoded) from a raw sequence of bytes.
///
/// The input slice is advanced by the number of bytes consumed.
pub trait Decode {
    /// Attempts to decode `Self` from the beginning of the provided byte slice.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the input is malformed or insufficient
    /// to decode a complete value of this type.
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

macro_rules! impl_decode_for_primitive {
    ($($t:ty),*) => {
        $(
            impl Decode for $t {
                fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
                    const SIZE: usize = core::mem::size_of::<$t>();

                    let bytes: [u8; SIZE] = data
                        .get(..SIZE)
                        .and_then(|bytes| bytes.try_into().ok())
                        .ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd))?;
                    *data = &data[SIZE..];
                    Ok(Self::from_le_bytes(bytes))
                }
            }
        )*
    };
}

impl_decode_for_primitive!(u8, u16, u32, i8, i16, i32);

impl<const N: usize> Decode for [u8; N] {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let bytes: [u8; N] = data
            .get(..N)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd))?;
        *data = &data[N..];
        Ok(bytes)
    }
}

/// Splits `len` bytes off the front of `data`, failing without consuming
/// anything if fewer remain.
pub(crate) fn take<'a, T>(data: &mut &'a [u8], len: usize) -> Result<&'a [u8], DecodeError> {
    if len > data.len() {
        return Err(DecodeError::new::<T>(DecodeErrorKind::LengthOverrun {
            declared: len,
            remaining: data.len(),
        }));
    }

    let (head, tail) = data.split_at(len);
    *data = tail;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::{Decode, DecodeErrorKind, take};

    #[test]
    fn primitives_advance_the_slice() {
        let mut data: &[u8] = &[0x34, 0x12, 0xFF];

        assert_eq!(u16::decode(&mut data).unwrap(), 0x1234);
        assert_eq!(i8::decode(&mut data).unwrap(), -1);
        assert!(data.is_empty());
    }

    #[test]
    fn short_primitive_is_unexpected_end() {
        let mut data: &[u8] = &[0x01, 0x02, 0x03];
        let err = u32::decode(&mut data).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::UnexpectedEnd);
        // Nothing is consumed on failure.
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn take_rejects_overrun() {
        let mut data: &[u8] = &[1, 2];
        let err = take::<()>(&mut data, 5).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::LengthOverrun {
                declared: 5,
                remaining: 2
            }
        );
    }
}
