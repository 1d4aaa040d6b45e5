//! Type-tagged argument values.

use alloc::vec::Vec;

use crate::{
    MAX_NESTING_DEPTH, MAX_PAYLOAD_SIZE,
    decode::{Decode, DecodeError, DecodeErrorKind, take},
    encode::{Encode, EncodeError, MessageEncoder},
    varint::VarU16,
};

/// Wire tag preceding every [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    U8 = 0x01,
    U16 = 0x02,
    U32 = 0x04,
    I8 = 0x11,
    I16 = 0x12,
    I32 = 0x14,
    Bytes = 0x20,
    Nested = 0x40,
}

impl TryFrom<u8> for TypeTag {
    type Error = DecodeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            0x01 => Self::U8,
            0x02 => Self::U16,
            0x04 => Self::U32,
            0x11 => Self::I8,
            0x12 => Self::I16,
            0x14 => Self::I32,
            0x20 => Self::Bytes,
            0x40 => Self::Nested,
            other => {
                return Err(DecodeError::new::<Self>(DecodeErrorKind::UnknownTag(other)));
            }
        })
    }
}

impl Decode for TypeTag {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let original = *data;
        let tag = Self::try_from(u8::decode(data)?);
        if tag.is_err() {
            *data = original;
        }
        tag
    }
}

/// A single argument or result carried by a frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    I8(i8),
    I16(i16),
    I32(i32),
    Bytes(Vec<u8>),
    /// An ordered list of values encoded inside a single length-prefixed
    /// argument.
    Nested(Vec<Value>),
}

impl Value {
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::U8(_) => TypeTag::U8,
            Self::U16(_) => TypeTag::U16,
            Self::U32(_) => TypeTag::U32,
            Self::I8(_) => TypeTag::I8,
            Self::I16(_) => TypeTag::I16,
            Self::I32(_) => TypeTag::I32,
            Self::Bytes(_) => TypeTag::Bytes,
            Self::Nested(_) => TypeTag::Nested,
        }
    }

    /// Returns any integer value widened to `i64`.
    pub fn as_int(&self) -> Option<i64> {
        Some(match *self {
            Self::U8(v) => v.into(),
            Self::U16(v) => v.into(),
            Self::U32(v) => v.into(),
            Self::I8(v) => v.into(),
            Self::I16(v) => v.into(),
            Self::I32(v) => v.into(),
            Self::Bytes(_) | Self::Nested(_) => return None,
        })
    }

    /// Returns an integer value reinterpreted as `i32`.
    ///
    /// Unsigned 32-bit values wrap, matching the `int` return convention of
    /// remote procedures.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Self::U32(v) => Some(v as i32),
            _ => self.as_int().map(|v| v as i32),
        }
    }

    /// Returns an integer value reinterpreted as `u32`.
    pub fn as_u32(&self) -> Option<u32> {
        self.as_int().map(|v| v as u32)
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&[Value]> {
        match self {
            Self::Nested(values) => Some(values),
            _ => None,
        }
    }

    /// Checks that every variable-length value fits its length prefix and
    /// that nesting stays within [`MAX_NESTING_DEPTH`].
    pub fn validate(&self) -> Result<(), EncodeError> {
        self.validate_at(0)
    }

    fn validate_at(&self, depth: usize) -> Result<(), EncodeError> {
        match self {
            Self::Bytes(bytes) if bytes.len() > MAX_PAYLOAD_SIZE => {
                Err(EncodeError::ValueTooLarge {
                    size: bytes.len(),
                    max: MAX_PAYLOAD_SIZE,
                })
            }
            Self::Nested(values) => {
                if depth >= MAX_NESTING_DEPTH {
                    return Err(EncodeError::NestingTooDeep {
                        max: MAX_NESTING_DEPTH,
                    });
                }
                for value in values {
                    value.validate_at(depth + 1)?;
                }

                let size = values_size(values);
                if size > MAX_PAYLOAD_SIZE {
                    return Err(EncodeError::ValueTooLarge {
                        size,
                        max: MAX_PAYLOAD_SIZE,
                    });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn body_size(&self) -> usize {
        match self {
            Self::U8(_) | Self::I8(_) => 1,
            Self::U16(_) | Self::I16(_) => 2,
            Self::U32(_) | Self::I32(_) => 4,
            Self::Bytes(bytes) => VarU16::encoded_len(bytes.len()) + bytes.len(),
            Self::Nested(values) => {
                let inner = values_size(values);
                VarU16::encoded_len(inner) + inner
            }
        }
    }
}

/// Total encoded size of a sequence of values.
pub(crate) fn values_size(values: &[Value]) -> usize {
    values.iter().map(Encode::size).sum()
}

/// Decodes the top-level values of a payload until `data` is exhausted.
pub(crate) fn decode_values(data: &[u8]) -> Result<Vec<Value>, DecodeError> {
    decode_values_at(data, 0)
}

/// Decodes values found `depth` levels inside nested values.
fn decode_values_at(mut data: &[u8], depth: usize) -> Result<Vec<Value>, DecodeError> {
    let mut values = Vec::new();
    while !data.is_empty() {
        values.push(Value::decode_at(&mut data, depth)?);
    }
    Ok(values)
}

impl Encode for Value {
    fn size(&self) -> usize {
        1 + self.body_size()
    }

    /// # Panics
    ///
    /// Panics if a variable-length value is longer than [`VarU16::MAX`];
    /// call [`Value::validate`] first.
    fn encode(&self, data: &mut [u8]) {
        let mut enc = MessageEncoder::new(data);
        enc.write(&(self.tag() as u8));

        match self {
            Self::U8(v) => enc.write(v),
            Self::U16(v) => enc.write(v),
            Self::U32(v) => enc.write(v),
            Self::I8(v) => enc.write(v),
            Self::I16(v) => enc.write(v),
            Self::I32(v) => enc.write(v),
            Self::Bytes(bytes) => {
                enc.write(&VarU16::new(bytes.len() as u16));
                enc.write(&bytes.as_slice());
            }
            Self::Nested(values) => {
                enc.write(&VarU16::new(values_size(values) as u16));
                for value in values {
                    enc.write(value);
                }
            }
        }
    }
}

impl Value {
    fn decode_at(data: &mut &[u8], depth: usize) -> Result<Self, DecodeError> {
        Ok(match TypeTag::decode(data)? {
            TypeTag::U8 => Self::U8(u8::decode(data)?),
            TypeTag::U16 => Self::U16(u16::decode(data)?),
            TypeTag::U32 => Self::U32(u32::decode(data)?),
            TypeTag::I8 => Self::I8(i8::decode(data)?),
            TypeTag::I16 => Self::I16(i16::decode(data)?),
            TypeTag::I32 => Self::I32(i32::decode(data)?),
            TypeTag::Bytes => {
                let len = VarU16::decode(data)?.into_inner() as usize;
                Self::Bytes(take::<Self>(data, len)?.to_vec())
            }
            TypeTag::Nested => {
                if depth >= MAX_NESTING_DEPTH {
                    return Err(DecodeError::new::<Self>(DecodeErrorKind::NestingTooDeep {
                        max: MAX_NESTING_DEPTH,
                    }));
                }
                let len = VarU16::decode(data)?.into_inner() as usize;
                Self::Nested(decode_values_at(take::<Self>(data, len)?, depth + 1)?)
            }
        })
    }
}

impl Decode for Value {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        Self::decode_at(data, 0)
    }
}

macro_rules! impl_value_from {
    ($($t:ty => $variant:ident),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_value_from!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    Vec<u8> => Bytes,
    Vec<Value> => Nested
);

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Bytes(value.as_bytes().to_vec())
    }
}
