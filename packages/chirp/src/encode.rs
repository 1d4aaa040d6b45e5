use thiserror::Error;

/// A type that can be encoded into a sequence of bytes.
pub trait Encode {
    /// Returns the number of bytes this value will take when encoded.
    fn size(&self) -> usize;

    /// Encodes this instance into the provided byte slice.
    ///
    /// `data` must be at least [`Encode::size`] bytes long.
    fn encode(&self, data: &mut [u8]);
}

/// Returned when a value cannot be represented on the wire.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Frame payload of {size} bytes exceeds the maximum of {max} bytes.")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Variable-length value of {size} bytes exceeds the maximum of {max} bytes.")]
    ValueTooLarge { size: usize, max: usize },

    #[error("Nested values exceed the maximum depth of {max}.")]
    NestingTooDeep { max: usize },
}

macro_rules! impl_encode_for_primitive {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn size(&self) -> usize {
                    core::mem::size_of::<Self>()
                }

                fn encode(&self, data: &mut [u8]) {
                    data[..core::mem::size_of::<Self>()].copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_encode_for_primitive!(u8, u16, u32, i8, i16, i32);

impl Encode for &[u8] {
    fn size(&self) -> usize {
        self.len()
    }

    fn encode(&self, data: &mut [u8]) {
        data[..self.len()].copy_from_slice(self);
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn size(&self) -> usize {
        N
    }

    fn encode(&self, data: &mut [u8]) {
        data[..N].copy_from_slice(self);
    }
}

impl Encode for alloc::vec::Vec<u8> {
    fn size(&self) -> usize {
        self.len()
    }

    fn encode(&self, data: &mut [u8]) {
        self.as_slice().encode(data)
    }
}

/// Sequential writer over a pre-sized output buffer.
pub struct MessageEncoder<'a> {
    data: &'a mut [u8],
    position: usize,
}

impl<'a> MessageEncoder<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Encodes `value` at the current position and advances past it.
    pub fn write(&mut self, value: &impl Encode) {
        value.encode(&mut self.data[self.position..]);
        self.position += value.size();
    }

    pub fn position(&self) -> usize {
        self.position
    }
}
