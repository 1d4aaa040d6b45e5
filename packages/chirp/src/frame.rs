//! Chirp frames.

use alloc::{vec, vec::Vec};
use bitflags::bitflags;

use crate::{
    FRAME_SYNC, MAX_PAYLOAD_SIZE,
    crc::{CHIRP_CRC16, crc16},
    decode::{Decode, DecodeError, DecodeErrorKind, take},
    encode::{Encode, EncodeError, MessageEncoder},
    value::{Value, decode_values, values_size},
    varint::VarU16,
};

/// Bytes preceding the variable-width size field.
pub(crate) const FIXED_HEADER_SIZE: usize = 7;

/// Size of the trailing checksum.
pub(crate) const CRC_SIZE: usize = 2;

bitflags! {
    /// Kind bits carried in the third byte of every frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FrameFlags: u8 {
        /// Host-to-device procedure call.
        const CALL = 0x80;
        /// Reply to a call, correlated by sequence number.
        const RESPONSE = 0x40;
        /// Unsolicited data streamed by the device.
        const DATA = 0x10;
        /// Set on a response when the remote procedure failed.
        const ERROR = 0x01;
    }
}

impl FrameFlags {
    /// Exactly one kind bit must be set, and `ERROR` only accompanies `RESPONSE`.
    pub fn is_well_formed(self) -> bool {
        let kinds = self & (Self::CALL | Self::RESPONSE | Self::DATA);
        let one_kind = kinds == Self::CALL || kinds == Self::RESPONSE || kinds == Self::DATA;
        one_kind && (!self.contains(Self::ERROR) || kinds == Self::RESPONSE)
    }
}

/// Fixed fields of a frame.
///
/// # Encoding
///
/// | Field       | Size | Description |
/// |-------------|------|-------------|
/// | `sync`      | 2    | Must be [`FRAME_SYNC`]. |
/// | `flags`     | 1    | [`FrameFlags`]. |
/// | `seq`       | 2    | Correlation id. Zero for streamed data. |
/// | `procedure` | 2    | Procedure id, echoed in the response. Zero for streamed data. |
/// | `size`      | 1–2  | Payload size encoded as a [`VarU16`]. |
/// | `payload`   | n    | Encoded [`Value`]s. |
/// | `crc16`     | 2    | [`CHIRP_CRC16`] over everything before it, big-endian. |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHeader {
    pub flags: FrameFlags,
    pub seq: u16,
    pub procedure: u16,
}

/// A decoded protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub values: Vec<Value>,
}

impl Frame {
    pub fn new(header: FrameHeader, values: Vec<Value>) -> Self {
        Self { header, values }
    }

    /// A call to `procedure`, correlated by `seq`.
    pub fn call(seq: u16, procedure: u16, values: Vec<Value>) -> Self {
        Self::new(
            FrameHeader {
                flags: FrameFlags::CALL,
                seq,
                procedure,
            },
            values,
        )
    }

    /// A successful reply to a call.
    pub fn response(seq: u16, procedure: u16, values: Vec<Value>) -> Self {
        Self::new(
            FrameHeader {
                flags: FrameFlags::RESPONSE,
                seq,
                procedure,
            },
            values,
        )
    }

    /// A reply reporting that the remote procedure failed with `code`.
    pub fn error_response(seq: u16, procedure: u16, code: i32) -> Self {
        Self::new(
            FrameHeader {
                flags: FrameFlags::RESPONSE | FrameFlags::ERROR,
                seq,
                procedure,
            },
            vec![Value::I32(code)],
        )
    }

    /// An unsolicited data frame.
    pub fn data(values: Vec<Value>) -> Self {
        Self::new(
            FrameHeader {
                flags: FrameFlags::DATA,
                seq: 0,
                procedure: 0,
            },
            values,
        )
    }

    pub fn is_call(&self) -> bool {
        self.header.flags.contains(FrameFlags::CALL)
    }

    pub fn is_response(&self) -> bool {
        self.header.flags.contains(FrameFlags::RESPONSE)
    }

    pub fn is_error(&self) -> bool {
        self.header.flags.contains(FrameFlags::ERROR)
    }

    pub fn is_data(&self) -> bool {
        self.header.flags.contains(FrameFlags::DATA)
    }

    /// Encoded size of the values carried by this frame.
    pub fn payload_size(&self) -> usize {
        values_size(&self.values)
    }

    /// Checks that the frame can be encoded.
    pub fn validate(&self) -> Result<(), EncodeError> {
        for value in &self.values {
            value.validate()?;
        }

        let size = self.payload_size();
        if size > MAX_PAYLOAD_SIZE {
            return Err(EncodeError::PayloadTooLarge {
                size,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        Ok(())
    }

    /// Validates and encodes the frame into a new buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        self.validate()?;

        let mut bytes = vec![0; self.size()];
        self.encode(&mut bytes);
        Ok(bytes)
    }
}

impl Encode for Frame {
    fn size(&self) -> usize {
        let payload_size = self.payload_size();
        FIXED_HEADER_SIZE + VarU16::encoded_len(payload_size) + payload_size + CRC_SIZE
    }

    /// # Panics
    ///
    /// Panics if the frame does not pass [`Frame::validate`].
    fn encode(&self, data: &mut [u8]) {
        let mut enc = MessageEncoder::new(data);

        enc.write(&FRAME_SYNC);
        enc.write(&self.header.flags.bits());
        enc.write(&self.header.seq);
        enc.write(&self.header.procedure);
        enc.write(&VarU16::new(self.payload_size() as u16));
        for value in &self.values {
            enc.write(value);
        }

        let covered = enc.position();
        CHIRP_CRC16
            .checksum(&data[..covered])
            .to_be()
            .encode(&mut data[covered..]);
    }
}

impl Decode for Frame {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let original = *data;

        if <[u8; 2]>::decode(data)? != FRAME_SYNC {
            return Err(DecodeError::new::<Self>(DecodeErrorKind::InvalidHeader));
        }

        let raw_flags = u8::decode(data)?;
        let flags = FrameFlags::from_bits(raw_flags)
            .filter(|flags| flags.is_well_formed())
            .ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::InvalidFlags(raw_flags)))?;

        let seq = u16::decode(data)?;
        let procedure = u16::decode(data)?;
        let size = VarU16::decode(data)?.into_inner() as usize;
        let payload = take::<Self>(data, size)?;

        let expected_crc16 = crc16::<Self>(original.get(..(original.len() - data.len())))?;
        let crc16 = u16::decode(data)?;
        if crc16 != expected_crc16 {
            return Err(DecodeError::new::<Self>(DecodeErrorKind::Checksum {
                value: crc16,
                expected: expected_crc16,
            }));
        }

        Ok(Self {
            header: FrameHeader {
                flags,
                seq,
                procedure,
            },
            values: decode_values(payload)?,
        })
    }
}
