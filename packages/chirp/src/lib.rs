//! Implementation of the Chirp remote procedure call framing in Rust.
//!
//! Chirp carries two kinds of traffic over a single link: calls from the host
//! to a numbered remote procedure (answered by a response frame carrying the
//! same correlation id), and unsolicited data frames streamed by the device.
//! Every frame holds an ordered list of type-tagged [`Value`]s.

#![no_std]

extern crate alloc;

mod assembler;
mod crc;
mod decode;
mod encode;
mod frame;
mod value;
mod varint;

pub use assembler::FrameAssembler;
pub use crc::CHIRP_CRC16;
pub use decode::{Decode, DecodeError, DecodeErrorKind};
pub use encode::{Encode, EncodeError, MessageEncoder};
pub use frame::{Frame, FrameFlags, FrameHeader};
pub use value::{TypeTag, Value};
pub use varint::{VarU16, VarU16SizeError};

/// Starting byte sequence of every Chirp frame.
pub const FRAME_SYNC: [u8; 2] = [0xC3, 0x5A];

/// Largest payload (and largest variable-length value) a frame can carry.
pub const MAX_PAYLOAD_SIZE: usize = (u16::MAX >> 1) as usize;

/// Deepest nesting of [`Value::Nested`] accepted when encoding or decoding.
///
/// Decoding recurses once per level, so a frame nested deeper than this is
/// rejected rather than allowed to exhaust the stack.
pub const MAX_NESTING_DEPTH: usize = 16;

/// Procedure id of the intrinsic that resolves procedure names to ids.
pub const GET_PROCEDURE_ID: u16 = 0;

/// Id returned by [`GET_PROCEDURE_ID`] for names the device does not implement.
pub const INVALID_PROCEDURE_ID: u16 = u16::MAX;
