//! Reassembly of frames from arbitrarily chunked transport reads.

use alloc::vec::Vec;

use crate::{
    FRAME_SYNC,
    decode::{Decode, DecodeError, DecodeErrorKind},
    frame::{CRC_SIZE, FIXED_HEADER_SIZE, Frame, FrameFlags},
    varint::VarU16,
};

/// Accumulates incoming bytes and yields complete frames.
///
/// Bytes that do not start with [`FRAME_SYNC`] are skipped. A frame that fails
/// to decode is reported once, after which the assembler advances a single
/// byte and searches for the next sync sequence, so a corrupt frame never
/// swallows the frames that follow it.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    discarded: usize,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk read from the transport.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of bytes waiting for the rest of their frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns and resets the count of garbage bytes skipped while searching
    /// for a sync sequence.
    pub fn take_discarded(&mut self) -> usize {
        core::mem::take(&mut self.discarded)
    }

    /// Extracts the next frame, or `None` if more bytes are needed.
    pub fn next_frame(&mut self) -> Option<Result<Frame, DecodeError>> {
        self.resync();

        // Reject a false sync early instead of waiting on a garbage length.
        if let Some(&flags) = self.buffer.get(FRAME_SYNC.len()) {
            if !FrameFlags::from_bits(flags).is_some_and(FrameFlags::is_well_formed) {
                self.buffer.drain(..1);
                self.discarded += 1;
                return Some(Err(DecodeError::new::<Frame>(
                    DecodeErrorKind::InvalidFlags(flags),
                )));
            }
        }

        let total = self.pending_frame_len()?;
        if self.buffer.len() < total {
            return None;
        }

        let result = Frame::decode(&mut &self.buffer[..total]);
        match result {
            Ok(_) => {
                self.buffer.drain(..total);
            }
            Err(_) => {
                self.buffer.drain(..1);
                self.discarded += 1;
            }
        }

        Some(result)
    }

    /// Drops leading bytes until the buffer starts with a sync sequence.
    fn resync(&mut self) {
        let start = self
            .buffer
            .windows(FRAME_SYNC.len())
            .position(|window| window == FRAME_SYNC)
            .unwrap_or_else(|| {
                // Keep a trailing byte that may begin a sync sequence.
                match self.buffer.last() {
                    Some(&last) if last == FRAME_SYNC[0] => self.buffer.len() - 1,
                    _ => self.buffer.len(),
                }
            });

        if start > 0 {
            self.buffer.drain(..start);
            self.discarded += start;
        }
    }

    /// Total length of the frame at the front of the buffer, once enough of
    /// its header has arrived to know it.
    fn pending_frame_len(&self) -> Option<usize> {
        let first = *self.buffer.get(FIXED_HEADER_SIZE)?;
        let size_len = if VarU16::check_wide(first) { 2 } else { 1 };

        let mut size_field = self
            .buffer
            .get(FIXED_HEADER_SIZE..(FIXED_HEADER_SIZE + size_len))?;
        let size = VarU16::decode(&mut size_field).ok()?.into_inner() as usize;

        Some(FIXED_HEADER_SIZE + size_len + size + CRC_SIZE)
    }
}
