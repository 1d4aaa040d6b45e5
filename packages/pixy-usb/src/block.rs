//! Detected object descriptors streamed by the camera.

use chirp::{Frame, Value};
use thiserror::Error;

/// Fourcc of a stream frame carrying normal signature blocks.
pub const CCB1: u32 = u32::from_le_bytes(*b"CCB1");

/// Fourcc of a stream frame carrying blocks with an angle (color codes).
pub const CCB2: u32 = u32::from_le_bytes(*b"CCB2");

/// Largest signature that refers to a single taught color. Anything above it
/// is an octal composite of several colors (a color code).
pub const MAX_NORMAL_SIGNATURE: u16 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockKind {
    Normal,
    ColorCode,
}

/// One detected object in a camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    pub kind: BlockKind,
    pub signature: u16,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    /// Rotation in degrees. Always zero for [`BlockKind::Normal`].
    pub angle: i16,
}

impl Block {
    fn from_words(words: &[u16], with_angle: bool) -> Self {
        let signature = words[0];
        let kind = if with_angle && signature > MAX_NORMAL_SIGNATURE {
            BlockKind::ColorCode
        } else {
            BlockKind::Normal
        };

        Self {
            kind,
            signature,
            x: words[1],
            y: words[2],
            width: words[3],
            height: words[4],
            angle: match kind {
                BlockKind::ColorCode => words[5] as i16,
                BlockKind::Normal => 0,
            },
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockDecodeError {
    #[error("stream frame is missing its fourcc or record bytes")]
    MissingPayload,

    #[error("{len} bytes of block records is not a multiple of {record_size}")]
    RaggedRecords { len: usize, record_size: usize },
}

/// Decodes the Blocks carried by a stream frame.
///
/// Returns `Ok(None)` for stream frames that do not carry blocks, such as the
/// camera's diagnostic print frames.
pub fn decode_blocks(frame: &Frame) -> Result<Option<Vec<Block>>, BlockDecodeError> {
    let mut values = frame.values.iter();

    let fourcc = match values.next() {
        Some(Value::U32(fourcc)) => *fourcc,
        _ => return Ok(None),
    };

    let with_angle = match fourcc {
        CCB1 => false,
        CCB2 => true,
        _ => return Ok(None),
    };

    let records = values
        .next()
        .and_then(Value::as_bytes)
        .ok_or(BlockDecodeError::MissingPayload)?;

    let words_per_block = if with_angle { 6 } else { 5 };
    let record_size = words_per_block * 2;

    if records.len() % record_size != 0 {
        return Err(BlockDecodeError::RaggedRecords {
            len: records.len(),
            record_size,
        });
    }

    Ok(Some(
        records
            .chunks_exact(record_size)
            .map(|record| {
                let words: Vec<u16> = record
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                Block::from_words(&words, with_angle)
            })
            .collect(),
    ))
}

/// Builds the stream frame a camera sends for `blocks`.
///
/// Normal blocks are sent as `CCB1` records unless any block is a color code,
/// in which case every block is sent as a `CCB2` record.
pub fn encode_blocks(blocks: &[Block]) -> Frame {
    let with_angle = blocks.iter().any(|b| b.kind == BlockKind::ColorCode);

    let mut records = Vec::with_capacity(blocks.len() * if with_angle { 12 } else { 10 });
    for block in blocks {
        for word in [block.signature, block.x, block.y, block.width, block.height] {
            records.extend(word.to_le_bytes());
        }
        if with_angle {
            records.extend(block.angle.to_le_bytes());
        }
    }

    Frame::data(vec![
        Value::U32(if with_angle { CCB2 } else { CCB1 }),
        Value::Bytes(records),
    ])
}
