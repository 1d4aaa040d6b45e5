use crc::Crc;

use crate::{DecodeError, DecodeErrorKind};

/// [CRC16 error-detecting algorithm](https://en.wikipedia.org/wiki/Cyclic_redundancy_check)
/// appended to every Chirp frame.
pub const CHIRP_CRC16: Crc<u16> = Crc::<u16>::new(&crc::CRC_16_XMODEM);

#[inline]
pub(crate) fn crc16<T>(buf: Option<&[u8]>) -> Result<u16, DecodeError> {
    Ok(CHIRP_CRC16
        .checksum(buf.ok_or_else(|| DecodeError::new::<T>(DecodeErrorKind::UnexpectedEnd))?)
        .to_be())
}
