//! Byte-oriented links to a Pixy.
//!
//! A [`Transport`] is split once into a [`TransportReader`] owned by the
//! stream listener and a [`TransportWriter`] owned by the writer task, so the
//! receive path has exactly one reader and the send path exactly one writer.

use std::future::Future;

use thiserror::Error;

pub mod memory;
#[cfg(feature = "usb")]
pub mod usb;

/// Link-level failures reported by a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("USB I/O error: {0}")]
    Io(String),

    #[error("Pixy not found")]
    NotFound,

    #[error("USB device is busy")]
    Busy,

    #[error("No device")]
    NoDevice,

    #[error("USB transfer timed out")]
    Timeout,
}

impl TransportError {
    /// Whether the link can never recover from this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NoDevice | Self::NotFound)
    }
}

/// The receive half of a transport.
pub trait TransportReader: Send + 'static {
    /// Waits for the next chunk of bytes from the device.
    ///
    /// Chunks carry no framing; a frame may span several chunks and one chunk
    /// may hold several frames.
    fn recv(&mut self) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}

/// The send half of a transport.
pub trait TransportWriter: Send + 'static {
    /// Writes all of `data` to the device.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// An open link to a Pixy that can be split into its two halves.
pub trait Transport {
    type Reader: TransportReader;
    type Writer: TransportWriter;

    fn into_split(self) -> (Self::Reader, Self::Writer);
}
