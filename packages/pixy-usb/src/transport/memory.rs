//! An in-process transport pair.
//!
//! [`pair`] returns a [`MemoryTransport`] to hand to [`Pixy::connect`] and a
//! [`MemoryDevice`] that plays the part of the camera: it sees every byte the
//! host writes and can inject arbitrary bytes or errors into the host's read
//! path. Dropping the device makes the host's reader fail with
//! [`TransportError::NoDevice`], which is how an unplug looks over USB.
//!
//! [`Pixy::connect`]: crate::Pixy::connect

use chirp::{Frame, FrameAssembler, Value};
use tokio::sync::mpsc;

use super::{Transport, TransportError, TransportReader, TransportWriter};

type Chunk = Result<Vec<u8>, TransportError>;

/// Creates a connected host/device pair.
pub fn pair() -> (MemoryTransport, MemoryDevice) {
    let (to_host, from_device) = mpsc::unbounded_channel();
    let (to_device, from_host) = mpsc::unbounded_channel();

    (
        MemoryTransport {
            reader: MemoryReader { rx: from_device },
            writer: MemoryWriter { tx: to_device },
        },
        MemoryDevice {
            tx: to_host,
            rx: from_host,
            assembler: FrameAssembler::new(),
        },
    )
}

/// Host side of an in-process link.
#[derive(Debug)]
pub struct MemoryTransport {
    reader: MemoryReader,
    writer: MemoryWriter,
}

impl Transport for MemoryTransport {
    type Reader = MemoryReader;
    type Writer = MemoryWriter;

    fn into_split(self) -> (MemoryReader, MemoryWriter) {
        (self.reader, self.writer)
    }
}

#[derive(Debug)]
pub struct MemoryReader {
    rx: mpsc::UnboundedReceiver<Chunk>,
}

impl TransportReader for MemoryReader {
    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        self.rx.recv().await.unwrap_or(Err(TransportError::NoDevice))
    }
}

#[derive(Debug)]
pub struct MemoryWriter {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl TransportWriter for MemoryWriter {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.tx
            .send(data.to_vec())
            .map_err(|_| TransportError::NoDevice)
    }
}

/// Device side of an in-process link.
#[derive(Debug)]
pub struct MemoryDevice {
    tx: mpsc::UnboundedSender<Chunk>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    assembler: FrameAssembler,
}

impl MemoryDevice {
    /// Delivers raw bytes to the host as a single read.
    pub fn inject(&self, bytes: impl Into<Vec<u8>>) -> Result<(), TransportError> {
        self.tx
            .send(Ok(bytes.into()))
            .map_err(|_| TransportError::NoDevice)
    }

    /// Makes the host's next read fail with `error`.
    pub fn inject_error(&self, error: TransportError) -> Result<(), TransportError> {
        self.tx.send(Err(error)).map_err(|_| TransportError::NoDevice)
    }

    /// Encodes and delivers a frame to the host.
    pub fn send_frame(&self, frame: &Frame) -> Result<(), TransportError> {
        let bytes = frame
            .to_bytes()
            .map_err(|err| TransportError::Io(err.to_string()))?;
        self.inject(bytes)
    }

    /// Answers `call` with a successful response carrying `values`.
    pub fn reply(&self, call: &Frame, values: Vec<Value>) -> Result<(), TransportError> {
        self.send_frame(&Frame::response(
            call.header.seq,
            call.header.procedure,
            values,
        ))
    }

    /// Answers `call` with a remote failure.
    pub fn reply_error(&self, call: &Frame, code: i32) -> Result<(), TransportError> {
        self.send_frame(&Frame::error_response(
            call.header.seq,
            call.header.procedure,
            code,
        ))
    }

    /// Waits for the next write made by the host.
    pub async fn next_sent(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }

    /// Returns a write made by the host without waiting, if one is queued.
    pub fn try_next_sent(&mut self) -> Option<Vec<u8>> {
        self.rx.try_recv().ok()
    }

    /// Waits for the next complete frame written by the host.
    ///
    /// Returns `None` once the host has released its writer. Bytes that do not
    /// decode are skipped.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        loop {
            while let Some(result) = self.assembler.next_frame() {
                if let Ok(frame) = result {
                    return Some(frame);
                }
            }

            let chunk = self.rx.recv().await?;
            self.assembler.push(&chunk);
        }
    }
}

#[cfg(test)]
mod tests {
    use chirp::{Frame, Value};

    use super::pair;
    use crate::transport::{Transport, TransportError, TransportReader, TransportWriter};

    #[tokio::test]
    async fn bytes_flow_both_ways() {
        let (transport, mut device) = pair();
        let (mut reader, mut writer) = transport.into_split();

        writer.send(&[1, 2, 3]).await.unwrap();
        assert_eq!(device.next_sent().await, Some(vec![1, 2, 3]));
        assert_eq!(device.try_next_sent(), None);

        device.inject([4, 5]).unwrap();
        assert_eq!(reader.recv().await, Ok(vec![4, 5]));
    }

    #[tokio::test]
    async fn device_reassembles_host_frames() {
        let (transport, mut device) = pair();
        let (_reader, mut writer) = transport.into_split();

        let frame = Frame::call(1, 4, vec![Value::U8(1)]);
        let bytes = frame.to_bytes().unwrap();
        let (a, b) = bytes.split_at(5);
        writer.send(a).await.unwrap();
        writer.send(b).await.unwrap();

        assert_eq!(device.next_frame().await, Some(frame));
    }

    #[tokio::test]
    async fn dropping_the_device_is_an_unplug() {
        let (transport, device) = pair();
        let (mut reader, mut writer) = transport.into_split();

        device.inject_error(TransportError::Busy).unwrap();
        drop(device);

        assert_eq!(reader.recv().await, Err(TransportError::Busy));
        assert_eq!(reader.recv().await, Err(TransportError::NoDevice));
        assert_eq!(writer.send(&[0]).await, Err(TransportError::NoDevice));
    }
}
