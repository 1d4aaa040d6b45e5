//! The task that owns the transport's send path.
//!
//! ```text
//! call A ─┐
//! call B ─┼─► mpsc::Sender<OutboundFrame> ─► writer task ─► transport
//! call N ─┘
//! ```
//!
//! Frames are written whole and one at a time, so concurrent calls never
//! interleave their request bytes.

use log::{debug, trace};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};

use crate::transport::{TransportError, TransportWriter};

/// Frames queued for the writer before callers wait.
const CHANNEL_CAPACITY: usize = 32;

/// An encoded frame waiting to be written.
#[derive(Debug)]
struct OutboundFrame {
    bytes: Vec<u8>,
    sent: oneshot::Sender<Result<(), TransportError>>,
}

/// Handle for submitting frames to the writer task.
#[derive(Debug, Clone)]
pub(crate) struct WriterHandle {
    tx: mpsc::Sender<OutboundFrame>,
}

impl WriterHandle {
    /// Writes `bytes` and waits until the transport has accepted them.
    pub async fn send(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        let (sent, result) = oneshot::channel();
        self.tx
            .send(OutboundFrame { bytes, sent })
            .await
            .map_err(|_| TransportError::NoDevice)?;

        result.await.unwrap_or(Err(TransportError::NoDevice))
    }
}

/// Spawns the writer task.
///
/// The task exits when `shutdown` changes (or its sender is dropped) or when
/// every [`WriterHandle`] is dropped.
pub(crate) fn spawn_writer<W: TransportWriter>(
    writer: W,
    shutdown: watch::Receiver<bool>,
) -> (WriterHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let task = tokio::spawn(writer_loop(writer, rx, shutdown));
    (WriterHandle { tx }, task)
}

async fn writer_loop<W: TransportWriter>(
    mut writer: W,
    mut rx: mpsc::Receiver<OutboundFrame>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            frame = rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        trace!("sent frame: {:x?}", frame.bytes);
        let result = writer.send(&frame.bytes).await;
        // The caller may have given up waiting.
        _ = frame.sent.send(result);
    }

    debug!("Writer task stopped");
}
