//! The task that owns the transport's receive path.
//!
//! Every byte read from the camera passes through here. Responses are routed
//! to the call waiting on their sequence number and streamed Blocks are pushed
//! into the [`BlockQueue`]. Nothing else reads the transport.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chirp::{Frame, FrameAssembler};
use log::{debug, error, trace, warn};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    block::decode_blocks,
    dispatcher::PendingCalls,
    queue::BlockQueue,
    transport::{TransportError, TransportReader},
};

/// State shared between the listener and the connection handle.
#[derive(Debug)]
pub(crate) struct Shared {
    pub pending: Arc<PendingCalls>,
    pub queue: BlockQueue,
    link_lost: AtomicBool,
}

impl Shared {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            pending: Arc::new(PendingCalls::new()),
            queue: BlockQueue::new(queue_capacity),
            link_lost: AtomicBool::new(false),
        }
    }

    /// Whether the listener has stopped reading.
    pub fn link_lost(&self) -> bool {
        self.link_lost.load(Ordering::Acquire)
    }
}

/// Why the listener stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ListenerExit {
    Shutdown,
    Disconnected(TransportError),
}

pub(crate) fn spawn_listener<R: TransportReader>(
    reader: R,
    shared: Arc<Shared>,
    shutdown: watch::Receiver<bool>,
    max_read_errors: usize,
) -> JoinHandle<ListenerExit> {
    tokio::spawn(async move {
        let mut listener = Listener {
            reader,
            shared,
            assembler: FrameAssembler::new(),
            max_read_errors,
        };

        let exit = listener.run(shutdown).await;

        listener.shared.link_lost.store(true, Ordering::Release);
        listener.shared.pending.shutdown();

        exit
    })
}

struct Listener<R> {
    reader: R,
    shared: Arc<Shared>,
    assembler: FrameAssembler,
    max_read_errors: usize,
}

impl<R: TransportReader> Listener<R> {
    async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> ListenerExit {
        let mut read_errors = 0;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    debug!("Listener stopping");
                    return ListenerExit::Shutdown;
                }
                chunk = self.reader.recv() => chunk,
            };

            match chunk {
                Ok(chunk) => {
                    read_errors = 0;
                    self.assembler.push(&chunk);
                    self.drain_frames();
                }
                Err(err) if err.is_fatal() => {
                    error!("Pixy disconnected: {}", err);
                    return ListenerExit::Disconnected(err);
                }
                Err(err) => {
                    read_errors += 1;
                    if read_errors > self.max_read_errors {
                        error!(
                            "Giving up after {} consecutive read errors, last: {}",
                            read_errors, err
                        );
                        return ListenerExit::Disconnected(err);
                    }
                    warn!("Read from Pixy failed: {}", err);
                }
            }
        }
    }

    fn drain_frames(&mut self) {
        while let Some(result) = self.assembler.next_frame() {
            match result {
                Ok(frame) => self.route(frame),
                Err(err) => warn!("Dropping malformed frame: {}", err),
            }
        }

        let discarded = self.assembler.take_discarded();
        if discarded > 0 {
            debug!("Skipped {} bytes while searching for a frame", discarded);
        }
    }

    fn route(&self, frame: Frame) {
        trace!("received frame: {:?}", frame);

        if frame.is_response() {
            let seq = frame.header.seq;
            if !self.shared.pending.complete(frame) {
                warn!("Dropping response to seq {} that nobody is waiting for", seq);
            }
        } else if frame.is_data() {
            match decode_blocks(&frame) {
                Ok(Some(blocks)) => self.shared.queue.extend(blocks),
                Ok(None) => debug!("Discarding non-block stream frame: {:?}", frame.values.first()),
                Err(err) => warn!("Dropping stream frame: {}", err),
            }
        } else {
            warn!(
                "Discarding unexpected frame with flags {:?}",
                frame.header.flags
            );
        }
    }
}
