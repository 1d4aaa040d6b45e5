//! Correlation of calls with their responses.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chirp::{Frame, Value};
use log::{trace, warn};
use tokio::sync::oneshot;

use crate::{error::PixyError, transport::TransportError, writer::WriterHandle};

type Slot = oneshot::Sender<Result<Frame, PixyError>>;

#[derive(Debug)]
struct PendingState {
    slots: HashMap<u16, Slot>,
    next_seq: u16,
    open: bool,
}

/// Calls waiting for a response, keyed by sequence number.
#[derive(Debug)]
pub(crate) struct PendingCalls {
    state: Mutex<PendingState>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PendingState {
                slots: HashMap::new(),
                next_seq: 1,
                open: true,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PendingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves a sequence number not used by any other waiting call.
    ///
    /// Sequence number zero is never handed out since streamed data carries it.
    /// Fails with `Busy` when every other number is held by a waiting call.
    fn register(&self) -> Result<(u16, oneshot::Receiver<Result<Frame, PixyError>>), PixyError> {
        let mut state = self.lock();
        if !state.open {
            return Err(TransportError::NoDevice.into());
        }

        let start = state.next_seq;
        let Some(seq) = (0..=u16::MAX)
            .map(|offset| start.wrapping_add(offset))
            .find(|seq| *seq != 0 && !state.slots.contains_key(seq))
        else {
            warn!("All {} sequence numbers are in use", u16::MAX);
            return Err(TransportError::Busy.into());
        };
        state.next_seq = seq.wrapping_add(1);

        let (tx, rx) = oneshot::channel();
        state.slots.insert(seq, tx);
        Ok((seq, rx))
    }

    fn release(&self, seq: u16) {
        self.lock().slots.remove(&seq);
    }

    /// Hands `frame` to the call waiting on its sequence number.
    ///
    /// Returns `false` if no call is waiting.
    pub fn complete(&self, frame: Frame) -> bool {
        let Some(slot) = self.lock().slots.remove(&frame.header.seq) else {
            return false;
        };

        // The caller may have stopped waiting after the slot was looked up.
        _ = slot.send(Ok(frame));
        true
    }

    /// Fails every waiting call with `NoDevice` and refuses new ones.
    pub fn shutdown(&self) {
        let slots = {
            let mut state = self.lock();
            state.open = false;
            std::mem::take(&mut state.slots)
        };

        for (_, slot) in slots {
            _ = slot.send(Err(TransportError::NoDevice.into()));
        }
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }
}

/// Removes a call's slot however the call ends, including when its future
/// is dropped.
struct SlotGuard<'a> {
    pending: &'a PendingCalls,
    seq: u16,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.pending.release(self.seq);
    }
}

/// Sends calls through the writer task and waits for the listener to route
/// their responses back.
#[derive(Debug)]
pub(crate) struct Dispatcher {
    pending: Arc<PendingCalls>,
    writer: WriterHandle,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(pending: Arc<PendingCalls>, writer: WriterHandle, timeout: Duration) -> Self {
        Self {
            pending,
            writer,
            timeout,
        }
    }

    /// Calls procedure `id` and returns its result values.
    ///
    /// `name` is only used for diagnostics.
    pub async fn call_id(
        &self,
        name: &str,
        id: u16,
        args: Vec<Value>,
    ) -> Result<Vec<Value>, PixyError> {
        let mut frame = Frame::call(0, id, args);
        frame.validate()?;

        let (seq, response) = self.pending.register()?;
        let _slot = SlotGuard {
            pending: &self.pending,
            seq,
        };
        frame.header.seq = seq;

        trace!("Calling {:?} (id {}) as seq {}", name, id, seq);
        self.writer.send(frame.to_bytes()?).await?;

        let response = match tokio::time::timeout(self.timeout, response).await {
            Ok(Ok(result)) => result?,
            // Slot dropped without an answer.
            Ok(Err(_)) => return Err(TransportError::NoDevice.into()),
            Err(_) => {
                warn!(
                    "No response to {:?} (seq {}) within {:?}",
                    name, seq, self.timeout
                );
                return Err(PixyError::Timeout(name.to_string()));
            }
        };

        if response.is_error() {
            let code = response
                .values
                .first()
                .and_then(Value::as_i32)
                .unwrap_or(-1);
            return Err(PixyError::Remote(code));
        }

        Ok(response.values)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use chirp::{Frame, Value};
    use tokio::sync::watch;

    use super::{Dispatcher, PendingCalls};
    use crate::{
        error::PixyError,
        transport::{memory, Transport, TransportError},
        writer::spawn_writer,
    };

    #[test]
    fn sequence_numbers_skip_zero_and_busy_slots() {
        let pending = PendingCalls::new();

        let (a, _rx_a) = pending.register().unwrap();
        let (b, _rx_b) = pending.register().unwrap();
        assert_eq!((a, b), (1, 2));

        pending.lock().next_seq = u16::MAX;
        let (c, _rx_c) = pending.register().unwrap();
        let (d, _rx_d) = pending.register().unwrap();
        assert_eq!(c, u16::MAX);
        // Wraps past zero and the slots still held by `a` and `b`.
        assert_eq!(d, 3);
        assert_eq!(pending.len(), 4);
    }

    #[test]
    fn exhausted_sequence_numbers_fail_fast() {
        let pending = PendingCalls::new();
        let mut receivers = Vec::new();
        for _ in 1..=u16::MAX {
            receivers.push(pending.register().unwrap());
        }
        assert_eq!(pending.len(), usize::from(u16::MAX));

        assert!(matches!(
            pending.register(),
            Err(PixyError::Transport(TransportError::Busy))
        ));

        // Freeing any slot makes its number available again.
        pending.release(4_000);
        let (seq, _rx) = pending.register().unwrap();
        assert_eq!(seq, 4_000);
    }

    #[test]
    fn unsolicited_responses_are_reported() {
        let pending = PendingCalls::new();
        assert!(!pending.complete(Frame::response(5, 1, Vec::new())));
    }

    #[tokio::test]
    async fn shutdown_releases_waiters() {
        let pending = PendingCalls::new();
        let (_, rx) = pending.register().unwrap();

        pending.shutdown();

        assert!(matches!(
            rx.await.unwrap(),
            Err(PixyError::Transport(TransportError::NoDevice))
        ));
        assert!(!pending.is_open());
        assert!(matches!(
            pending.register(),
            Err(PixyError::Transport(TransportError::NoDevice))
        ));
    }

    #[tokio::test]
    async fn call_is_answered_and_slot_released() {
        let (transport, mut device) = memory::pair();
        let (_reader, writer) = transport.into_split();
        let (_stop, shutdown) = watch::channel(false);
        let (writer, _task) = spawn_writer(writer, shutdown);

        let pending = Arc::new(PendingCalls::new());
        let dispatcher = Dispatcher::new(pending.clone(), writer, Duration::from_secs(1));

        let device_side = {
            let pending = pending.clone();
            async move {
                let call = device.next_frame().await.unwrap();
                assert_eq!(call.header.procedure, 7);
                assert_eq!(call.values, vec![Value::U8(128)]);
                assert!(pending.complete(Frame::response(
                    call.header.seq,
                    7,
                    vec![Value::I32(0)]
                )));
            }
        };

        let (result, ()) = tokio::join!(
            dispatcher.call_id("cam_setBrightness", 7, vec![Value::U8(128)]),
            device_side
        );

        assert_eq!(result.unwrap(), vec![Value::I32(0)]);
        assert_eq!(pending.len(), 0);
    }

    #[tokio::test]
    async fn unanswered_call_times_out() {
        let (transport, _device) = memory::pair();
        let (_reader, writer) = transport.into_split();
        let (_stop, shutdown) = watch::channel(false);
        let (writer, _task) = spawn_writer(writer, shutdown);

        let pending = Arc::new(PendingCalls::new());
        let dispatcher = Dispatcher::new(pending.clone(), writer, Duration::from_millis(20));

        assert!(matches!(
            dispatcher.call_id("cam_getAWB", 2, Vec::new()).await,
            Err(PixyError::Timeout(name)) if name == "cam_getAWB"
        ));
        assert_eq!(pending.len(), 0);
    }

    #[tokio::test]
    async fn oversized_arguments_send_nothing() {
        let (transport, mut device) = memory::pair();
        let (_reader, writer) = transport.into_split();
        let (_stop, shutdown) = watch::channel(false);
        let (writer, _task) = spawn_writer(writer, shutdown);

        let pending = Arc::new(PendingCalls::new());
        let dispatcher = Dispatcher::new(pending.clone(), writer, Duration::from_secs(1));

        let result = dispatcher
            .call_id("led_set", 1, vec![Value::Bytes(vec![0; 0x8000])])
            .await;

        assert!(matches!(result, Err(PixyError::Encode(_))));
        assert_eq!(pending.len(), 0);
        assert_eq!(device.try_next_sent(), None);
    }
}
