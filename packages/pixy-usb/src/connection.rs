//! The connection handle.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

use chirp::{Value, GET_PROCEDURE_ID};
use log::{debug, error, info, warn};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    block::Block,
    config::PixyConfig,
    dispatcher::Dispatcher,
    error::PixyError,
    listener::{spawn_listener, ListenerExit, Shared},
    procedure::{ProcedureTable, BUILTIN_PROCEDURES},
    transport::{Transport, TransportError},
    writer::spawn_writer,
};

/// Background tasks serving one connection.
#[derive(Debug)]
struct Tasks {
    shutdown: watch::Sender<bool>,
    listener: JoinHandle<ListenerExit>,
    writer: JoinHandle<()>,
}

impl Tasks {
    /// Signals both tasks to stop and waits for them. Never fails.
    async fn stop(self) {
        self.shutdown.send_replace(true);

        match self.listener.await {
            Ok(ListenerExit::Shutdown) => debug!("Listener shut down"),
            Ok(ListenerExit::Disconnected(err)) => {
                debug!("Listener had already stopped: {}", err)
            }
            Err(err) => error!("Listener task failed: {}", err),
        }

        if let Err(err) = self.writer.await {
            error!("Writer task failed: {}", err);
        }
    }
}

/// An open connection to a Pixy.
///
/// Calls may be issued concurrently from any number of tasks through a shared
/// reference; each waits only for its own response. Blocks streamed by the
/// camera accumulate in a bounded queue drained by [`Pixy::get_blocks`].
///
/// Once [`Pixy::close`] has been called every operation fails with
/// [`PixyError::NotConnected`] without touching the transport.
#[derive(Debug)]
pub struct Pixy {
    dispatcher: Dispatcher,
    procedures: ProcedureTable,
    shared: Arc<Shared>,
    closed: AtomicBool,
    tasks: Mutex<Option<Tasks>>,
}

impl Pixy {
    /// Opens the first Pixy found on USB and negotiates procedure ids.
    #[cfg(feature = "usb")]
    pub async fn init(config: PixyConfig) -> Result<Self, PixyError> {
        let transport = crate::transport::usb::UsbTransport::open(&config.usb)?;
        Self::connect(transport, config).await
    }

    /// Starts the connection's tasks over `transport` and negotiates
    /// procedure ids.
    ///
    /// If negotiation fails the tasks are stopped again and the transport is
    /// released before the error is returned.
    pub async fn connect<T: Transport>(transport: T, config: PixyConfig) -> Result<Self, PixyError> {
        let (reader, writer) = transport.into_split();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared::new(config.queue_capacity));

        let (writer_handle, writer) = spawn_writer(writer, shutdown_rx.clone());
        let listener = spawn_listener(
            reader,
            shared.clone(),
            shutdown_rx,
            config.max_read_errors,
        );
        let tasks = Tasks {
            shutdown,
            listener,
            writer,
        };

        let dispatcher = Dispatcher::new(
            shared.pending.clone(),
            writer_handle,
            config.call_timeout,
        );

        let mut names: Vec<String> = BUILTIN_PROCEDURES.iter().map(|s| s.to_string()).collect();
        for name in config.extra_procedures {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        match negotiate(&dispatcher, &names, config.handshake_retries).await {
            Ok(procedures) => {
                info!("Connected to Pixy ({} procedures)", procedures.len());
                Ok(Self {
                    dispatcher,
                    procedures,
                    shared,
                    closed: AtomicBool::new(false),
                    tasks: Mutex::new(Some(tasks)),
                })
            }
            Err(err) => {
                error!("Failed to negotiate procedures with Pixy: {}", err);
                tasks.stop().await;
                Err(err)
            }
        }
    }

    /// The procedures the camera implements.
    pub fn procedures(&self) -> &ProcedureTable {
        &self.procedures
    }

    /// Whether the connection is open and its listener still running.
    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.shared.link_lost()
    }

    fn ensure_open(&self) -> Result<(), PixyError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PixyError::NotConnected);
        }
        Ok(())
    }

    /// Calls the named procedure and returns all of its result values.
    ///
    /// Fails before sending anything if the procedure was not resolved during
    /// negotiation or the connection is closed.
    pub async fn call(&self, name: &str, args: Vec<Value>) -> Result<Vec<Value>, PixyError> {
        self.ensure_open()?;
        let id = self.procedures.id(name)?;

        if self.shared.link_lost() {
            return Err(TransportError::NoDevice.into());
        }

        self.dispatcher.call_id(name, id, args).await
    }

    /// Calls the named procedure and returns its first result as an integer,
    /// or `0` if it returned nothing.
    pub async fn command(&self, name: &str, args: Vec<Value>) -> Result<i32, PixyError> {
        let values = self.call(name, args).await?;
        match values.first() {
            None => Ok(0),
            Some(value) => value.as_i32().ok_or_else(|| PixyError::UnexpectedResponse {
                procedure: name.to_string(),
                reason: "expected an integer result",
            }),
        }
    }

    /// Takes up to `max` queued Blocks, oldest first, without waiting.
    ///
    /// After the camera has gone away the Blocks already received are still
    /// returned; once they run out this fails with `NoDevice`.
    pub fn get_blocks(&self, max: usize) -> Result<Vec<Block>, PixyError> {
        self.ensure_open()?;

        if self.shared.link_lost() && self.shared.queue.is_empty() {
            return Err(TransportError::NoDevice.into());
        }

        Ok(self.shared.queue.drain(max))
    }

    /// Whether Blocks arrived since the last [`Pixy::get_blocks`].
    pub fn blocks_are_new(&self) -> bool {
        self.shared.queue.has_new()
    }

    /// Blocks evicted because the queue was full.
    pub fn dropped_blocks(&self) -> u64 {
        self.shared.queue.dropped()
    }

    /// Stops the connection's tasks and releases the transport.
    ///
    /// Calls still in flight fail with `NoDevice`. Closing twice is a no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let tasks = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(tasks) = tasks {
            tasks.stop().await;
        }
        self.shared.pending.shutdown();

        info!("Pixy connection closed");
    }
}

impl Drop for Pixy {
    fn drop(&mut self) {
        let tasks = self
            .tasks
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(tasks) = tasks {
            debug!("Pixy dropped without close, stopping tasks");
            tasks.shutdown.send_replace(true);
        }
    }
}

/// Resolves `names` with the `GET_PROCEDURE` intrinsic.
///
/// Timeouts are retried `retries` times; any other failure ends negotiation.
async fn negotiate(
    dispatcher: &Dispatcher,
    names: &[String],
    retries: usize,
) -> Result<ProcedureTable, PixyError> {
    let mut last_error = None;

    for _ in 0..=retries {
        match dispatcher
            .call_id("GET_PROCEDURE", GET_PROCEDURE_ID, ProcedureTable::request(names))
            .await
        {
            Ok(values) => return ProcedureTable::from_response(names, &values),
            Err(err @ PixyError::Timeout(_)) => {
                warn!("Procedure negotiation failed: {}. Retrying...", err);
                last_error = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    Err(last_error.unwrap_or_else(|| PixyError::Timeout("GET_PROCEDURE".to_string())))
}
