//! USB bulk transport backed by `rusb`.
//!
//! libusb transfers are blocking, so every transfer runs on tokio's blocking
//! pool. Reads use a short timeout and are retried, which bounds how long a
//! read can outlive the listener that issued it.

use std::{sync::Arc, time::Duration};

use log::{debug, trace};
use rusb::{DeviceHandle, GlobalContext};
use tokio::task;

use super::{Transport, TransportError, TransportReader, TransportWriter};
use crate::config::UsbConfig;

impl From<rusb::Error> for TransportError {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Busy => Self::Busy,
            rusb::Error::NoDevice => Self::NoDevice,
            rusb::Error::NotFound => Self::NotFound,
            rusb::Error::Timeout => Self::Timeout,
            other => Self::Io(other.to_string()),
        }
    }
}

impl From<task::JoinError> for TransportError {
    fn from(err: task::JoinError) -> Self {
        Self::Io(err.to_string())
    }
}

/// An open, claimed Pixy USB interface.
pub struct UsbTransport {
    handle: Arc<DeviceHandle<GlobalContext>>,
    config: UsbConfig,
}

impl UsbTransport {
    /// Opens the first device matching the configured vendor and product ids
    /// and claims its interface.
    pub fn open(config: &UsbConfig) -> Result<Self, TransportError> {
        let mut handle = rusb::open_device_with_vid_pid(config.vendor_id, config.product_id)
            .ok_or(TransportError::NotFound)?;

        debug!(
            "Opened USB device {:04x}:{:04x}",
            config.vendor_id, config.product_id
        );

        handle.set_active_configuration(config.configuration)?;
        handle.claim_interface(config.interface)?;

        Ok(Self {
            handle: Arc::new(handle),
            config: config.clone(),
        })
    }
}

impl std::fmt::Debug for UsbTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsbTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Transport for UsbTransport {
    type Reader = UsbReader;
    type Writer = UsbWriter;

    fn into_split(self) -> (UsbReader, UsbWriter) {
        (
            UsbReader {
                handle: self.handle.clone(),
                endpoint: self.config.endpoint_in,
                timeout: self.config.read_timeout,
                read_size: self.config.read_size.max(1),
            },
            UsbWriter {
                handle: self.handle,
                endpoint: self.config.endpoint_out,
                timeout: self.config.write_timeout,
            },
        )
    }
}

pub struct UsbReader {
    handle: Arc<DeviceHandle<GlobalContext>>,
    endpoint: u8,
    timeout: Duration,
    read_size: usize,
}

impl TransportReader for UsbReader {
    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        loop {
            let handle = self.handle.clone();
            let (endpoint, timeout, read_size) = (self.endpoint, self.timeout, self.read_size);

            let read = task::spawn_blocking(move || {
                let mut buf = vec![0; read_size];
                handle.read_bulk(endpoint, &mut buf, timeout).map(|len| {
                    buf.truncate(len);
                    buf
                })
            })
            .await?;

            match read {
                Ok(buf) if buf.is_empty() => continue,
                Ok(buf) => {
                    trace!("usb read: {:x?}", buf);
                    return Ok(buf);
                }
                // Nothing to read yet.
                Err(rusb::Error::Timeout) => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

pub struct UsbWriter {
    handle: Arc<DeviceHandle<GlobalContext>>,
    endpoint: u8,
    timeout: Duration,
}

impl TransportWriter for UsbWriter {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let handle = self.handle.clone();
        let (endpoint, timeout) = (self.endpoint, self.timeout);
        let buf = data.to_vec();

        trace!("usb write: {:x?}", buf);

        let written = task::spawn_blocking(move || handle.write_bulk(endpoint, &buf, timeout))
            .await??;

        if written != data.len() {
            return Err(TransportError::Io(format!(
                "short write: {} of {} bytes",
                written,
                data.len()
            )));
        }

        Ok(())
    }
}
