//! Connection settings.

use std::time::Duration;

/// USB vendor id of Pixy cameras.
pub const PIXY_VENDOR_ID: u16 = 0xB1AC;

/// USB product id of Pixy cameras.
pub const PIXY_PRODUCT_ID: u16 = 0xF000;

/// How the USB transport finds and talks to the camera.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UsbConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub configuration: u8,
    pub interface: u8,
    pub endpoint_in: u8,
    pub endpoint_out: u8,
    /// Upper bound on a single bulk read. Reads that time out are retried.
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Size of the buffer handed to each bulk read.
    pub read_size: usize,
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            vendor_id: PIXY_VENDOR_ID,
            product_id: PIXY_PRODUCT_ID,
            configuration: 1,
            interface: 1,
            endpoint_in: 0x82,
            endpoint_out: 0x02,
            read_timeout: Duration::from_millis(100),
            write_timeout: Duration::from_secs(1),
            read_size: 64,
        }
    }
}

/// Settings for a [`Pixy`](crate::Pixy) connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixyConfig {
    /// How long a call waits for its response.
    pub call_timeout: Duration,
    /// Blocks held before the oldest are evicted.
    pub queue_capacity: usize,
    /// Extra attempts at procedure negotiation after a timeout.
    pub handshake_retries: usize,
    /// Consecutive non-fatal read errors tolerated before the link is
    /// considered lost.
    pub max_read_errors: usize,
    /// Procedure names resolved alongside the built-in set.
    pub extra_procedures: Vec<String>,
    pub usb: UsbConfig,
}

impl Default for PixyConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(1),
            queue_capacity: 250,
            handshake_retries: 2,
            max_read_errors: 8,
            extra_procedures: Vec::new(),
            usb: UsbConfig::default(),
        }
    }
}

impl PixyConfig {
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_handshake_retries(mut self, retries: usize) -> Self {
        self.handshake_retries = retries;
        self
    }

    pub fn with_max_read_errors(mut self, errors: usize) -> Self {
        self.max_read_errors = errors;
        self
    }

    /// Adds a procedure name to resolve during negotiation.
    pub fn with_procedure(mut self, name: impl Into<String>) -> Self {
        self.extra_procedures.push(name.into());
        self
    }

    pub fn with_usb(mut self, usb: UsbConfig) -> Self {
        self.usb = usb;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{PixyConfig, UsbConfig, PIXY_VENDOR_ID};

    #[test]
    fn defaults() {
        let config = PixyConfig::default();
        assert_eq!(config.call_timeout, Duration::from_secs(1));
        assert_eq!(config.queue_capacity, 250);
        assert_eq!(config.usb.vendor_id, PIXY_VENDOR_ID);
        assert_eq!(config.usb.endpoint_in, 0x82);
    }

    #[test]
    fn setters_chain() {
        let config = PixyConfig::default()
            .with_call_timeout(Duration::from_millis(50))
            .with_queue_capacity(3)
            .with_procedure("stop")
            .with_usb(UsbConfig {
                interface: 0,
                ..Default::default()
            });

        assert_eq!(config.call_timeout, Duration::from_millis(50));
        assert_eq!(config.queue_capacity, 3);
        assert_eq!(config.extra_procedures, ["stop"]);
        assert_eq!(config.usb.interface, 0);
    }
}
