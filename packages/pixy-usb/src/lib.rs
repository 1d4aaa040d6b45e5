//! Host-side client for Pixy vision sensors. Not affiliated with Charmed Labs.
//!
//! A [`Pixy`] multiplexes two kinds of traffic over one USB link: procedure
//! calls answered by the camera, and Blocks (detected objects) that the camera
//! streams on its own. One task owns the read side of the link and routes what
//! arrives, another owns the write side, and calls are matched to their
//! responses by sequence number.
//!
//! ```no_run
//! # async fn run() -> Result<(), pixy_usb::PixyError> {
//! use pixy_usb::{Pixy, PixyConfig};
//!
//! let pixy = Pixy::init(PixyConfig::default()).await?;
//! pixy.cam_set_brightness(128).await?;
//!
//! for block in pixy.get_blocks(100)? {
//!     println!("signature {} at ({}, {})", block.signature, block.x, block.y);
//! }
//!
//! pixy.close().await;
//! # Ok(())
//! # }
//! ```

pub use chirp as protocol;

pub mod block;
pub mod commands;
pub mod config;
pub mod connection;
mod dispatcher;
pub mod error;
mod listener;
pub mod procedure;
pub mod queue;
pub mod transport;
mod writer;

pub use block::{Block, BlockKind};
pub use commands::FirmwareVersion;
pub use config::{PixyConfig, UsbConfig};
pub use connection::Pixy;
pub use error::{ErrorCode, PixyError};
pub use procedure::ProcedureTable;
pub use queue::BlockQueue;
pub use transport::TransportError;
