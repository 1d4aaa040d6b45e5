//! Error types.

use std::fmt;

use chirp::{DecodeError, EncodeError};
use thiserror::Error;

use crate::transport::TransportError;

/// Numeric error codes reported by the Pixy API.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    UsbIo = -1,
    NotFound = -2,
    UsbBusy = -3,
    NoDevice = -4,
    InvalidParameter = -5,
}

impl ErrorCode {
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            -1 => Self::UsbIo,
            -2 => Self::NotFound,
            -3 => Self::UsbBusy,
            -4 => Self::NoDevice,
            -5 => Self::InvalidParameter,
            _ => return None,
        })
    }

    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UsbIo => "USB Error: I/O",
            Self::NotFound => "USB Error: Pixy not found",
            Self::UsbBusy => "USB Error: Busy",
            Self::NoDevice => "USB Error: No device",
            Self::InvalidParameter => "Invalid parameter specified",
        })
    }
}

#[derive(Error, Debug)]
pub enum PixyError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Not connected to a Pixy")]
    NotConnected,

    #[error("Procedure {0:?} is not implemented by the connected Pixy")]
    ProcedureNotFound(String),

    #[error("Frame decoding error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Frame encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Timed out waiting for a response to {0:?}")]
    Timeout(String),

    #[error("Pixy reported failure {0}")]
    Remote(i32),

    #[error("Unexpected response to {procedure:?}: {reason}")]
    UnexpectedResponse {
        procedure: String,
        reason: &'static str,
    },
}

impl PixyError {
    /// Classifies this error into one of the [`ErrorCode`]s.
    ///
    /// Remote failures are not transport errors and have no classification.
    pub fn error_code(&self) -> Option<ErrorCode> {
        Some(match self {
            Self::Transport(TransportError::NotFound) => ErrorCode::NotFound,
            Self::Transport(TransportError::Busy) => ErrorCode::UsbBusy,
            Self::Transport(TransportError::NoDevice) | Self::NotConnected => ErrorCode::NoDevice,
            Self::Transport(TransportError::Io(_) | TransportError::Timeout) | Self::Timeout(_) => {
                ErrorCode::UsbIo
            }
            Self::ProcedureNotFound(_)
            | Self::Decode(_)
            | Self::Encode(_)
            | Self::UnexpectedResponse { .. } => ErrorCode::InvalidParameter,
            Self::Remote(_) => return None,
        })
    }

    /// The negative integer this error is reported as by the C-style API.
    pub fn code(&self) -> i32 {
        match (self, self.error_code()) {
            (_, Some(code)) => code.code(),
            (Self::Remote(code), None) => *code,
            (_, None) => -1,
        }
    }
}
