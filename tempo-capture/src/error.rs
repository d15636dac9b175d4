//! Errors reported by audio capture

use thiserror::Error;

use crate::lifecycle::{Operation, StreamState};

/// Errors that can occur while acquiring audio
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Cannot open device '{device}': {reason}")]
    Open { device: String, reason: String },
    #[error("Cannot negotiate stream parameters: {0}")]
    Negotiation(String),
    #[error("Cannot prepare audio interface: {0}")]
    Prepare(String),
    #[error("Read error: {0}")]
    Read(String),
    #[error("Timed out after {0:?} waiting for samples")]
    Timeout(std::time::Duration),
    #[error("Cannot {operation} while stream is {state}")]
    InvalidTransition {
        operation: Operation,
        state: StreamState,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
