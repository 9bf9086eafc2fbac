//! Transport fault classification.
//!
//! # Responsibilities
//! - Categorize low-level socket/stream errors as benign vs unexpected
//! - Benign faults (peer disconnects and friends) are logged at debug and dropped
//! - Unexpected faults are logged at error with full context, never panic
//!
//! Classification happens once per fault; the record is consumed by the
//! top-level handler and discarded.

use std::io;

use thiserror::Error;

/// Category of a transport-level fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FaultCode {
    /// Peer reset the connection.
    #[error("connection reset by peer")]
    ConnectionReset,
    /// Connection aborted locally or by the network.
    #[error("connection aborted")]
    ConnectionAborted,
    /// The in-flight operation was canceled (client went away).
    #[error("operation canceled")]
    Canceled,
    /// Write to an already-closed stream (client stopped reading).
    #[error("aborted write")]
    AbortedWrite,
    /// Stream ended before the announced body length arrived.
    #[error("upload interrupted")]
    UploadInterrupted,
    /// Request line/head could not be parsed (interrupted handshake, garbage).
    #[error("malformed request line")]
    InvalidRequestLine,
    /// Anything not in the benign set.
    #[error("unexpected transport fault")]
    Other,
}

impl FaultCode {
    /// Benign faults require no operator attention.
    pub const fn is_benign(self) -> bool {
        !matches!(self, FaultCode::Other)
    }
}

/// Classification result, consumed once by the top-level handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultRecord {
    pub code: FaultCode,
    pub benign: bool,
}

impl FaultRecord {
    fn of(code: FaultCode) -> Self {
        Self { code, benign: code.is_benign() }
    }
}

/// Classify an I/O error observed on the request path.
pub fn classify_io(err: &io::Error) -> FaultRecord {
    let code = match err.kind() {
        io::ErrorKind::ConnectionReset => FaultCode::ConnectionReset,
        io::ErrorKind::ConnectionAborted => FaultCode::ConnectionAborted,
        io::ErrorKind::BrokenPipe => FaultCode::AbortedWrite,
        io::ErrorKind::UnexpectedEof => FaultCode::UploadInterrupted,
        io::ErrorKind::InvalidData => FaultCode::InvalidRequestLine,
        _ if err.kind() == io::ErrorKind::Other && is_cancel(err) => FaultCode::Canceled,
        _ => FaultCode::Other,
    };
    FaultRecord::of(code)
}

/// Classify a body-collection failure. Axum erases the underlying I/O error,
/// so a failure while reading an announced body is treated as the client
/// disconnecting mid-upload unless the message says otherwise.
pub fn classify_body_error(message: &str) -> FaultRecord {
    let lower = message.to_ascii_lowercase();
    let code = if lower.contains("reset") {
        FaultCode::ConnectionReset
    } else if lower.contains("abort") {
        FaultCode::ConnectionAborted
    } else if lower.contains("parse") || lower.contains("invalid") {
        FaultCode::InvalidRequestLine
    } else {
        FaultCode::UploadInterrupted
    };
    FaultRecord::of(code)
}

fn is_cancel(err: &io::Error) -> bool {
    err.to_string().to_ascii_lowercase().contains("cancel")
}

/// Log a classified fault. Benign faults never reach error severity.
pub fn report(record: FaultRecord, detail: &dyn std::fmt::Display, context: &str) {
    if record.benign {
        tracing::debug!(code = %record.code, context, "benign transport fault: {detail}");
    } else {
        tracing::error!(code = %record.code, context, "unexpected fault: {detail}");
    }
}
