//! Transport-level concerns: fault classification for the request path.

pub mod fault;

pub use fault::{classify_body_error, classify_io, FaultCode, FaultRecord};
