//! HTTP transport: the axum wiring and shared response helpers.

pub mod reply;
pub mod server;

pub use server::{assemble_chain, BootError, HttpServer};
