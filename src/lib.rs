//! filedock: a personal HTTP file-sharing server.
//!
//! Every inbound request flows through an ordered stage pipeline (session,
//! readiness, security, filtering, compression negotiation, parameter
//! decoding, HEAD handling, virtual roots, logging, throttling, extension
//! hooks) before terminal dispatch to the API or static content delivery.
//! Credential rotation uses SRP-6a: the server stores and transports only
//! `{salt, verifier}` pairs, never a password or anything derived from one
//! that could be replayed.

pub mod api;
pub mod auth;
pub mod config;
pub mod files;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pipeline;
pub mod plugins;
pub mod security;
pub mod sessions;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
