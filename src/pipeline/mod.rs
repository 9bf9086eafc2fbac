//! The request-processing pipeline.
//!
//! Every inbound request flows through one [`chain::StageChain`] traversal:
//! a flat, strictly ordered sequence of stages sharing a single mutable
//! [`context::RequestContext`]. The bootstrap in `http::server` owns the
//! shipped order; its rationale lives with the individual stages.

pub mod chain;
pub mod context;
pub mod stages;

pub use chain::{ChainError, Stage, StageChain, StageFlow};
pub use context::{ContentEncoding, RequestContext};
