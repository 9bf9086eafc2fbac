//! Self-integrity and provisioning gates consulted before business logic.

pub mod readiness;

pub use readiness::{run_startup_checks, Readiness};
