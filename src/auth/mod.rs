//! Accounts and the credential-rotation protocol.
//!
//! `srp` holds the zero-knowledge derivation, `store` the durable verifier
//! records, `panel` the interactive password-change flow that ties them
//! together from the user's side.

pub mod panel;
pub mod srp;
pub mod store;

use thiserror::Error;

pub use srp::{derive_verifier, verify_password, SrpParameters, VerifierRecord, SALT_LEN};
pub use store::{CredentialStore, FileCredentialStore, StoredCredential};

/// Authorization-level failures surfaced verbatim to the requesting user.
/// Storage details are never leaked through these messages.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("session expired")]
    SessionExpired,
    #[error("forbidden")]
    Forbidden,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("salt reuse rejected")]
    SaltReused,
    #[error("malformed salt")]
    BadSalt,
    #[error("the second password did not match the first")]
    Mismatch,
    #[error("cancelled")]
    Cancelled,
    #[error("credential storage failure")]
    Storage(#[source] std::io::Error),
    #[error("server rejected the request: {0}")]
    Rejected(String),
}
