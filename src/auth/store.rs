//! Durable credential storage.
//!
//! One verifier record per username. A password change replaces the record
//! atomically (temp file + rename); concurrent changes for the same identity
//! serialize on the store lock so exactly one write is in flight at a time.
//! Salts from earlier generations are remembered (bounded history) and a
//! submission that replays any of them is rejected.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::auth::srp::{VerifierRecord, SALT_LEN};
use crate::auth::AuthError;

/// How many retired salts are kept per identity to refuse replays.
const SALT_HISTORY_LIMIT: usize = 32;

/// The persisted form of a credential: hex salt, decimal verifier, and the
/// salts of earlier generations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub salt: String,
    pub verifier: String,
    #[serde(default)]
    pub past_salts: Vec<String>,
}

impl StoredCredential {
    fn knows_salt(&self, salt_hex: &str) -> bool {
        self.salt == salt_hex || self.past_salts.iter().any(|s| s == salt_hex)
    }
}

/// Contract the API dispatch depends on. Durable `get`/`put` with atomic
/// replacement and salt-reuse rejection.
pub trait CredentialStore: Send + Sync {
    fn get<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Option<StoredCredential>>;

    /// Replace the record for `username`. Fails with [`AuthError::SaltReused`]
    /// when the submitted salt matches the current or any remembered salt.
    fn put<'a>(
        &'a self,
        username: &'a str,
        record: &'a VerifierRecord,
    ) -> BoxFuture<'a, Result<(), AuthError>>;
}

/// JSON-file-backed store. The whole map lives in memory; writes rewrite the
/// file through a temp file and rename so readers never observe a torn record.
pub struct FileCredentialStore {
    path: PathBuf,
    state: Mutex<HashMap<String, StoredCredential>>,
}

impl FileCredentialStore {
    /// Open the store, loading existing records if the file is present.
    pub async fn open(path: &Path) -> Result<Self, AuthError> {
        let state = match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| AuthError::Storage(std::io::Error::other(e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(AuthError::Storage(e)),
        };
        Ok(Self { path: path.to_path_buf(), state: Mutex::new(state) })
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Create `username` with a freshly derived verifier unless it already
    /// exists. Used to seed accounts from configuration at startup.
    pub async fn seed(
        &self,
        params: &crate::auth::SrpParameters,
        username: &str,
        password: &str,
    ) -> Result<bool, AuthError> {
        {
            let state = self.state.lock().await;
            if state.contains_key(username) {
                return Ok(false);
            }
        }
        let record = crate::auth::derive_verifier(params, username, password);
        self.put_record(username, &record).await?;
        Ok(true)
    }

    async fn put_record(&self, username: &str, record: &VerifierRecord) -> Result<(), AuthError> {
        if record.salt.len() != SALT_LEN {
            return Err(AuthError::BadSalt);
        }
        let salt_hex = hex::encode(&record.salt);

        let mut state = self.state.lock().await;
        let next = match state.get(username) {
            Some(current) => {
                if current.knows_salt(&salt_hex) {
                    return Err(AuthError::SaltReused);
                }
                let mut past = current.past_salts.clone();
                past.push(current.salt.clone());
                if past.len() > SALT_HISTORY_LIMIT {
                    let excess = past.len() - SALT_HISTORY_LIMIT;
                    past.drain(..excess);
                }
                StoredCredential { salt: salt_hex, verifier: record.verifier.clone(), past_salts: past }
            }
            None => StoredCredential {
                salt: salt_hex,
                verifier: record.verifier.clone(),
                past_salts: Vec::new(),
            },
        };

        state.insert(username.to_string(), next);
        self.persist(&state).await
    }

    /// Write the full map through a temp file, then rename over the store.
    async fn persist(&self, state: &HashMap<String, StoredCredential>) -> Result<(), AuthError> {
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| AuthError::Storage(std::io::Error::other(e)))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(AuthError::Storage)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(AuthError::Storage)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Option<StoredCredential>> {
        Box::pin(async move { self.state.lock().await.get(username).cloned() })
    }

    fn put<'a>(
        &'a self,
        username: &'a str,
        record: &'a VerifierRecord,
    ) -> BoxFuture<'a, Result<(), AuthError>> {
        Box::pin(self.put_record(username, record))
    }
}
