//! Readiness gates.
//!
//! Two gates guard the pipeline: a self-integrity check and certificate
//! provisioning. Both must be up before any business-logic stage runs; the
//! readiness stage fails closed with 503 otherwise. Gates are plain atomic
//! bools so background provisioning can flip them without coordination.

use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::schema::ServerConfig;

/// Process-wide readiness state.
#[derive(Debug)]
pub struct Readiness {
    self_check: AtomicBool,
    certificates: AtomicBool,
}

impl Readiness {
    /// Starts not ready; startup checks flip the gates.
    pub fn new() -> Self {
        Self { self_check: AtomicBool::new(false), certificates: AtomicBool::new(false) }
    }

    /// The single gate the pipeline consults.
    pub fn ready(&self) -> bool {
        self.self_check.load(Ordering::Acquire) && self.certificates.load(Ordering::Acquire)
    }

    pub fn set_self_check(&self, up: bool) {
        self.self_check.store(up, Ordering::Release);
    }

    pub fn set_certificates(&self, up: bool) {
        self.certificates.store(up, Ordering::Release);
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

/// Run startup checks and set the gates accordingly.
///
/// Self-check: every configured root must exist and be a directory.
/// Certificates: when TLS is configured, both PEM files must be present;
/// without TLS the gate is trivially up.
pub async fn run_startup_checks(config: &ServerConfig, readiness: &Readiness) {
    let mut roots_ok = true;
    for root in &config.roots {
        match tokio::fs::metadata(&root.path).await {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                tracing::error!(prefix = %root.prefix, path = %root.path.display(), "configured root is not a directory");
                roots_ok = false;
            }
        }
    }
    readiness.set_self_check(roots_ok);

    let certs_ok = match &config.listener.tls {
        None => true,
        Some(tls) => {
            let usable = certificate_material_usable(&tls.cert_path, &tls.key_path);
            if !usable {
                tracing::error!(
                    cert = %tls.cert_path,
                    key = %tls.key_path,
                    "TLS configured but certificate material is missing or unparseable"
                );
            }
            usable
        }
    };
    readiness.set_certificates(certs_ok);

    if readiness.ready() {
        tracing::info!("startup checks passed, serving");
    } else {
        tracing::warn!("startup checks failed, refusing requests until resolved");
    }
}

/// The certificate file must hold at least one parseable PEM certificate and
/// the key file must exist.
fn certificate_material_usable(cert_path: &str, key_path: &str) -> bool {
    if !Path::new(key_path).exists() {
        return false;
    }
    let Ok(file) = std::fs::File::open(cert_path) else {
        return false;
    };
    let mut reader = BufReader::new(file);
    let has_cert = rustls_pemfile::certs(&mut reader).any(|cert| cert.is_ok());
    has_cert
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RootConfig;

    #[test]
    fn both_gates_required() {
        let readiness = Readiness::new();
        assert!(!readiness.ready());

        readiness.set_self_check(true);
        assert!(!readiness.ready());

        readiness.set_certificates(true);
        assert!(readiness.ready());

        readiness.set_self_check(false);
        assert!(!readiness.ready());
    }

    #[tokio::test]
    async fn missing_root_fails_self_check() {
        let mut config = ServerConfig::default();
        config.roots.push(RootConfig {
            prefix: "/".into(),
            path: "/definitely/not/a/real/path".into(),
        });

        let readiness = Readiness::new();
        run_startup_checks(&config, &readiness).await;
        assert!(!readiness.ready());
    }

    #[tokio::test]
    async fn default_config_is_ready() {
        let readiness = Readiness::new();
        run_startup_checks(&ServerConfig::default(), &readiness).await;
        assert!(readiness.ready());
    }

    #[tokio::test]
    async fn missing_certificates_fail_the_provisioning_gate() {
        let mut config = ServerConfig::default();
        config.listener.tls = Some(crate::config::schema::TlsConfig {
            cert_path: "/no/such/cert.pem".into(),
            key_path: "/no/such/key.pem".into(),
        });

        let readiness = Readiness::new();
        run_startup_checks(&config, &readiness).await;
        assert!(!readiness.ready());
    }
}
