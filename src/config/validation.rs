//! Configuration validation.
//!
//! Semantic checks on top of what serde already guarantees. All errors are
//! collected and reported together, not just the first.

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::security::geo::IpPrefix;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a valid socket address")]
    BadBindAddress(String),
    #[error("root prefix {0:?} must start with '/'")]
    BadRootPrefix(String),
    #[error("root prefix {0:?} is declared twice")]
    DuplicateRootPrefix(String),
    #[error("geo rule {0:?} is not an IP address or prefix")]
    BadGeoRule(String),
    #[error("throttle.requests_per_sec must be positive when throttling is enabled")]
    BadThrottleRate,
    #[error("throttle.burst must be at least 1 when throttling is enabled")]
    BadThrottleBurst,
    #[error("api.prefix {0:?} must start with '/' and not end with '/'")]
    BadApiPrefix(String),
    #[error("accounts.session_ttl_secs must be positive")]
    BadSessionTtl,
    #[error("seed account {0:?} has an empty password")]
    EmptySeedPassword(String),
}

/// Validate a parsed configuration. Pure: no filesystem or network access.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::BadBindAddress(config.listener.bind_address.clone()));
    }

    let mut seen = std::collections::HashSet::new();
    for root in &config.roots {
        if !root.prefix.starts_with('/') {
            errors.push(ValidationError::BadRootPrefix(root.prefix.clone()));
        }
        if !seen.insert(root.prefix.as_str()) {
            errors.push(ValidationError::DuplicateRootPrefix(root.prefix.clone()));
        }
    }

    for rule in config.geo.allow.iter().chain(&config.geo.block) {
        if rule.parse::<IpPrefix>().is_err() {
            errors.push(ValidationError::BadGeoRule(rule.clone()));
        }
    }

    if config.throttle.enabled {
        if config.throttle.requests_per_sec <= 0.0 {
            errors.push(ValidationError::BadThrottleRate);
        }
        if config.throttle.burst < 1.0 {
            errors.push(ValidationError::BadThrottleBurst);
        }
    }

    if !config.api.prefix.starts_with('/') || config.api.prefix.ends_with('/') {
        errors.push(ValidationError::BadApiPrefix(config.api.prefix.clone()));
    }

    if config.accounts.session_ttl_secs == 0 {
        errors.push(ValidationError::BadSessionTtl);
    }
    for account in &config.accounts.seed {
        if account.password.is_empty() {
            errors.push(ValidationError::EmptySeedPassword(account.username.clone()));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{RootConfig, SeedAccount};

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.api.prefix = "api/".into();
        config.accounts.session_ttl_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn rejects_duplicate_root_prefixes() {
        let mut config = ServerConfig::default();
        config.roots.push(RootConfig { prefix: "/a".into(), path: "/tmp/a".into() });
        config.roots.push(RootConfig { prefix: "/a".into(), path: "/tmp/b".into() });
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateRootPrefix("/a".into())));
    }

    #[test]
    fn rejects_bad_geo_rule() {
        let mut config = ServerConfig::default();
        config.geo.block.push("10.0.0.0/severe".into());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_empty_seed_password() {
        let mut config = ServerConfig::default();
        config.accounts.seed.push(SeedAccount { username: "alice".into(), password: String::new() });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::EmptySeedPassword("alice".into())]);
    }
}
