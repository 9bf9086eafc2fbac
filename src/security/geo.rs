//! Address filtering gate.
//!
//! The pipeline only needs `is_allowed(remote) -> bool`. The in-tree
//! implementation filters on configured IP prefixes; a geo-IP database
//! lookup plugs in behind the same trait.

use std::net::IpAddr;
use std::str::FromStr;

use arc_swap::ArcSwap;

use crate::config::schema::GeoConfig;

/// Decides whether a remote address may proceed past the filter stage.
pub trait GeoGate: Send + Sync {
    fn is_allowed(&self, remote: IpAddr) -> bool;
}

/// An exact IP or an `addr/len` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpPrefix {
    addr: IpAddr,
    len: u8,
}

impl IpPrefix {
    pub fn matches(&self, candidate: IpAddr) -> bool {
        match (self.addr, candidate) {
            (IpAddr::V4(p), IpAddr::V4(c)) => {
                prefix_matches(&p.octets(), &c.octets(), self.len)
            }
            (IpAddr::V6(p), IpAddr::V6(c)) => {
                prefix_matches(&p.octets(), &c.octets(), self.len)
            }
            _ => false,
        }
    }
}

fn prefix_matches(prefix: &[u8], candidate: &[u8], len: u8) -> bool {
    let full = usize::from(len / 8);
    let rem = len % 8;
    if prefix[..full] != candidate[..full] {
        return false;
    }
    if rem == 0 {
        return true;
    }
    let mask = !0u8 << (8 - rem);
    (prefix[full] & mask) == (candidate[full] & mask)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid IP prefix")]
pub struct BadPrefix;

impl FromStr for IpPrefix {
    type Err = BadPrefix;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            None => {
                let addr: IpAddr = s.parse().map_err(|_| BadPrefix)?;
                let len = if addr.is_ipv4() { 32 } else { 128 };
                Ok(Self { addr, len })
            }
            Some((addr, len)) => {
                let addr: IpAddr = addr.parse().map_err(|_| BadPrefix)?;
                let len: u8 = len.parse().map_err(|_| BadPrefix)?;
                let max = if addr.is_ipv4() { 32 } else { 128 };
                if len > max {
                    return Err(BadPrefix);
                }
                Ok(Self { addr, len })
            }
        }
    }
}

/// Compiled filter rules. `block` always rejects; a non-empty `allow` list
/// rejects everything it does not match.
#[derive(Debug, Default)]
pub struct GeoRules {
    enabled: bool,
    allow: Vec<IpPrefix>,
    block: Vec<IpPrefix>,
}

impl GeoRules {
    /// Compile from config, skipping unparseable entries (validation has
    /// already reported them).
    pub fn from_config(config: &GeoConfig) -> Self {
        let parse = |rules: &[String]| {
            rules.iter().filter_map(|r| r.parse::<IpPrefix>().ok()).collect::<Vec<_>>()
        };
        Self {
            enabled: config.enabled,
            allow: parse(&config.allow),
            block: parse(&config.block),
        }
    }

    fn check(&self, remote: IpAddr) -> bool {
        if !self.enabled {
            return true;
        }
        if self.block.iter().any(|p| p.matches(remote)) {
            return false;
        }
        if self.allow.is_empty() {
            return true;
        }
        self.allow.iter().any(|p| p.matches(remote))
    }
}

/// Hot-swappable rule set; the config reload path replaces the rules while
/// requests keep loading the current snapshot.
pub struct RuleGeoGate {
    rules: ArcSwap<GeoRules>,
}

impl RuleGeoGate {
    pub fn new(rules: GeoRules) -> Self {
        Self { rules: ArcSwap::from_pointee(rules) }
    }

    pub fn replace(&self, rules: GeoRules) {
        self.rules.store(std::sync::Arc::new(rules));
    }
}

impl GeoGate for RuleGeoGate {
    fn is_allowed(&self, remote: IpAddr) -> bool {
        self.rules.load().check(remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn prefix_parsing() {
        assert!("10.0.0.1".parse::<IpPrefix>().is_ok());
        assert!("10.0.0.0/24".parse::<IpPrefix>().is_ok());
        assert!("::1/128".parse::<IpPrefix>().is_ok());
        assert!("10.0.0.0/33".parse::<IpPrefix>().is_err());
        assert!("banana".parse::<IpPrefix>().is_err());
    }

    #[test]
    fn prefix_matching() {
        let p: IpPrefix = "10.1.0.0/16".parse().unwrap();
        assert!(p.matches(ip("10.1.2.3")));
        assert!(!p.matches(ip("10.2.0.1")));
        assert!(!p.matches(ip("::1")));

        let exact: IpPrefix = "192.168.0.7".parse().unwrap();
        assert!(exact.matches(ip("192.168.0.7")));
        assert!(!exact.matches(ip("192.168.0.8")));
    }

    #[test]
    fn disabled_rules_allow_everything() {
        let rules = GeoRules::from_config(&GeoConfig {
            enabled: false,
            allow: vec![],
            block: vec!["0.0.0.0/0".into()],
        });
        assert!(rules.check(ip("203.0.113.9")));
    }

    #[test]
    fn block_wins_over_allow() {
        let rules = GeoRules::from_config(&GeoConfig {
            enabled: true,
            allow: vec!["10.0.0.0/8".into()],
            block: vec!["10.5.0.0/16".into()],
        });
        assert!(rules.check(ip("10.1.1.1")));
        assert!(!rules.check(ip("10.5.1.1")));
        assert!(!rules.check(ip("192.168.1.1"))); // not in allow list
    }

    #[test]
    fn hot_replace_takes_effect() {
        let gate = RuleGeoGate::new(GeoRules::default());
        assert!(gate.is_allowed(ip("127.0.0.1")));

        gate.replace(GeoRules::from_config(&GeoConfig {
            enabled: true,
            allow: vec![],
            block: vec!["127.0.0.1".into()],
        }));
        assert!(!gate.is_allowed(ip("127.0.0.1")));
    }
}
