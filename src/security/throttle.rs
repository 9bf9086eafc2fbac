//! Rate limiting gate.
//!
//! Token bucket per client (authenticated username, else client IP) plus an
//! optional cap on requests being processed at once. Admission hands out a
//! drop-guard permit so that any unwind path, including a client
//! disconnecting mid-request, releases its slot.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

use crate::config::schema::ThrottleConfig;

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self { tokens: capacity, last_update: Instant::now() }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("rate limit exceeded")]
    RateExceeded,
    #[error("too many concurrent requests")]
    TooManyActive,
}

/// Outcome of an admission check.
pub enum Admission {
    Allowed(ThrottlePermit),
    Rejected(RejectReason),
}

/// Gate consulted by the throttle stage.
pub trait ThrottleGate: Send + Sync {
    fn admit(&self, client: IpAddr, identity: Option<&str>) -> Admission;
}

/// Token-bucket implementation with per-client buckets.
pub struct TokenBucketThrottle {
    buckets: DashMap<String, TokenBucket>,
    active: Arc<AtomicU64>,
    config: ThrottleConfig,
}

impl TokenBucketThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self { buckets: DashMap::new(), active: Arc::new(AtomicU64::new(0)), config }
    }

    /// Requests currently holding a permit.
    pub fn active_count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    fn grant(&self) -> Admission {
        self.active.fetch_add(1, Ordering::SeqCst);
        Admission::Allowed(ThrottlePermit { active: Arc::clone(&self.active) })
    }
}

impl ThrottleGate for TokenBucketThrottle {
    fn admit(&self, client: IpAddr, identity: Option<&str>) -> Admission {
        if !self.config.enabled {
            return self.grant();
        }

        if self.config.max_active > 0 && self.active.load(Ordering::SeqCst) >= self.config.max_active {
            return Admission::Rejected(RejectReason::TooManyActive);
        }

        // Authenticated clients share a bucket across addresses.
        let key = match identity {
            Some(name) => format!("user:{name}"),
            None => format!("ip:{client}"),
        };

        let burst = self.config.burst;
        let rate = self.config.requests_per_sec;
        let mut bucket = self.buckets.entry(key).or_insert_with(|| TokenBucket::new(burst));
        if bucket.try_acquire(burst, rate) {
            drop(bucket);
            self.grant()
        } else {
            Admission::Rejected(RejectReason::RateExceeded)
        }
    }
}

/// A granted admission slot. Dropping it releases the slot, which is what
/// ties throttle release to request completion and disconnect unwinding.
#[derive(Debug)]
pub struct ThrottlePermit {
    active: Arc<AtomicU64>,
}

impl Drop for ThrottlePermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool, rps: f64, burst: f64, max_active: u64) -> ThrottleConfig {
        ThrottleConfig { enabled, requests_per_sec: rps, burst, max_active }
    }

    fn ip() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    #[test]
    fn disabled_gate_admits_everything() {
        let gate = TokenBucketThrottle::new(config(false, 0.0, 0.0, 0));
        for _ in 0..100 {
            assert!(matches!(gate.admit(ip(), None), Admission::Allowed(_)));
        }
    }

    #[test]
    fn burst_is_bounded() {
        let gate = TokenBucketThrottle::new(config(true, 0.001, 3.0, 0));
        let mut permits = Vec::new();
        for _ in 0..3 {
            match gate.admit(ip(), None) {
                Admission::Allowed(p) => permits.push(p),
                Admission::Rejected(r) => panic!("rejected inside burst: {r}"),
            }
        }
        assert!(matches!(
            gate.admit(ip(), None),
            Admission::Rejected(RejectReason::RateExceeded)
        ));
    }

    #[test]
    fn permits_release_on_drop() {
        let gate = TokenBucketThrottle::new(config(false, 0.0, 0.0, 0));
        let permit = match gate.admit(ip(), None) {
            Admission::Allowed(p) => p,
            Admission::Rejected(_) => unreachable!(),
        };
        assert_eq!(gate.active_count(), 1);
        drop(permit);
        assert_eq!(gate.active_count(), 0);
    }

    #[test]
    fn max_active_caps_concurrency() {
        let gate = TokenBucketThrottle::new(config(true, 1000.0, 1000.0, 2));
        let _a = match gate.admit(ip(), None) {
            Admission::Allowed(p) => p,
            _ => unreachable!(),
        };
        let _b = match gate.admit(ip(), None) {
            Admission::Allowed(p) => p,
            _ => unreachable!(),
        };
        assert!(matches!(
            gate.admit(ip(), None),
            Admission::Rejected(RejectReason::TooManyActive)
        ));
    }

    #[test]
    fn identities_get_their_own_bucket() {
        let gate = TokenBucketThrottle::new(config(true, 0.001, 1.0, 0));
        let _anon = match gate.admit(ip(), None) {
            Admission::Allowed(p) => p,
            _ => unreachable!(),
        };
        // Anonymous bucket is dry, alice's is not.
        assert!(matches!(gate.admit(ip(), None), Admission::Rejected(_)));
        assert!(matches!(gate.admit(ip(), Some("alice")), Admission::Allowed(_)));
    }
}
