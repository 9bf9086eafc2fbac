//! Security collaborators consulted by the pipeline: address filtering,
//! rate limiting, request sanity checks.

pub mod geo;
pub mod limits;
pub mod throttle;

pub use geo::{GeoGate, GeoRules, IpPrefix, RuleGeoGate};
pub use throttle::{Admission, RejectReason, ThrottleGate, ThrottlePermit, TokenBucketThrottle};
