//! The shipped stages, one module per stage.
//!
//! Registration order is decided by the bootstrap in `http::server`; each
//! rule of the ordering contract is noted on the stage it protects.

pub mod compression;
pub mod dispatch;
pub mod geo;
pub mod head;
pub mod hooks;
pub mod log;
pub mod params;
pub mod readiness;
pub mod roots;
pub mod security;
pub mod session;
pub mod throttle;

pub use compression::CompressionStage;
pub use dispatch::DispatchStage;
pub use geo::GeoStage;
pub use head::HeadStage;
pub use hooks::HooksStage;
pub use log::LogStage;
pub use params::ParamsStage;
pub use readiness::ReadinessStage;
pub use roots::RootsStage;
pub use security::SecurityStage;
pub use session::SessionStage;
pub use throttle::ThrottleStage;
