//! Logging facilities for Vellum.
//!
//! Vellum uses the `tracing` crate for instrumentation. To see logs, install
//! a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! Mutations log at `trace` level, full recomputations and resets at `debug`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "vellum_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "vellum_core::signal";
    /// Observable collection target.
    pub const COLLECTION: &str = "vellum::collection";
    /// Transform chain target.
    pub const TRANSFORM: &str = "vellum::transform";
    /// Renderer/pool/selection target.
    pub const VIEW: &str = "vellum::view";
}
