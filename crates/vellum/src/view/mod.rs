//! Virtualized view layer: instance recycling, visible-range rendering and
//! selection tracking.
//!
//! [`VirtualizedRenderer`] watches the final output collection of a
//! transform chain, computes the visible index range from scroll offset and
//! item extents, and keeps a [`RecyclingPool`] of visual instances bound to
//! exactly that range (plus a lookahead margin). The host supplies the
//! visual side through an [`ItemAdapter`]. [`SelectionState`] overlays
//! index-based selection, remapping itself through collection mutations.

mod pool;
mod renderer;
mod selection;

pub use pool::{InstanceKey, RecyclingPool};
pub use renderer::{
    ItemAdapter, RendererOptions, RendererSignals, VirtualizedRenderer, VisibleRange,
};
pub use selection::{SelectionChange, SelectionMode, SelectionState};

/// Result type alias for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;

/// Error type produced by a failing [`ItemAdapter::bind`] call.
pub type BindError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the renderer and pool.
///
/// These are caller contract violations, not recoverable conditions: the
/// renderer never swallows a bind failure, since suppressing it would
/// silently corrupt the visible window.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// The adapter failed to push data into an instance.
    #[error("failed to bind instance for row {index}")]
    Bind {
        index: usize,
        #[source]
        source: BindError,
    },
    /// The pool hit its configured instance cap.
    #[error("instance pool exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },
}
