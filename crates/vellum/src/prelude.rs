//! Convenient re-exports of the most commonly used Vellum types.
//!
//! ```
//! use vellum::prelude::*;
//! ```

pub use crate::collection::{ChangeEvent, CollectionError, ObservableCollection, UpdateScope};
pub use crate::transform::{
    CollectionTransform, EmptyGroupPolicy, FilterTransform, GroupedEntry, GroupedTransform,
    LinearEntry, LinearGroupTransform,
};
pub use crate::view::{
    BindError, InstanceKey, ItemAdapter, RecyclingPool, RendererOptions, SelectionChange,
    SelectionMode, SelectionState, ViewError, VirtualizedRenderer, VisibleRange,
};
pub use vellum_core::{ConnectionGuard, ConnectionId, Signal};
