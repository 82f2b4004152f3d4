//! Vellum - virtualized collection views for interactive UIs.
//!
//! Vellum maps a logical (possibly huge) data collection onto a small pool
//! of reusable visual instances. It is the *data and recycling* engine of a
//! widget toolkit: actual pixel layout, animation, input handling and
//! theming are external collaborators that consume this crate through
//! narrow interfaces.
//!
//! # Components
//!
//! - [`collection::ObservableCollection`] - a mutable ordered sequence that
//!   raises structured change notifications and supports batched
//!   transactions coalescing many notifications into one
//! - [`transform`] - composable layers ([`transform::FilterTransform`],
//!   [`transform::GroupedTransform`], [`transform::LinearGroupTransform`])
//!   that each consume one observable collection and keep an output
//!   collection consistent with it under every mutation kind
//! - [`view::VirtualizedRenderer`] + [`view::RecyclingPool`] - bind the
//!   visible slice of the final output to pooled instances via an
//!   [`view::ItemAdapter`]
//! - [`view::SelectionState`] - tracks selected indices and remaps them
//!   through collection mutations
//!
//! # Data flow
//!
//! ```text
//! raw data -> (Filter / Grouped / LinearGroup chain) -> VirtualizedRenderer
//!                 each exposes an ObservableCollection      |
//!                                                    RecyclingPool binds
//!                                                    the visible slice
//! ```
//!
//! # Threading
//!
//! The whole crate is foreground-only: structures provide no internal
//! locking guarantees beyond shared read access, and are only safe to
//! mutate from the single foreground scheduling context (the host's frame
//! tick). Background work must marshal results onto the foreground before
//! touching any collection, pool or selection. The design assumes a single
//! writer and any number of readers per collection within a frame.

pub mod collection;
pub mod prelude;
pub mod transform;
pub mod view;

pub use vellum_core::{ConnectionGuard, ConnectionId, Signal, logging};
