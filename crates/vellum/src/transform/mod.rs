//! Collection transforms.
//!
//! A transform consumes one [`ObservableCollection`] as input, maintains its
//! own [`ObservableCollection`] as output, and keeps the output consistent
//! with the input under every mutation kind. Transforms chain: the output of
//! one is a perfectly good input for the next, so `raw data -> filter ->
//! grouping -> renderer` is just three subscriptions.
//!
//! Incremental maintenance is best-effort: cheap mutations (insert, remove,
//! replace) are spliced into the output directly; structural mutations
//! (`Moved`, `Reset`) fall back to a full [`CollectionTransform::refresh`],
//! which emits a single `Reset` on the output. Either way the contract is
//! *eventual consistency*: once the input settles, the output equals the
//! derivation recomputed from scratch.
//!
//! Transforms hold their input subscription through a weak back-reference,
//! so dropping a transform severs the chain; the input keeps emitting but
//! nobody listens.

use std::sync::Arc;

use crate::collection::ObservableCollection;

mod filter;
mod grouped;
mod linear;

pub use filter::{FilterTransform, Predicate};
pub use grouped::{
    Classifier, EmptyGroupPolicy, GroupCompare, GroupedEntry, GroupedTransform, ItemCompare,
};
pub use linear::{LinearEntry, LinearGroupTransform};

/// A derivation from one observable collection into another.
///
/// `T` is the input element type, `U` the output element type. All methods
/// take `&self`; implementations use interior mutability so a transform can
/// be shared behind an `Arc` and driven from signal slots.
pub trait CollectionTransform<T, U>: Send + Sync {
    /// The derived output collection.
    ///
    /// Downstream consumers subscribe to this collection's change signal;
    /// they never need to know a transform sits behind it.
    fn output(&self) -> Arc<ObservableCollection<U>>;

    /// Swaps the input collection.
    ///
    /// Unsubscribes from the previous input, subscribes to `input`, and
    /// performs a full refresh.
    fn set_input(&self, input: Arc<ObservableCollection<T>>);

    /// Redirects the derivation into a pre-existing collection.
    ///
    /// `output` is immediately repopulated with the current derivation
    /// (one `Reset` fires on it). Useful for splicing a transform into an
    /// already-wired pipeline.
    fn set_output(&self, output: Arc<ObservableCollection<U>>);

    /// Recomputes the output from scratch.
    ///
    /// Call this when state captured by the transform's closures (predicate,
    /// classifier, comparators) has changed in a way the transform cannot
    /// observe. Emits a single `Reset` on the output.
    fn refresh(&self);
}
