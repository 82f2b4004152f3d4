//! Fixed-size block transform for grid layouts.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use vellum_core::ConnectionGuard;

use super::CollectionTransform;
use crate::collection::{ChangeEvent, ObservableCollection};

/// One row of a [`LinearGroupTransform`] output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinearEntry<T> {
    /// A real input item.
    Item(T),
    /// Tail filler keeping the last block at full width.
    Padding,
}

impl<T> LinearEntry<T> {
    /// Returns the item, if this is an item row.
    pub fn item(&self) -> Option<&T> {
        match self {
            LinearEntry::Item(item) => Some(item),
            LinearEntry::Padding => None,
        }
    }
}

struct LinearInner<T> {
    input: Mutex<Arc<ObservableCollection<T>>>,
    output: Mutex<Arc<ObservableCollection<LinearEntry<T>>>>,
    items_per_block: usize,
}

/// A transform that pads its input to whole blocks of `items_per_block`
/// entries (tiles per row in a grid).
///
/// The output is the input in order, followed by however many
/// [`LinearEntry::Padding`] rows bring the total to a multiple of the block
/// size. An empty input yields an empty output (zero blocks, no padding).
///
/// Appends at the input tail are spliced incrementally; interior mutations
/// recompute the output.
pub struct LinearGroupTransform<T> {
    inner: Arc<LinearInner<T>>,
    subscription: Mutex<Option<ConnectionGuard<ChangeEvent>>>,
}

impl<T: Clone + Send + Sync + 'static> LinearGroupTransform<T> {
    /// Creates a block transform over `input`. `items_per_block` of 0 is
    /// treated as 1 (no padding ever needed).
    pub fn new(input: Arc<ObservableCollection<T>>, items_per_block: usize) -> Self {
        let inner = Arc::new(LinearInner {
            input: Mutex::new(input),
            output: Mutex::new(Arc::new(ObservableCollection::new())),
            items_per_block: items_per_block.max(1),
        });
        Self::rebuild(&inner);
        let transform = Self {
            inner,
            subscription: Mutex::new(None),
        };
        transform.resubscribe();
        transform
    }

    /// The configured block size.
    pub fn items_per_block(&self) -> usize {
        self.inner.items_per_block
    }

    fn resubscribe(&self) {
        let weak = Arc::downgrade(&self.inner);
        let guard = self
            .inner
            .input
            .lock()
            .changed()
            .connect_scoped(move |event| {
                if let Some(inner) = Weak::upgrade(&weak) {
                    LinearGroupTransform::on_input_changed(&inner, event);
                }
            });
        *self.subscription.lock() = Some(guard);
    }

    fn on_input_changed(inner: &Arc<LinearInner<T>>, event: &ChangeEvent) {
        tracing::trace!(target: "vellum::transform", ?event, "block input changed");
        match *event {
            ChangeEvent::Inserted { first, last } => {
                let input = inner.input.lock().clone();
                let len = input.len();
                // Tail append: splice without disturbing earlier blocks.
                if last == len - 1 {
                    let appended: Vec<T> = input.items()[first..=last].to_vec();
                    Self::apply_appended(inner, first, appended);
                } else {
                    Self::rebuild(inner);
                }
            }
            ChangeEvent::Replaced { index } => {
                let input = inner.input.lock().clone();
                let output = inner.output.lock().clone();
                if let Some(item) = input.get(index) {
                    output
                        .replace(index, LinearEntry::Item(item))
                        .expect("block mapping out of sync with output");
                }
            }
            ChangeEvent::Removed { .. } | ChangeEvent::Moved { .. } | ChangeEvent::Reset => {
                Self::rebuild(inner)
            }
        }
    }

    fn apply_appended(inner: &Arc<LinearInner<T>>, first: usize, appended: Vec<T>) {
        let output = inner.output.lock().clone();
        let block = inner.items_per_block;

        // Drop the old tail padding, append the new items, re-pad.
        let old_padding = (block - first % block) % block;
        for _ in 0..old_padding {
            output
                .remove_at(output.len() - 1)
                .expect("block mapping out of sync with output");
        }
        for item in appended {
            output.push(LinearEntry::Item(item));
        }
        // Output now holds exactly the item rows; pad the tail block back up.
        let new_padding = (block - output.len() % block) % block;
        for _ in 0..new_padding {
            output.push(LinearEntry::Padding);
        }
    }

    fn rebuild(inner: &Arc<LinearInner<T>>) {
        let input = inner.input.lock().clone();
        let output = inner.output.lock().clone();
        let block = inner.items_per_block;

        let mut derived: Vec<LinearEntry<T>> = input
            .items()
            .iter()
            .cloned()
            .map(LinearEntry::Item)
            .collect();
        let padding = (block - derived.len() % block) % block;
        for _ in 0..padding {
            derived.push(LinearEntry::Padding);
        }
        tracing::debug!(
            target: "vellum::transform",
            rows = derived.len(),
            padding,
            "block transform rebuilt"
        );
        output.set_items(derived);
    }
}

impl<T: Clone + Send + Sync + 'static> CollectionTransform<T, LinearEntry<T>>
    for LinearGroupTransform<T>
{
    fn output(&self) -> Arc<ObservableCollection<LinearEntry<T>>> {
        self.inner.output.lock().clone()
    }

    fn set_input(&self, input: Arc<ObservableCollection<T>>) {
        *self.inner.input.lock() = input;
        self.resubscribe();
        Self::rebuild(&self.inner);
    }

    fn set_output(&self, output: Arc<ObservableCollection<LinearEntry<T>>>) {
        *self.inner.output.lock() = output;
        Self::rebuild(&self.inner);
    }

    fn refresh(&self) {
        Self::rebuild(&self.inner);
    }
}
