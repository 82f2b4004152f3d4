//! Observable, change-batching collection.
//!
//! [`ObservableCollection<T>`] owns an ordered sequence of items and raises
//! one [`ChangeEvent`] per mutating operation. Mutations issued inside a
//! [`ObservableCollection::begin_update`] scope are applied immediately but
//! notified lazily: closing the outermost scope raises a single
//! [`ChangeEvent::Reset`] summarizing that the collection changed.
//!
//! The collection uses interior mutability so it can be shared as
//! `Arc<ObservableCollection<T>>` between a writer and any number of
//! downstream transforms and views. It is foreground-only: no internal
//! synchronization is provided for concurrent writers, and mutating from
//! anything but the single foreground scheduling context is undefined.

use parking_lot::{Mutex, RwLock};

use vellum_core::Signal;

/// Result type alias for collection operations.
pub type Result<T> = std::result::Result<T, CollectionError>;

/// Errors raised by collection mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    /// An index was outside the collection bounds.
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Describes a single structural change to an [`ObservableCollection`].
///
/// Events carry index ranges only; the collection is mutated *before* the
/// event fires, so consumers read the post-mutation contents. Ranges are
/// inclusive on both ends.
///
/// Consumers must treat [`ChangeEvent::Reset`] as "the collection is
/// entirely different, re-derive everything" - it is raised by
/// [`ObservableCollection::set_items`], [`ObservableCollection::clear`]
/// and at the close of a batch scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Items were inserted at `first..=last`.
    Inserted { first: usize, last: usize },
    /// Items formerly at `first..=last` were removed.
    Removed { first: usize, last: usize },
    /// The item at `index` was replaced in place.
    Replaced { index: usize },
    /// The item at `from` now lives at `to`.
    Moved { from: usize, to: usize },
    /// Resynchronize fully; no incremental description is available.
    Reset,
}

/// Tracks open batch scopes. `depth` is the nesting level of
/// `begin_update` scopes; `dirty` records whether any mutation happened
/// while a scope was open.
#[derive(Default)]
struct BatchState {
    depth: usize,
    dirty: bool,
}

/// A mutable ordered sequence of items with structured change notification.
///
/// # Example
///
/// ```
/// use vellum::collection::{ChangeEvent, ObservableCollection};
///
/// let names = ObservableCollection::from_items(vec!["Apple".to_string()]);
/// names.changed().connect(|event| {
///     println!("collection changed: {:?}", event);
/// });
/// names.push("Banana".to_string());
///
/// // Batch many mutations into a single Reset notification:
/// {
///     let _scope = names.begin_update();
///     names.push("Cherry".to_string());
///     names.remove_at(0).unwrap();
/// } // one ChangeEvent::Reset fires here
/// ```
///
/// # Contract
///
/// Every mutating operation, when no batch scope is open, synchronously
/// raises exactly one event matching its kind before returning. Inside a
/// scope, mutations apply immediately (readers see up-to-date state
/// mid-transaction) but dispatch is deferred to the outermost scope close.
pub struct ObservableCollection<T> {
    items: RwLock<Vec<T>>,
    changed: Signal<ChangeEvent>,
    batch: Mutex<BatchState>,
}

impl<T: Send + Sync + 'static> Default for ObservableCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> ObservableCollection<T> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::from_items(Vec::new())
    }

    /// Creates a collection seeded with `items`. No event fires.
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            changed: Signal::new(),
            batch: Mutex::new(BatchState::default()),
        }
    }

    /// The change notification signal.
    pub fn changed(&self) -> &Signal<ChangeEvent> {
        &self.changed
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns `true` if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Returns a read guard over the items.
    pub fn items(&self) -> impl std::ops::Deref<Target = Vec<T>> + '_ {
        self.items.read()
    }

    /// Appends an item to the end.
    pub fn push(&self, item: T) {
        let index = {
            let mut items = self.items.write();
            items.push(item);
            items.len() - 1
        };
        self.notify(ChangeEvent::Inserted {
            first: index,
            last: index,
        });
    }

    /// Inserts an item at `index`, shifting subsequent items right.
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        {
            let mut items = self.items.write();
            if index > items.len() {
                return Err(CollectionError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, item);
        }
        self.notify(ChangeEvent::Inserted {
            first: index,
            last: index,
        });
        Ok(())
    }

    /// Appends several items at once, raising a single `Inserted` event.
    pub fn extend(&self, new_items: Vec<T>) {
        if new_items.is_empty() {
            return;
        }
        let (first, last) = {
            let mut items = self.items.write();
            let first = items.len();
            items.extend(new_items);
            (first, items.len() - 1)
        };
        self.notify(ChangeEvent::Inserted { first, last });
    }

    /// Removes and returns the item at `index`.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        let removed = {
            let mut items = self.items.write();
            if index >= items.len() {
                return Err(CollectionError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            items.remove(index)
        };
        self.notify(ChangeEvent::Removed {
            first: index,
            last: index,
        });
        Ok(removed)
    }

    /// Replaces the item at `index`, returning the previous value.
    pub fn replace(&self, index: usize, item: T) -> Result<T> {
        let old = {
            let mut items = self.items.write();
            if index >= items.len() {
                return Err(CollectionError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                });
            }
            std::mem::replace(&mut items[index], item)
        };
        self.notify(ChangeEvent::Replaced { index });
        Ok(old)
    }

    /// Moves the item at `from` so it ends up at index `to`.
    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        {
            let mut items = self.items.write();
            let len = items.len();
            if from >= len {
                return Err(CollectionError::IndexOutOfBounds { index: from, len });
            }
            if to >= len {
                return Err(CollectionError::IndexOutOfBounds { index: to, len });
            }
            if from != to {
                let item = items.remove(from);
                items.insert(to, item);
            }
        }
        if from != to {
            self.notify(ChangeEvent::Moved { from, to });
        }
        Ok(())
    }

    /// Removes all items. Raises `Reset`.
    pub fn clear(&self) {
        self.items.write().clear();
        self.notify(ChangeEvent::Reset);
    }

    /// Replaces the entire contents. Raises `Reset`.
    pub fn set_items(&self, items: Vec<T>) {
        *self.items.write() = items;
        self.notify(ChangeEvent::Reset);
    }

    /// Opens a batch scope.
    ///
    /// Scopes are reference-counted: nested `begin_update` calls are
    /// cheap, and only dropping the outermost scope dispatches the
    /// deferred notification - exactly one `Reset`, and only if a
    /// mutation actually happened inside the scope.
    pub fn begin_update(&self) -> UpdateScope<'_, T> {
        self.batch.lock().depth += 1;
        UpdateScope { collection: self }
    }

    /// Dispatches `event`, or marks the open batch dirty instead.
    fn notify(&self, event: ChangeEvent) {
        {
            let mut batch = self.batch.lock();
            if batch.depth > 0 {
                batch.dirty = true;
                return;
            }
        }
        tracing::trace!(target: "vellum::collection", ?event, "collection changed");
        self.changed.emit(event);
    }
}

impl<T: Clone + Send + Sync + 'static> ObservableCollection<T> {
    /// Returns a clone of the item at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.read().get(index).cloned()
    }

    /// Returns a clone of the current contents.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.read().clone()
    }
}

/// An open batch transaction on an [`ObservableCollection`].
///
/// Dropping the outermost scope emits a single [`ChangeEvent::Reset`] if
/// any mutation happened inside.
#[must_use = "mutations are only batched while the scope is alive"]
pub struct UpdateScope<'a, T> {
    collection: &'a ObservableCollection<T>,
}

impl<T> Drop for UpdateScope<'_, T> {
    fn drop(&mut self) {
        let fire = {
            let mut batch = self.collection.batch.lock();
            batch.depth -= 1;
            if batch.depth == 0 && batch.dirty {
                batch.dirty = false;
                true
            } else {
                false
            }
        };
        if fire {
            tracing::debug!(target: "vellum::collection", "batch scope closed, emitting reset");
            self.collection.changed.emit(ChangeEvent::Reset);
        }
    }
}
