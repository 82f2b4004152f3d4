//! Index-based selection tracking with mutation remapping.

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use vellum_core::{ConnectionGuard, Signal};

use crate::collection::{ChangeEvent, ObservableCollection};

/// How many items may be selected at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// At most one selected index; selecting replaces the previous one.
    Single,
    /// Any number of selected indices.
    Multi,
}

/// Payload of the selection-changed signal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionChange {
    /// Indices that became selected, ascending.
    pub selected: Vec<usize>,
    /// Indices that stopped being selected, ascending.
    pub deselected: Vec<usize>,
}

/// Per-index flag value lookup for flags-enum-backed lists.
type FlagValues = Arc<dyn Fn(usize) -> u64 + Send + Sync>;

struct SelectionInner {
    mode: SelectionMode,
    indices: BTreeSet<usize>,
    flag_values: Option<FlagValues>,
}

/// Tracks selected indices into an output collection and remaps them
/// through collection mutations, so selection follows the items it refers
/// to.
///
/// Remapping rules:
/// - removal shifts greater indices down; a removed selected index is
///   dropped with a deselect notification
/// - insertion shifts indices at or after the insertion point up
/// - a move carries the selection along with the item
/// - a replace leaves the selection untouched (the slot still exists)
/// - a reset clears the whole selection (no remap across an unknown
///   transformation) with a deselect-all notification
///
/// Index shifts alone do not fire the changed signal; the selected *items*
/// did not change.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vellum::collection::ObservableCollection;
/// use vellum::view::{SelectionMode, SelectionState};
///
/// let names = Arc::new(ObservableCollection::from_items(vec!["a", "b", "c"]));
/// let selection = Arc::new(SelectionState::new(SelectionMode::Multi));
/// let _guard = selection.attach(&names);
///
/// selection.select(2);
/// names.remove_at(0).unwrap();
/// assert_eq!(selection.selected_indices(), vec![1]);
/// ```
pub struct SelectionState {
    inner: RwLock<SelectionInner>,
    changed: Signal<SelectionChange>,
}

impl SelectionState {
    /// Creates an empty selection.
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            inner: RwLock::new(SelectionInner {
                mode,
                indices: BTreeSet::new(),
                flag_values: None,
            }),
            changed: Signal::new(),
        }
    }

    /// Creates an empty selection with a per-index flag value lookup.
    ///
    /// In [`SelectionMode::Multi`], selecting an index whose flag value is
    /// zero is a no-op — zero is reserved as the "none" sentinel of
    /// flags-enum-backed lists. This is deliberate policy.
    pub fn with_flag_values<F>(mode: SelectionMode, flag_values: F) -> Self
    where
        F: Fn(usize) -> u64 + Send + Sync + 'static,
    {
        let state = Self::new(mode);
        state.inner.write().flag_values = Some(Arc::new(flag_values));
        state
    }

    /// The selection-changed signal.
    pub fn changed(&self) -> &Signal<SelectionChange> {
        &self.changed
    }

    /// The configured mode.
    pub fn mode(&self) -> SelectionMode {
        self.inner.read().mode
    }

    /// Selects `index`. Returns `false` if it was already selected or the
    /// flag-value policy rejected it. In single mode the previous selection
    /// is dropped in the same notification.
    pub fn select(&self, index: usize) -> bool {
        let mut change = SelectionChange::default();
        {
            let mut inner = self.inner.write();
            if inner.mode == SelectionMode::Multi {
                if let Some(flag_values) = &inner.flag_values {
                    if flag_values(index) == 0 {
                        return false;
                    }
                }
            }
            if inner.indices.contains(&index) {
                return false;
            }
            if inner.mode == SelectionMode::Single {
                change.deselected = inner.indices.iter().copied().collect();
                inner.indices.clear();
            }
            inner.indices.insert(index);
            change.selected.push(index);
        }
        self.emit(change);
        true
    }

    /// Deselects `index`. Returns `false` if it was not selected.
    pub fn deselect(&self, index: usize) -> bool {
        {
            let mut inner = self.inner.write();
            if !inner.indices.remove(&index) {
                return false;
            }
        }
        self.emit(SelectionChange {
            selected: Vec::new(),
            deselected: vec![index],
        });
        true
    }

    /// Flips the selection of `index`. Returns whether it is now selected.
    pub fn toggle(&self, index: usize) -> bool {
        if self.is_selected(index) {
            self.deselect(index);
            false
        } else {
            self.select(index)
        }
    }

    /// Clears the selection. Returns `false` if it was already empty.
    pub fn deselect_all(&self) -> bool {
        let mut change = SelectionChange::default();
        {
            let mut inner = self.inner.write();
            if inner.indices.is_empty() {
                return false;
            }
            change.deselected = inner.indices.iter().copied().collect();
            inner.indices.clear();
        }
        self.emit(change);
        true
    }

    /// Whether `index` is selected.
    pub fn is_selected(&self, index: usize) -> bool {
        self.inner.read().indices.contains(&index)
    }

    /// Selected indices, ascending.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.inner.read().indices.iter().copied().collect()
    }

    /// Number of selected indices.
    pub fn len(&self) -> usize {
        self.inner.read().indices.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.inner.read().indices.is_empty()
    }

    /// Remaps the selection through a collection mutation.
    ///
    /// Usually wired automatically via [`SelectionState::attach`]; exposed
    /// for hosts that fan events out themselves.
    pub fn apply(&self, event: &ChangeEvent) {
        let mut change = SelectionChange::default();
        {
            let mut inner = self.inner.write();
            match *event {
                ChangeEvent::Inserted { first, last } => {
                    let count = last - first + 1;
                    let remapped: BTreeSet<usize> = inner
                        .indices
                        .iter()
                        .map(|&i| if i >= first { i + count } else { i })
                        .collect();
                    inner.indices = remapped;
                }
                ChangeEvent::Removed { first, last } => {
                    let count = last - first + 1;
                    let mut remapped = BTreeSet::new();
                    for &i in &inner.indices {
                        if i < first {
                            remapped.insert(i);
                        } else if i <= last {
                            change.deselected.push(i);
                        } else {
                            remapped.insert(i - count);
                        }
                    }
                    inner.indices = remapped;
                }
                ChangeEvent::Replaced { .. } => {}
                ChangeEvent::Moved { from, to } => {
                    let remapped: BTreeSet<usize> = inner
                        .indices
                        .iter()
                        .map(|&i| {
                            if i == from {
                                to
                            } else {
                                // Simulate remove-at-from then insert-at-to.
                                let mut j = i;
                                if j > from {
                                    j -= 1;
                                }
                                if j >= to {
                                    j += 1;
                                }
                                j
                            }
                        })
                        .collect();
                    inner.indices = remapped;
                }
                ChangeEvent::Reset => {
                    change.deselected = inner.indices.iter().copied().collect();
                    inner.indices.clear();
                }
            }
        }
        self.emit(change);
    }

    /// Wires this selection to a collection's change signal. Dropping the
    /// returned guard (or this state) severs the wiring.
    pub fn attach<T: Send + Sync + 'static>(
        self: &Arc<Self>,
        collection: &ObservableCollection<T>,
    ) -> ConnectionGuard<ChangeEvent> {
        let weak = Arc::downgrade(self);
        collection.changed().connect_scoped(move |event| {
            if let Some(state) = Weak::upgrade(&weak) {
                state.apply(event);
            }
        })
    }

    fn emit(&self, change: SelectionChange) {
        if change.selected.is_empty() && change.deselected.is_empty() {
            return;
        }
        tracing::trace!(
            target: "vellum::view",
            selected = ?change.selected,
            deselected = ?change.deselected,
            "selection changed"
        );
        self.changed.emit(change);
    }
}
