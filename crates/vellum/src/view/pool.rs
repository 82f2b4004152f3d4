//! Reusable visual-instance pool.

use std::collections::BTreeMap;

use slotmap::{SlotMap, new_key_type};

use super::ViewError;

new_key_type! {
    /// Stable handle to a pooled instance. Keys stay valid until the
    /// instance is destroyed by [`RecyclingPool::shrink_to`].
    pub struct InstanceKey;
}

/// Per-instance binding state. The only transitions are
/// `Free -> Bound -> Free`; destruction happens from `Free` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    Bound(usize),
}

struct Entry<I> {
    instance: I,
    state: SlotState,
    pinned: bool,
}

/// A pool of reusable visual instances, mapping logical data index to
/// instance.
///
/// Instances are created lazily when the pool has no free instance for a
/// growing visible range, returned to a free list when their index leaves
/// the range, and destroyed only by an explicit [`RecyclingPool::shrink_to`]
/// call. The free list is LIFO, so the most recently released instance is
/// reused first.
///
/// A pinned instance is exempt from recycling: [`RecyclingPool::release`]
/// leaves it bound, free pinned instances are never handed out by
/// [`RecyclingPool::acquire`], and `shrink_to` never destroys it. Pinning
/// never blocks other pool operations.
pub struct RecyclingPool<I> {
    slots: SlotMap<InstanceKey, Entry<I>>,
    /// Keys of free, unpinned instances, most recently released last.
    free: Vec<InstanceKey>,
    by_index: BTreeMap<usize, InstanceKey>,
    max_instances: Option<usize>,
    created: usize,
    destroyed: usize,
}

impl<I> RecyclingPool<I> {
    /// Creates an empty pool. With `max_instances` set, acquiring beyond
    /// the cap fails with [`ViewError::PoolExhausted`].
    pub fn new(max_instances: Option<usize>) -> Self {
        Self {
            slots: SlotMap::with_key(),
            free: Vec::new(),
            by_index: BTreeMap::new(),
            max_instances,
            created: 0,
            destroyed: 0,
        }
    }

    /// Takes a free instance, creating one with `create` if the free list
    /// is empty.
    pub fn acquire(&mut self, create: impl FnOnce() -> I) -> Result<InstanceKey, ViewError> {
        if let Some(key) = self.free.pop() {
            return Ok(key);
        }
        if let Some(max) = self.max_instances {
            if self.slots.len() >= max {
                return Err(ViewError::PoolExhausted { capacity: max });
            }
        }
        self.created += 1;
        let key = self.slots.insert(Entry {
            instance: create(),
            state: SlotState::Free,
            pinned: false,
        });
        tracing::trace!(
            target: "vellum::view",
            live = self.slots.len(),
            "pool instance created"
        );
        Ok(key)
    }

    /// Records `key` as bound to data index `index`.
    pub fn mark_bound(&mut self, key: InstanceKey, index: usize) {
        if let Some(entry) = self.slots.get_mut(key) {
            if let SlotState::Bound(old) = entry.state {
                self.by_index.remove(&old);
            }
            entry.state = SlotState::Bound(index);
            let previous = self.by_index.insert(index, key);
            debug_assert!(
                previous.is_none() || previous == Some(key),
                "two instances bound to one index"
            );
        }
    }

    /// Unbinds `key` and returns it to the free list.
    ///
    /// Returns `false` (and leaves the binding intact) if the instance is
    /// pinned or already free.
    pub fn release(&mut self, key: InstanceKey) -> bool {
        let Some(entry) = self.slots.get_mut(key) else {
            return false;
        };
        if entry.pinned {
            return false;
        }
        let SlotState::Bound(index) = entry.state else {
            return false;
        };
        entry.state = SlotState::Free;
        self.by_index.remove(&index);
        self.free.push(key);
        true
    }

    /// Releases every bound, unpinned instance.
    pub fn release_all(&mut self) {
        let bound: Vec<InstanceKey> = self.by_index.values().copied().collect();
        for key in bound {
            self.release(key);
        }
    }

    /// The key bound to data index `index`, if any.
    pub fn key_for_index(&self, index: usize) -> Option<InstanceKey> {
        self.by_index.get(&index).copied()
    }

    /// The data index `key` is bound to, if any.
    pub fn index_of(&self, key: InstanceKey) -> Option<usize> {
        match self.slots.get(key)?.state {
            SlotState::Bound(index) => Some(index),
            SlotState::Free => None,
        }
    }

    /// Shared access to an instance.
    pub fn get(&self, key: InstanceKey) -> Option<&I> {
        self.slots.get(key).map(|e| &e.instance)
    }

    /// Exclusive access to an instance.
    pub fn get_mut(&mut self, key: InstanceKey) -> Option<&mut I> {
        self.slots.get_mut(key).map(|e| &mut e.instance)
    }

    /// Marks an instance as exempt from recycling and shrinking.
    /// Returns `false` for an unknown key.
    pub fn set_pinned(&mut self, key: InstanceKey, pinned: bool) -> bool {
        let Some(entry) = self.slots.get_mut(key) else {
            return false;
        };
        if entry.pinned == pinned {
            return true;
        }
        entry.pinned = pinned;
        // The free list holds unpinned instances only, so a free instance
        // moves off it when pinned and back on when unpinned.
        if entry.state == SlotState::Free {
            if pinned {
                self.free.retain(|&k| k != key);
            } else {
                self.free.push(key);
            }
        }
        true
    }

    /// Whether an instance is pinned.
    pub fn is_pinned(&self, key: InstanceKey) -> bool {
        self.slots.get(key).is_some_and(|e| e.pinned)
    }

    /// Destroys free, unpinned instances until at most `target_live`
    /// instances remain. Bound and pinned instances are never destroyed.
    pub fn shrink_to(&mut self, target_live: usize) {
        while self.slots.len() > target_live {
            let Some(key) = self.free.pop() else {
                break;
            };
            self.slots.remove(key);
            self.destroyed += 1;
        }
        tracing::debug!(
            target: "vellum::view",
            live = self.slots.len(),
            destroyed = self.destroyed,
            "pool shrunk"
        );
    }

    /// Number of live (bound + free) instances.
    pub fn live_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of free instances awaiting reuse.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of bound instances.
    pub fn bound_count(&self) -> usize {
        self.by_index.len()
    }

    /// Total instances ever created.
    pub fn created_count(&self) -> usize {
        self.created
    }

    /// Total instances ever destroyed.
    pub fn destroyed_count(&self) -> usize {
        self.destroyed
    }

    /// Currently bound data indices, ascending.
    pub fn bound_indices(&self) -> Vec<usize> {
        self.by_index.keys().copied().collect()
    }
}
