//! Signal/slot system for Vellum.
//!
//! Signals are explicit observer lists: a signal owns its connections, and
//! emitting invokes every connected slot synchronously, in order, on the
//! emitting thread. There is no queued or cross-thread dispatch; Vellum's
//! scheduling model is a single foreground tick.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - the signal type for emitting notifications
//! - [`ConnectionId`] - unique identifier returned when connecting a slot
//! - [`ConnectionGuard`] - RAII guard that disconnects when dropped
//!
//! # Re-entrancy
//!
//! The slot list is snapshotted before dispatch, so a slot may connect or
//! disconnect on the signal it is being invoked from. A connection added
//! during dispatch is first invoked on the next emit; a connection removed
//! during dispatch may still receive the in-flight emission.
//!
//! # Example
//!
//! ```
//! use vellum_core::Signal;
//!
//! let text_changed = Signal::<String>::new();
//!
//! let conn_id = text_changed.connect(|text| {
//!     println!("Text changed to: {}", text);
//! });
//!
//! text_changed.emit("Hello, World!".to_string());
//! text_changed.disconnect(conn_id);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via
    /// [`Signal::disconnect`]. Disconnecting an already-removed ID is a
    /// no-op that returns `false`, never an error.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;
type ConnectionTable<Args> = Mutex<SlotMap<ConnectionId, Slot<Args>>>;

/// A type-safe signal with an explicit list of connected slots.
///
/// When a signal is emitted, all connected slots are invoked synchronously
/// with a reference to the provided arguments, in connection order.
///
/// # Type Parameter
///
/// - `Args`: the argument type passed to connected slots. Use `()` for
///   signals with no arguments, or a tuple for multiple arguments. `Args`
///   must be `Clone + Send` so emissions can be forwarded and stored by
///   slots.
pub struct Signal<Args> {
    /// All active connections. Shared with [`ConnectionGuard`]s.
    connections: Arc<ConnectionTable<Args>>,
    /// Whether signal emission is temporarily blocked.
    blocked: AtomicBool,
}

impl<Args: Clone + Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Clone + Send + 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Arc::new(Mutex::new(SlotMap::with_key())),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// Returns a [`ConnectionId`] that can be used to disconnect the slot
    /// later.
    ///
    /// # Example
    ///
    /// ```
    /// use vellum_core::Signal;
    ///
    /// let signal = Signal::<String>::new();
    /// let id = signal.connect(|s| println!("Got: {}", s));
    /// signal.emit("Hello".to_string());
    /// ```
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Arc::new(slot))
    }

    /// Connect a slot with automatic disconnection when the guard is dropped.
    ///
    /// The guard shares ownership of the connection table, so it stays valid
    /// even if it outlives the signal (dropping it then is a no-op).
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard {
            connections: Arc::clone(&self.connections),
            id,
        }
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed, `false`
    /// otherwise. Removing a non-present connection is a no-op.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` do nothing. Used during batch
    /// updates to prevent cascading notifications.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking all connected slots synchronously.
    ///
    /// If the signal is blocked, this does nothing. The connection table is
    /// snapshotted before dispatch, so slots may connect/disconnect on this
    /// signal without deadlocking.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: "vellum_core::signal", "signal blocked, skipping emit");
            return;
        }

        let slots: Vec<Slot<Args>> = {
            let connections = self.connections.lock();
            connections.values().cloned().collect()
        };
        tracing::trace!(
            target: "vellum_core::signal",
            connection_count = slots.len(),
            "emitting signal"
        );

        for slot in slots {
            slot(&args);
        }
    }
}

/// A connection guard that automatically disconnects when dropped.
///
/// Created via [`Signal::connect_scoped`]. Useful for RAII-style connection
/// management, ensuring connections are cleaned up when the receiver goes
/// out of scope.
///
/// # Example
///
/// ```
/// use vellum_core::Signal;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI32, Ordering};
///
/// let signal = Signal::<i32>::new();
/// let counter = Arc::new(AtomicI32::new(0));
/// {
///     let counter_clone = counter.clone();
///     let _guard = signal.connect_scoped(move |&n| {
///         counter_clone.fetch_add(n, Ordering::SeqCst);
///     });
///     signal.emit(42); // counter = 42
/// }
/// signal.emit(43); // nothing happens, connection was dropped
/// assert_eq!(counter.load(Ordering::SeqCst), 42);
/// ```
pub struct ConnectionGuard<Args> {
    connections: Arc<ConnectionTable<Args>>,
    id: ConnectionId,
}

impl<Args> ConnectionGuard<Args> {
    /// The ID of the guarded connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        let _ = self.connections.lock().remove(self.id);
    }
}
