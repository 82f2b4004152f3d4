//! Core systems for Vellum.
//!
//! This crate provides the foundation the collection-view crates build on:
//!
//! - **Signal/Slot System**: type-safe change notification with explicit
//!   observer lists and ordered, synchronous dispatch
//! - **Logging targets**: `tracing` target constants for per-subsystem
//!   filtering
//!
//! Vellum is a single-threaded, foreground-driven library: signals dispatch
//! synchronously on the emitting thread and there is no queued or
//! cross-thread delivery. Types are still `Send + Sync` so collections can
//! be shared behind `Arc`, but mutation is only safe from the foreground
//! scheduling context (see the `vellum` crate docs).
//!
//! # Signal/Slot Example
//!
//! ```
//! use vellum_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//!
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```

pub mod logging;
mod signal;

pub use signal::{ConnectionGuard, ConnectionId, Signal};
