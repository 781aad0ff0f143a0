//! Thread-safe, bind-once values and the structures built from them.
//!
//! The core type is [`Monotonic<V>`]: a slot that starts empty and can be
//! bound exactly once. Once bound, its value never changes and is visible to
//! every thread. On top of it this crate provides:
//!
//! - [`Memoized<V, F>`]: a memoized supplier around one slot and a captured
//!   computation, optionally populated eagerly on a [`BackgroundRunner`].
//! - [`MonotonicList<V>`]: a fixed-length list of independent slots.
//! - [`LazyList<V, F>`]: a fixed-length list of values computed per index.
//! - [`MonotonicMap<K, V>`]: a fixed key set with one independent slot per key.
//!
//! All of them share one synchronization scheme: a single atomic byte per slot
//! with `parking_lot`'s futex-based parking for the rare contended case.
//!
//! # Features
//!
//! - **Lock-free reads**: reading a bound value is one atomic load.
//! - **Compute once under contention**: concurrent `compute_if_absent` calls on
//!   one slot run a single computation; the others wait for its result.
//! - **Failure leaves no trace**: a failed or panicking computation leaves the
//!   slot empty, and the next caller computes again.
//! - **No cross-slot locking**: lists and maps never block one slot on another.
//! - **Async support**: `compute_if_absent_async` and friends, with tokio-aware
//!   waiting under the `async-tokio` / `async-tokio-mt` features.
//!
//! # Examples
//!
//! ## Binding
//!
//! ```rust
//! use monotonic::Monotonic;
//!
//! static ENDPOINT: Monotonic<String> = Monotonic::new();
//!
//! assert!(ENDPOINT.get().is_err());
//! ENDPOINT.bind("https://example.org".to_string()).unwrap();
//! assert!(ENDPOINT.bind("ignored".to_string()).is_err());
//! assert_eq!(ENDPOINT.get().unwrap(), "https://example.org");
//! ```
//!
//! ## Computing on demand
//!
//! ```rust
//! use monotonic::Monotonic;
//!
//! let cell: Monotonic<i32> = Monotonic::new();
//! assert_eq!(cell.try_compute_if_absent(|| Err("not yet")), Err("not yet"));
//! assert!(!cell.is_bound());
//! assert_eq!(cell.compute_if_absent(|| 7), &7);
//! ```

/// The bind-once slot.
mod cell;

/// Error types.
mod error;

/// Fixed-length slot lists.
mod list;

/// Fixed key-set slot maps.
mod map;

/// Memoized suppliers.
mod memoized;

/// Background execution.
mod runner;

/// Internal synchronization state management.
mod state;

pub use cell::Monotonic;
pub use error::{AlreadyBound, IndexOutOfRange, NotBound, SlotError, UnknownKey};
pub use list::{LazyList, MonotonicList};
pub use map::MonotonicMap;
pub use memoized::Memoized;
#[cfg(feature = "async-tokio")]
pub use runner::TokioRunner;
pub use runner::{BackgroundRunner, Task, ThreadRunner};
