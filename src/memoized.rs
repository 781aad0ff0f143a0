//! Memoized suppliers backed by a single monotonic slot.
//!
//! [`Memoized<V, F>`] captures a computation and exposes a plain "get the
//! value" contract: the first successful call computes and binds the value,
//! every later call returns the bound value. The computation may optionally be
//! started eagerly on a [`BackgroundRunner`] at construction time.

use core::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::cell::Monotonic;
use crate::error::NotBound;
use crate::runner::BackgroundRunner;

struct Shared<V, F> {
   slot: Monotonic<V>,
   compute: F,
}

/// A thread-safe, memoized supplier.
///
/// `F` is either an infallible `Fn() -> V`, read through [`get`](Self::get),
/// or a fallible `Fn() -> Result<V, E>`, read through [`try_get`](Self::try_get).
/// Either way the computation runs at most once at a time and never again
/// after it succeeds. A failed attempt is not retried on its own; the next
/// call computes again.
///
/// Clones share the same slot and computation.
///
/// # Examples
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use monotonic::Memoized;
///
/// static CALLS: AtomicUsize = AtomicUsize::new(0);
///
/// let memo = Memoized::new(|| {
///    CALLS.fetch_add(1, Ordering::Relaxed);
///    "expensive".to_string()
/// });
/// assert_eq!(memo.get(), "expensive");
/// assert_eq!(memo.get(), "expensive");
/// assert_eq!(CALLS.load(Ordering::Relaxed), 1);
/// ```
pub struct Memoized<V, F> {
   shared: Arc<Shared<V, F>>,
}

impl<V, F> Memoized<V, F> {
   /// Wraps `compute` without running it.
   #[inline]
   pub fn new(compute: F) -> Self {
      Self {
         shared: Arc::new(Shared {
            slot: Monotonic::new(),
            compute,
         }),
      }
   }

   /// Returns `true` once the value has been computed and bound.
   #[inline]
   pub fn is_computed(&self) -> bool {
      self.shared.slot.is_bound()
   }

   /// Returns the value if it has already been computed, without computing it.
   #[inline]
   pub fn peek(&self) -> Result<&V, NotBound> {
      self.shared.slot.get()
   }
}

impl<V, F> Memoized<V, F>
where
   F: Fn() -> V,
{
   /// Returns the value, computing it on first use.
   #[inline]
   pub fn get(&self) -> &V {
      let shared = &*self.shared;
      shared.slot.compute_if_absent(|| (shared.compute)())
   }
}

impl<V, F> Memoized<V, F>
where
   V: Send + Sync + 'static,
   F: Fn() -> V + Send + Sync + 'static,
{
   /// Wraps `compute` and immediately schedules it on `runner`.
   ///
   /// The background attempt races with foreground [`get`](Self::get) calls;
   /// whichever starts first computes, the others wait for it. A panic in the
   /// background attempt is contained and logged, and leaves the value for the
   /// next foreground call to compute.
   pub fn with_background<R>(compute: F, runner: &R) -> Self
   where
      R: BackgroundRunner + ?Sized,
   {
      let memo = Self::new(compute);
      let shared = Arc::clone(&memo.shared);
      runner.spawn(Box::new(move || {
         let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            shared.slot.compute_if_absent(|| (shared.compute)());
         }));
         match outcome {
            Ok(()) => tracing::debug!("background memoization bound its value"),
            Err(_) => tracing::warn!("background memoization panicked; value left unbound"),
         }
      }));
      memo
   }
}

impl<V, E, F> Memoized<V, F>
where
   F: Fn() -> Result<V, E>,
{
   /// Returns the value, computing it on first use.
   ///
   /// A failed computation returns its error to this caller and leaves the
   /// value unbound; the next call computes again.
   #[inline]
   pub fn try_get(&self) -> Result<&V, E> {
      let shared = &*self.shared;
      shared.slot.try_compute_if_absent(|| (shared.compute)())
   }
}

impl<V, E, F> Memoized<V, F>
where
   V: Send + Sync + 'static,
   E: fmt::Display,
   F: Fn() -> Result<V, E> + Send + Sync + 'static,
{
   /// Fallible flavor of [`with_background`](Self::with_background).
   ///
   /// An error from the background attempt is logged and dropped at the task
   /// boundary. It is never reported to foreground callers, who compute again.
   pub fn try_with_background<R>(compute: F, runner: &R) -> Self
   where
      R: BackgroundRunner + ?Sized,
   {
      let memo = Self::new(compute);
      let shared = Arc::clone(&memo.shared);
      runner.spawn(Box::new(move || {
         let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            shared
               .slot
               .try_compute_if_absent(|| (shared.compute)())
               .map(|_| ())
         }));
         match outcome {
            Ok(Ok(())) => tracing::debug!("background memoization bound its value"),
            Ok(Err(error)) => {
               tracing::warn!(%error, "background memoization failed; value left unbound")
            }
            Err(_) => tracing::warn!("background memoization panicked; value left unbound"),
         }
      }));
      memo
   }
}

impl<V, F> Clone for Memoized<V, F> {
   /// Returns a handle to the same memoized value.
   #[inline]
   fn clone(&self) -> Self {
      Self {
         shared: Arc::clone(&self.shared),
      }
   }
}

impl<V: fmt::Debug, F> fmt::Debug for Memoized<V, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Memoized")
         .field("value", &self.shared.slot)
         .finish_non_exhaustive()
   }
}
