//! The bind-once value primitive.
//!
//! This module provides [`Monotonic<V>`], a thread-safe slot that starts empty
//! and can be bound exactly once. After the bind the value is immutable and
//! visible to every thread that observes the slot as bound.
//!
//! Values are bound either directly ([`bind`](Monotonic::bind),
//! [`bind_if_absent`](Monotonic::bind_if_absent)) or derived on demand
//! ([`compute_if_absent`](Monotonic::compute_if_absent) and its fallible and
//! async siblings). Reading a bound value is a single atomic load.

use core::cell::UnsafeCell;
use core::future::Future;
use core::{fmt, mem};

use crate::error::{AlreadyBound, NotBound};
use crate::state::BindState;

/// A thread-safe value that can be bound at most once.
///
/// The state only ever moves from empty to bound. Concurrent binders agree on
/// a single winner, and a computation passed to
/// [`compute_if_absent`](Self::compute_if_absent) runs at most once at a time
/// per slot, and never again once it succeeds.
///
/// Binding `None` into a `Monotonic<Option<T>>` is a legal bind, distinct from
/// the slot being empty.
///
/// # Examples
///
/// ```rust
/// use monotonic::{AlreadyBound, Monotonic};
///
/// let answer = Monotonic::new();
/// assert!(answer.get().is_err());
///
/// answer.bind(42).unwrap();
/// assert_eq!(answer.get(), Ok(&42));
/// assert_eq!(answer.bind(13), Err(AlreadyBound(13)));
/// assert_eq!(answer.get(), Ok(&42));
/// ```
pub struct Monotonic<V> {
   value: UnsafeCell<mem::MaybeUninit<V>>,
   state: BindState,
}

impl<V> Monotonic<V> {
   /// Creates a new, empty slot.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         state: BindState::new(),
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
      }
   }

   /// Creates a slot that is already bound to `value`.
   #[inline]
   #[must_use]
   pub const fn bound(value: V) -> Self {
      Self {
         state: BindState::bound(),
         value: UnsafeCell::new(mem::MaybeUninit::new(value)),
      }
   }

   /// Returns `true` if a value is bound.
   ///
   /// This method never blocks. A computation that is still in flight does not
   /// count as bound.
   #[inline]
   pub fn is_bound(&self) -> bool {
      self.state.is_bound()
   }

   /// Returns the bound value, or [`NotBound`] if the slot is empty.
   ///
   /// This method never blocks.
   #[inline]
   pub fn get(&self) -> Result<&V, NotBound> {
      if self.is_bound() {
         // SAFETY: the Acquire load in is_bound() saw BOUND.
         Ok(unsafe { self.get_unchecked() })
      } else {
         Err(NotBound)
      }
   }

   /// Returns a reference to the value without checking that it is bound.
   ///
   /// # Safety
   ///
   /// The caller must have observed the slot as bound, e.g. through
   /// [`is_bound`](Self::is_bound) returning `true`.
   #[inline]
   pub unsafe fn get_unchecked(&self) -> &V {
      debug_assert!(self.is_bound(), "get_unchecked called on an unbound Monotonic");
      // SAFETY: bound values are never written again.
      unsafe { (*self.value.get()).assume_init_ref() }
   }

   /// Binds `value`, failing if a value is already present.
   ///
   /// The existing value is never overwritten, not even with an equal value;
   /// the rejected value is handed back inside [`AlreadyBound`]. This call does
   /// not wait for an in-flight [`compute_if_absent`](Self::compute_if_absent):
   /// if it wins, the computing caller will observe this value instead.
   #[inline]
   pub fn bind(&self, value: V) -> Result<(), AlreadyBound<V>> {
      let Some(guard) = self.state.lock_write() else {
         return Err(AlreadyBound(value));
      };
      // SAFETY: WRITING is held and the slot is unbound, so nobody reads or writes the value.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
      Ok(())
   }

   /// Binds `value` if the slot is empty and returns the winning value.
   ///
   /// The winner is `value` if this call performed the bind, otherwise the value
   /// bound earlier or by a concurrent binder. Never fails.
   #[inline]
   pub fn bind_if_absent(&self, value: V) -> &V {
      if let Some(guard) = self.state.lock_write() {
         // SAFETY: see `bind`.
         unsafe { (*self.value.get()).write(value) };
         guard.commit();
      }
      // SAFETY: lock_write() only returns None once the slot is bound, and a
      // committed guard has just bound it.
      unsafe { self.get_unchecked() }
   }

   /// Returns the bound value, computing and binding it with `f` if absent.
   ///
   /// Concurrent callers on the same slot serialize: only one runs its `f`,
   /// the others wait and then return the bound value. If `f` panics the slot
   /// stays empty and the next waiter gets its turn.
   ///
   /// Calling `compute_if_absent` on the same slot from inside `f` deadlocks.
   #[inline]
   pub fn compute_if_absent<F>(&self, f: F) -> &V
   where
      F: FnOnce() -> V,
   {
      if let Ok(value) = self.get() {
         return value;
      }
      self.compute(f);
      // SAFETY: compute() only returns once the slot is bound.
      unsafe { self.get_unchecked() }
   }

   /// Fallible flavor of [`compute_if_absent`](Self::compute_if_absent).
   ///
   /// - If bound, returns `Ok(&value)` without calling `f`.
   /// - Otherwise calls `f()`:
   ///     - On `Ok(value)`, binds it and returns the bound value.
   ///     - On `Err(e)`, returns `Err(e)` and leaves the slot empty, so a later
   ///       call may try again.
   pub fn try_compute_if_absent<F, E>(&self, f: F) -> Result<&V, E>
   where
      F: FnOnce() -> Result<V, E>,
   {
      if let Ok(value) = self.get() {
         return Ok(value);
      }
      self.try_compute(f)?;
      debug_assert!(self.is_bound());
      // SAFETY: try_compute() succeeded, so the slot is bound.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Async flavor of [`compute_if_absent`](Self::compute_if_absent).
   ///
   /// Dropping the returned future while it is computing leaves the slot empty.
   #[inline]
   pub async fn compute_if_absent_async<F, Fut>(&self, f: F) -> &V
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = V>,
   {
      if let Ok(value) = self.get() {
         return value;
      }
      self.compute_async(f).await;
      // SAFETY: compute_async() only returns once the slot is bound.
      unsafe { self.get_unchecked() }
   }

   /// Async flavor of [`try_compute_if_absent`](Self::try_compute_if_absent).
   pub async fn try_compute_if_absent_async<F, Fut, E>(&self, f: F) -> Result<&V, E>
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = Result<V, E>>,
   {
      if let Ok(value) = self.get() {
         return Ok(value);
      }
      self.try_compute_async(f).await?;
      debug_assert!(self.is_bound());
      // SAFETY: try_compute_async() succeeded, so the slot is bound.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Consumes the slot, returning the value if one was bound.
   #[inline]
   pub fn into_inner(mut self) -> Option<V> {
      let value = if self.state.is_bound_mut() {
         // SAFETY: bound, and `self` is forgotten below so the value is not dropped twice.
         Some(unsafe { self.value.get_mut().assume_init_read() })
      } else {
         None
      };
      // The value has been moved out (or never existed); skip `Drop`.
      mem::forget(self);
      value
   }

   // --- Cold paths ---

   #[cold]
   fn compute<F>(&self, f: F)
   where
      F: FnOnce() -> V,
   {
      let Some(_guard) = self.state.lock_compute() else {
         return; // bound while we waited for the previous computation
      };
      // A concurrent `bind` may still win; bind_if_absent keeps that value.
      self.bind_if_absent(f());
   }

   #[cold]
   fn try_compute<F, E>(&self, f: F) -> Result<(), E>
   where
      F: FnOnce() -> Result<V, E>,
   {
      let Some(_guard) = self.state.lock_compute() else {
         return Ok(());
      };
      // On error the guard drops here and hands the slot to the next waiter.
      let value = f()?;
      self.bind_if_absent(value);
      Ok(())
   }

   #[cold]
   async fn compute_async<F, Fut>(&self, f: F)
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = V>,
   {
      let Some(_guard) = self.state.lock_compute_async().await else {
         return;
      };
      self.bind_if_absent(f().await);
   }

   #[cold]
   async fn try_compute_async<F, Fut, E>(&self, f: F) -> Result<(), E>
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = Result<V, E>>,
   {
      let Some(_guard) = self.state.lock_compute_async().await else {
         return Ok(());
      };
      let value = f().await?;
      self.bind_if_absent(value);
      Ok(())
   }
}

// --- Trait Implementations ---

// SAFETY:
// Sharing `&Monotonic<V>` hands out `&V` to every thread (`V: Sync`) and lets
// any thread move a `V` in through `bind` (`V: Send`).
unsafe impl<V: Send + Sync> Sync for Monotonic<V> {}
// SAFETY: the slot owns its `V`; moving the slot moves the value.
unsafe impl<V: Send> Send for Monotonic<V> {}

impl<V> Default for Monotonic<V> {
   /// Creates a new, empty slot.
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<V> From<V> for Monotonic<V> {
   /// Creates a slot already bound to `value`.
   #[inline]
   fn from(value: V) -> Self {
      Self::bound(value)
   }
}

impl<V: fmt::Display> fmt::Display for Monotonic<V> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self.get() {
         Ok(v) => fmt::Display::fmt(v, f),
         Err(_) => f.write_str("<unbound>"),
      }
   }
}

impl<V: fmt::Debug> fmt::Debug for Monotonic<V> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("Monotonic");
      match self.get() {
         Ok(v) => d.field(v),
         Err(_) => d.field(&format_args!("<unbound>")),
      };
      d.finish()
   }
}

impl<V: Clone> Clone for Monotonic<V> {
   /// Snapshots the slot: the clone is bound to a clone of the value if this
   /// slot is bound, and empty otherwise. The two slots are independent.
   #[inline]
   fn clone(&self) -> Self {
      match self.get() {
         Ok(value) => Self::bound(value.clone()),
         Err(_) => Self::new(),
      }
   }
}

impl<V: PartialEq> PartialEq for Monotonic<V> {
   /// Two slots are equal if both are empty, or both are bound to equal values.
   #[inline]
   fn eq(&self, other: &Self) -> bool {
      self.get().ok() == other.get().ok()
   }
}

impl<V: Eq> Eq for Monotonic<V> {}

impl<V> Drop for Monotonic<V> {
   #[inline]
   fn drop(&mut self) {
      if self.state.is_bound_mut() {
         // SAFETY: exclusive access and the value is initialized.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}
