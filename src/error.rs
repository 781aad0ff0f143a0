//! Error types surfaced by monotonic values and their collections.

use thiserror::Error;

/// Returned by [`Monotonic::get`](crate::Monotonic::get) on a value that was never bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no value is bound")]
pub struct NotBound;

/// Returned by [`Monotonic::bind`](crate::Monotonic::bind) when a value is already present.
///
/// Carries the rejected value back to the caller; the bound value is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("a value is already bound")]
pub struct AlreadyBound<V>(pub V);

impl<V> AlreadyBound<V> {
   /// Returns the value that was refused.
   #[inline]
   pub fn into_inner(self) -> V {
      self.0
   }
}

/// An index outside `0..len` was used to address a [`MonotonicList`](crate::MonotonicList).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("index {index} is out of range for a list of length {len}")]
pub struct IndexOutOfRange {
   /// The index that was requested.
   pub index: usize,
   /// Length of the list it was requested from.
   pub len: usize,
}

/// A key outside the fixed key set was used to address a [`MonotonicMap`](crate::MonotonicMap).
///
/// This is a usage error. A known key whose slot is still empty is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("key is not part of the map's key set")]
pub struct UnknownKey;

/// Failure of a fallible per-slot computation on a list or map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError<E> {
   #[error(transparent)]
   IndexOutOfRange(#[from] IndexOutOfRange),

   #[error(transparent)]
   UnknownKey(#[from] UnknownKey),

   /// The computation itself failed; the slot stays empty.
   #[error("slot computation failed: {0}")]
   Compute(E),
}

impl<E> SlotError<E> {
   /// Returns the computation's error, if that is what failed.
   pub fn into_compute(self) -> Option<E> {
      match self {
         Self::Compute(error) => Some(error),
         _ => None,
      }
   }
}
