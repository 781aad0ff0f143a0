//! Fixed-length lists of independently bindable slots.
//!
//! Two flavors share the same [`Monotonic`] slot:
//!
//! - [`MonotonicList<V>`] exposes the slots themselves. Callers bind, read and
//!   compute through the slot returned by [`MonotonicList::get`].
//! - [`LazyList<V, F>`] stores one per-index mapper and reads like a plain list
//!   of values, computing each element on first access.
//!
//! Neither flavor locks across slots: work on one index never waits on another.

use core::{fmt, ops, slice};

use crate::cell::Monotonic;
use crate::error::{IndexOutOfRange, SlotError};

/// A fixed-length list of empty-or-bound slots.
///
/// The length is fixed at construction; slots are never added or removed.
/// Each slot starts empty and is bound independently.
///
/// ```rust
/// use monotonic::MonotonicList;
///
/// let list = MonotonicList::new(5);
/// list.get(2).unwrap().bind("x").unwrap();
/// assert_eq!(list.get(2).unwrap().get(), Ok(&"x"));
/// assert!(!list.get(0).unwrap().is_bound());
/// assert!(list.get(5).is_err());
/// ```
pub struct MonotonicList<V> {
   slots: Box<[Monotonic<V>]>,
}

impl<V> MonotonicList<V> {
   /// Creates a list of `len` empty slots.
   pub fn new(len: usize) -> Self {
      Self {
         slots: (0..len).map(|_| Monotonic::new()).collect(),
      }
   }

   /// Number of slots, bound or not.
   #[inline]
   pub fn len(&self) -> usize {
      self.slots.len()
   }

   /// Returns `true` if the list has no slots at all.
   #[inline]
   pub fn is_empty(&self) -> bool {
      self.slots.is_empty()
   }

   #[inline]
   fn check(&self, index: usize) -> Result<&Monotonic<V>, IndexOutOfRange> {
      self.slots.get(index).ok_or(IndexOutOfRange {
         index,
         len: self.slots.len(),
      })
   }

   /// Returns the slot at `index`.
   #[inline]
   pub fn get(&self, index: usize) -> Result<&Monotonic<V>, IndexOutOfRange> {
      self.check(index)
   }

   /// Returns the value at `index`, computing it with `mapper(index)` if absent.
   ///
   /// Same guarantees as [`Monotonic::compute_if_absent`], scoped to one index.
   pub fn compute_if_absent<F>(&self, index: usize, mapper: F) -> Result<&V, IndexOutOfRange>
   where
      F: FnOnce(usize) -> V,
   {
      let slot = self.check(index)?;
      Ok(slot.compute_if_absent(|| mapper(index)))
   }

   /// Fallible flavor of [`compute_if_absent`](Self::compute_if_absent).
   pub fn try_compute_if_absent<F, E>(&self, index: usize, mapper: F) -> Result<&V, SlotError<E>>
   where
      F: FnOnce(usize) -> Result<V, E>,
   {
      let slot = self.check(index)?;
      slot
         .try_compute_if_absent(|| mapper(index))
         .map_err(SlotError::Compute)
   }

   /// Iterates over the slots in index order.
   #[inline]
   pub fn iter(&self) -> slice::Iter<'_, Monotonic<V>> {
      self.slots.iter()
   }

   /// Iterates over the values in index order, `None` for empty slots.
   pub fn values(&self) -> impl Iterator<Item = Option<&V>> + '_ {
      self.slots.iter().map(|slot| slot.get().ok())
   }

   /// Counts the slots that are currently bound.
   pub fn bound_count(&self) -> usize {
      self.slots.iter().filter(|slot| slot.is_bound()).count()
   }

   /// The slots as a plain slice.
   #[inline]
   pub fn as_slice(&self) -> &[Monotonic<V>] {
      &self.slots
   }
}

impl<V> ops::Index<usize> for MonotonicList<V> {
   type Output = Monotonic<V>;

   /// # Panics
   ///
   /// Panics if `index` is out of range.
   #[inline]
   fn index(&self, index: usize) -> &Monotonic<V> {
      &self.slots[index]
   }
}

impl<'a, V> IntoIterator for &'a MonotonicList<V> {
   type Item = &'a Monotonic<V>;
   type IntoIter = slice::Iter<'a, Monotonic<V>>;

   fn into_iter(self) -> Self::IntoIter {
      self.iter()
   }
}

impl<V> Default for MonotonicList<V> {
   fn default() -> Self {
      Self::new(0)
   }
}

impl<V: Clone> Clone for MonotonicList<V> {
   /// Snapshots every slot; see [`Monotonic`]'s `Clone`.
   fn clone(&self) -> Self {
      Self {
         slots: self.slots.clone(),
      }
   }
}

impl<V: fmt::Debug> fmt::Debug for MonotonicList<V> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_list().entries(self.slots.iter()).finish()
   }
}

/// A fixed-length list of values computed lazily from a per-index mapper.
///
/// Reading index `i` computes `mapper(i)` the first time and returns the bound
/// value afterwards; concurrent readers of the same index share one
/// computation.
///
/// ```rust
/// use monotonic::LazyList;
///
/// let squares = LazyList::new(4, |i| i * i);
/// assert_eq!(squares.get(3), Ok(&9));
/// assert_eq!(squares[2], 4);
/// assert_eq!(squares.iter().copied().collect::<Vec<_>>(), [0, 1, 4, 9]);
/// ```
pub struct LazyList<V, F> {
   slots: MonotonicList<V>,
   mapper: F,
}

impl<V, F> LazyList<V, F> {
   /// Number of elements, computed or not.
   #[inline]
   pub fn len(&self) -> usize {
      self.slots.len()
   }

   /// Returns `true` if the list has no elements.
   #[inline]
   pub fn is_empty(&self) -> bool {
      self.slots.is_empty()
   }

   /// The backing slots, for inspecting which elements have been computed.
   #[inline]
   pub fn slots(&self) -> &MonotonicList<V> {
      &self.slots
   }
}

impl<V, F> LazyList<V, F>
where
   F: Fn(usize) -> V,
{
   /// Creates a list of `len` elements without computing any of them.
   pub fn new(len: usize, mapper: F) -> Self {
      Self {
         slots: MonotonicList::new(len),
         mapper,
      }
   }

   #[inline]
   fn force<'a>(&'a self, slot: &'a Monotonic<V>, index: usize) -> &'a V {
      slot.compute_if_absent(|| (self.mapper)(index))
   }

   /// Returns the element at `index`, computing it on first access.
   #[inline]
   pub fn get(&self, index: usize) -> Result<&V, IndexOutOfRange> {
      let slot = self.slots.check(index)?;
      Ok(self.force(slot, index))
   }

   /// Iterates over the elements in index order, computing each as it is reached.
   pub fn iter(&self) -> impl Iterator<Item = &V> + '_ {
      self
         .slots
         .iter()
         .enumerate()
         .map(move |(index, slot)| self.force(slot, index))
   }
}

impl<V, F> ops::Index<usize> for LazyList<V, F>
where
   F: Fn(usize) -> V,
{
   type Output = V;

   /// # Panics
   ///
   /// Panics if `index` is out of range.
   #[inline]
   fn index(&self, index: usize) -> &V {
      match self.get(index) {
         Ok(value) => value,
         Err(error) => panic!("{error}"),
      }
   }
}

impl<V: fmt::Debug, F> fmt::Debug for LazyList<V, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("LazyList")
         .field("slots", &self.slots)
         .finish_non_exhaustive()
   }
}
