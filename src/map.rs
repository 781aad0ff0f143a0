//! Fixed key-set maps of independently bindable slots.

use core::fmt;
use core::hash::Hash;

use indexmap::{map, Equivalent, IndexMap};

use crate::cell::Monotonic;
use crate::error::{SlotError, UnknownKey};

/// A map whose key set is fixed at construction, one [`Monotonic`] slot per key.
///
/// Duplicate keys collapse into one entry; iteration follows the order in
/// which keys first appeared. Looking up a key outside the set is an
/// [`UnknownKey`] error, which is distinct from a known key whose slot is still
/// empty.
///
/// ```rust
/// use monotonic::MonotonicMap;
///
/// let map: MonotonicMap<&str, String> = MonotonicMap::new(["a", "b"]);
/// assert_eq!(map.compute_if_absent("a", |k| format!("{k}!")).unwrap(), "a!");
/// assert_eq!(map.compute_if_absent("a", |_| unreachable!()).unwrap(), "a!");
/// assert!(map.get("z").is_err());
/// ```
pub struct MonotonicMap<K, V> {
   slots: IndexMap<K, Monotonic<V>>,
}

impl<K, V> MonotonicMap<K, V>
where
   K: Hash + Eq,
{
   /// Creates a map with one empty slot per distinct key in `keys`.
   pub fn new<I>(keys: I) -> Self
   where
      I: IntoIterator<Item = K>,
   {
      keys.into_iter().collect()
   }

   /// Returns the slot for `key`.
   #[inline]
   pub fn get<Q>(&self, key: &Q) -> Result<&Monotonic<V>, UnknownKey>
   where
      Q: ?Sized + Hash + Equivalent<K>,
   {
      self.slots.get(key).ok_or(UnknownKey)
   }

   /// Returns `true` if `key` is part of the key set, whether or not its slot is bound.
   #[inline]
   pub fn contains_key<Q>(&self, key: &Q) -> bool
   where
      Q: ?Sized + Hash + Equivalent<K>,
   {
      self.slots.contains_key(key)
   }

   /// Returns the value for `key`, computing it with `mapper(key)` if absent.
   ///
   /// Same guarantees as [`Monotonic::compute_if_absent`], scoped to one key.
   pub fn compute_if_absent<Q, F>(&self, key: &Q, mapper: F) -> Result<&V, UnknownKey>
   where
      Q: ?Sized + Hash + Equivalent<K>,
      F: FnOnce(&K) -> V,
   {
      let (key, slot) = self.slots.get_key_value(key).ok_or(UnknownKey)?;
      Ok(slot.compute_if_absent(|| mapper(key)))
   }

   /// Fallible flavor of [`compute_if_absent`](Self::compute_if_absent).
   pub fn try_compute_if_absent<Q, F, E>(&self, key: &Q, mapper: F) -> Result<&V, SlotError<E>>
   where
      Q: ?Sized + Hash + Equivalent<K>,
      F: FnOnce(&K) -> Result<V, E>,
   {
      let (key, slot) = self.slots.get_key_value(key).ok_or(UnknownKey)?;
      slot
         .try_compute_if_absent(|| mapper(key))
         .map_err(SlotError::Compute)
   }
}

impl<K, V> MonotonicMap<K, V> {
   /// Number of distinct keys.
   #[inline]
   pub fn len(&self) -> usize {
      self.slots.len()
   }

   /// Returns `true` if the key set is empty.
   #[inline]
   pub fn is_empty(&self) -> bool {
      self.slots.is_empty()
   }

   /// The fixed key set, in first-appearance order.
   #[inline]
   pub fn keys(&self) -> map::Keys<'_, K, Monotonic<V>> {
      self.slots.keys()
   }

   /// Iterates over every key and its slot, bound or not.
   #[inline]
   pub fn iter(&self) -> map::Iter<'_, K, Monotonic<V>> {
      self.slots.iter()
   }

   /// Iterates over the entries whose slot is bound.
   pub fn bound(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
      self
         .slots
         .iter()
         .filter_map(|(key, slot)| slot.get().ok().map(|value| (key, value)))
   }

   /// Counts the keys whose slot is currently bound.
   pub fn bound_count(&self) -> usize {
      self.slots.values().filter(|slot| slot.is_bound()).count()
   }
}

impl<K, V> FromIterator<K> for MonotonicMap<K, V>
where
   K: Hash + Eq,
{
   fn from_iter<I: IntoIterator<Item = K>>(keys: I) -> Self {
      let keys = keys.into_iter();
      let mut slots = IndexMap::with_capacity(keys.size_hint().0);
      for key in keys {
         slots.entry(key).or_insert_with(Monotonic::new);
      }
      Self { slots }
   }
}

impl<'a, K, V> IntoIterator for &'a MonotonicMap<K, V> {
   type Item = (&'a K, &'a Monotonic<V>);
   type IntoIter = map::Iter<'a, K, Monotonic<V>>;

   fn into_iter(self) -> Self::IntoIter {
      self.iter()
   }
}

impl<K: Clone, V: Clone> Clone for MonotonicMap<K, V> {
   /// Snapshots every slot; see [`Monotonic`]'s `Clone`.
   fn clone(&self) -> Self {
      Self {
         slots: self.slots.clone(),
      }
   }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for MonotonicMap<K, V> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_map().entries(self.slots.iter()).finish()
   }
}
