//! Atomic bind state shared by every monotonic slot.
//!
//! Each slot carries one `AtomicU8` with the following layout:
//! - Bit 0: BOUND - a value is present and will never change
//! - Bit 1: WRITING - a binder is storing its value (held for an instant)
//! - Bit 2: COMPUTING - a `compute_if_absent` owner is running its computation
//! - Bit 3: WAITING - at least one thread is parked on this slot
//! - Bits 4-7: EPOCH - bumped on every release so parked threads see a change
//!
//! Binders only contend on WRITING, so `bind` never waits for a computation
//! that is still in flight. Computing callers serialize on COMPUTING, which is
//! what gives `compute_if_absent` its at-most-once behavior. Once BOUND is
//! published every other bit is meaningless and is never looked at again.
//!
//! A thread only parks on a state that has both the contended flag and WAITING
//! set, and the validation runs under the same bucket lock as `unpark_all`.
//! Neither bit is cleared except by `release` or `publish`, and both wake
//! everyone when WAITING was set. So even if the epoch wraps and the exact
//! state recurs before we park, its flag holder still owes a wakeup. The epoch
//! only lets a thread that is about to park notice most releases early, so
//! four bits are plenty.

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

#[repr(transparent)]
pub(crate) struct BindState(AtomicU8);

impl BindState {
   const BOUND: u8 = 1;
   const WRITING: u8 = 2;
   const COMPUTING: u8 = 4;
   const WAITING: u8 = 8;
   const EPOCH_1: u8 = 16;
   const EPOCH_MASK: u8 = !(Self::BOUND | Self::WRITING | Self::COMPUTING | Self::WAITING);

   #[inline(always)]
   const fn next_epoch(current_state: u8) -> u8 {
      (current_state & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// Creates the state of an empty slot.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(0))
   }

   /// Creates the state of a slot that starts out bound.
   #[inline]
   pub(crate) const fn bound() -> Self {
      Self(AtomicU8::new(Self::BOUND))
   }

   #[inline]
   fn notify_all(&self) {
      // SAFETY: park and unpark are always keyed on the address of the atomic.
      unsafe {
         parking_lot_core::unpark_all(self.0.as_ptr() as usize, DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the current thread until the state moves away from `expected_state`.
   #[inline]
   fn wait(&self, expected_state: u8) {
      // SAFETY: See `notify_all`.
      unsafe {
         // The validation closure runs under the bucket lock, so a release that
         // lands before we sleep is observed and we return immediately.
         let _ = parking_lot_core::park(
            self.0.as_ptr() as usize,
            || self.0.load(Ordering::Acquire) == expected_state,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Returns `true` once a value has been published.
   ///
   /// The load is `Acquire`, pairing with the `Release` in [`Self::publish`], so
   /// a caller that sees `true` may read the slot's value.
   #[inline]
   pub(crate) fn is_bound(&self) -> bool {
      self.0.load(Ordering::Acquire) & Self::BOUND != 0
   }

   /// Same as [`Self::is_bound`] but through exclusive access.
   #[inline]
   pub(crate) fn is_bound_mut(&mut self) -> bool {
      *self.0.get_mut() & Self::BOUND != 0
   }

   /// Publishes BOUND, clearing every transient flag and waking parked threads.
   #[inline]
   fn publish(&self) {
      let current_state = self.0.load(Ordering::Relaxed);
      let new_state = Self::BOUND | Self::next_epoch(current_state);
      // Release: the value write happens-before any Acquire load seeing BOUND.
      let prev_state = self.0.swap(new_state, Ordering::Release);
      debug_assert!(prev_state & Self::BOUND == 0, "slot published twice");
      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
   }

   /// Clears `flag` without binding, bumping the epoch and waking parked threads.
   ///
   /// Does nothing when the slot was bound in the meantime: publishing already
   /// cleared every flag and woke everyone.
   #[inline]
   fn release(&self, flag: u8) {
      let mut current_state = self.0.load(Ordering::Relaxed);
      loop {
         if current_state & Self::BOUND != 0 {
            return;
         }
         let kept = current_state & !(flag | Self::WAITING | Self::EPOCH_MASK);
         let new_state = kept | Self::next_epoch(current_state);
         match self.0.compare_exchange_weak(
            current_state,
            new_state,
            Ordering::Release,
            Ordering::Relaxed,
         ) {
            Ok(prev_state) => {
               if prev_state & Self::WAITING != 0 {
                  self.notify_all();
               }
               return;
            }
            Err(actual) => current_state = actual,
         }
      }
   }

   /// One attempt at claiming `flag`.
   ///
   /// - `Ok(true)`: `flag` is now held by the caller and the slot is unbound.
   /// - `Ok(false)`: the slot is bound; nothing was claimed.
   /// - `Err(state)`: somebody else holds `flag`. Unless `nowait`, WAITING has
   ///   been set in `state` so the holder will wake us on release.
   #[inline]
   fn claim_step(&self, flag: u8, nowait: bool) -> Result<bool, u8> {
      loop {
         let current_state = self.0.load(Ordering::Acquire);
         // The re-check: whoever held `flag` before us may have bound the slot.
         if current_state & Self::BOUND != 0 {
            return Ok(false);
         }

         if current_state & flag == 0 {
            match self.0.compare_exchange_weak(
               current_state,
               current_state | flag,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Ok(true),
               Err(_) => {
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         if !nowait && current_state & Self::WAITING == 0 {
            let new_state = current_state | Self::WAITING;
            match self.0.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Err(new_state),
               Err(_) => {
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         return Err(current_state);
      }
   }

   /// Claims `flag`, parking while another thread holds it.
   ///
   /// Returns `false` if the slot is (or becomes) bound instead.
   fn claim(&self, flag: u8) -> bool {
      let mut observed = match self.claim_step(flag, false) {
         Ok(claimed) => return claimed,
         Err(state) => state,
      };
      loop {
         self.wait(observed);
         match self.claim_step(flag, false) {
            Ok(claimed) => return claimed,
            Err(state) => observed = state,
         }
      }
   }

   /// Claims the write flag. `None` means the slot is already bound.
   #[inline]
   pub(crate) fn lock_write(&self) -> Option<WriteGuard<'_>> {
      self.claim(Self::WRITING).then(|| WriteGuard { state: self })
   }

   /// Claims the compute flag, blocking while another caller's computation for
   /// this slot is in flight. `None` means the slot is already bound.
   #[inline]
   pub(crate) fn lock_compute(&self) -> Option<ComputeGuard<'_>> {
      self.claim(Self::COMPUTING).then(|| ComputeGuard { state: self })
   }

   /// Async flavor of [`Self::lock_compute`].
   ///
   /// Yields to the runtime while another computation is in flight; on a
   /// multi-threaded tokio runtime it eventually parks via `block_in_place`.
   pub(crate) async fn lock_compute_async(&self) -> Option<ComputeGuard<'_>> {
      loop {
         for _ in 0..16 {
            match self.claim_step(Self::COMPUTING, true) {
               Ok(claimed) => return claimed.then(|| ComputeGuard { state: self }),
               Err(state) => {
                  for _ in 0..32 {
                     yield_now().await;
                     if self.0.load(Ordering::Relaxed) != state {
                        break;
                     }
                  }
               }
            }
         }

         #[cfg(feature = "async-tokio-mt")]
         {
            if can_block_in_place() {
               return tokio::task::block_in_place(|| self.lock_compute());
            }
         }
      }
   }
}

#[cfg(feature = "async-tokio")]
#[inline]
async fn yield_now() {
   tokio::task::yield_now().await
}

/// Returns `Pending` once, waking itself first, so any executor gets to poll
/// the task that holds the slot.
#[cfg(not(feature = "async-tokio"))]
#[inline]
async fn yield_now() {
   let mut yielded = false;
   core::future::poll_fn(|cx| {
      if yielded {
         return core::task::Poll::Ready(());
      }
      yielded = true;
      cx.waker().wake_by_ref();
      core::task::Poll::Pending
   })
   .await
}

/// `block_in_place` panics outside a multi-threaded runtime.
#[cfg(feature = "async-tokio-mt")]
fn can_block_in_place() -> bool {
   tokio::runtime::Handle::try_current()
      .map(|handle| handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread)
      .unwrap_or(false)
}

/// Exclusive right to store a value into an unbound slot.
///
/// Must be [`commit`](Self::commit)ted once the value is written; dropping it
/// instead gives up the write and leaves the slot empty.
pub(crate) struct WriteGuard<'a> {
   state: &'a BindState,
}

impl WriteGuard<'_> {
   /// Publishes the slot as bound and wakes everyone parked on it.
   #[inline]
   pub(crate) fn commit(self) {
      self.state.publish();
      mem::forget(self);
   }
}

impl Drop for WriteGuard<'_> {
   #[inline]
   fn drop(&mut self) {
      self.state.release(BindState::WRITING);
   }
}

/// Exclusive right to run the computation for an unbound slot.
///
/// Dropping it (success, error, panic, or a cancelled future) hands the right
/// to the next waiting caller. After a successful bind the drop is a no-op.
pub(crate) struct ComputeGuard<'a> {
   state: &'a BindState,
}

impl Drop for ComputeGuard<'_> {
   #[inline]
   fn drop(&mut self) {
      self.state.release(BindState::COMPUTING);
   }
}
