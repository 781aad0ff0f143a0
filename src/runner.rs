//! Background execution used by [`Memoized::with_background`](crate::Memoized::with_background).
//!
//! A runner accepts a zero-argument task and runs it somewhere other than the
//! calling thread. Nothing flows back: whatever the task produces is published
//! through the slot it binds.

use std::thread;

/// A unit of background work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run a [`Task`] without blocking the caller.
///
/// A runner may also drop a task it cannot run; slots touched by the task then
/// simply stay empty and are computed by the next foreground caller.
///
/// Any `Fn(Task)` closure is a runner, which is handy for tests and for
/// plugging in an existing pool:
///
/// ```rust
/// use monotonic::{Memoized, Task};
///
/// let inline = |task: Task| task();
/// let memo = Memoized::with_background(|| 7, &inline);
/// assert!(memo.is_computed());
/// ```
pub trait BackgroundRunner {
   /// Schedules `task` to run.
   fn spawn(&self, task: Task);
}

impl<F> BackgroundRunner for F
where
   F: Fn(Task),
{
   #[inline]
   fn spawn(&self, task: Task) {
      self(task)
   }
}

/// Runs every task on a fresh, dedicated OS thread.
#[derive(Debug, Clone)]
pub struct ThreadRunner {
   name: Option<String>,
   stack_size: Option<usize>,
}

impl ThreadRunner {
   /// Thread name used unless [`name`](Self::name) overrides it.
   pub const DEFAULT_NAME: &'static str = "monotonic-background";

   /// Creates a runner that spawns threads named [`Self::DEFAULT_NAME`].
   pub fn new() -> Self {
      Self {
         name: Some(Self::DEFAULT_NAME.to_owned()),
         stack_size: None,
      }
   }

   /// Names spawned threads `name`.
   #[must_use]
   pub fn name(mut self, name: impl Into<String>) -> Self {
      self.name = Some(name.into());
      self
   }

   /// Leaves spawned threads unnamed.
   #[must_use]
   pub fn unnamed(mut self) -> Self {
      self.name = None;
      self
   }

   /// Sets the stack size, in bytes, of spawned threads.
   #[must_use]
   pub fn stack_size(mut self, size: usize) -> Self {
      self.stack_size = Some(size);
      self
   }
}

impl Default for ThreadRunner {
   fn default() -> Self {
      Self::new()
   }
}

impl BackgroundRunner for ThreadRunner {
   fn spawn(&self, task: Task) {
      let mut builder = thread::Builder::new();
      if let Some(name) = &self.name {
         builder = builder.name(name.clone());
      }
      if let Some(size) = self.stack_size {
         builder = builder.stack_size(size);
      }
      tracing::trace!(thread = ?self.name, "monotonic.spawn_thread");
      if let Err(error) = builder.spawn(task) {
         tracing::warn!(%error, "failed to spawn background thread; task dropped");
      }
   }
}

/// Runs every task on a tokio runtime's blocking pool.
#[cfg(feature = "async-tokio")]
#[derive(Debug, Clone)]
pub struct TokioRunner {
   handle: tokio::runtime::Handle,
}

#[cfg(feature = "async-tokio")]
impl TokioRunner {
   /// Creates a runner that spawns onto `handle`.
   pub fn new(handle: tokio::runtime::Handle) -> Self {
      Self { handle }
   }

   /// Creates a runner for the runtime the caller is currently inside.
   pub fn try_current() -> Result<Self, tokio::runtime::TryCurrentError> {
      tokio::runtime::Handle::try_current().map(Self::new)
   }
}

#[cfg(feature = "async-tokio")]
impl BackgroundRunner for TokioRunner {
   fn spawn(&self, task: Task) {
      tracing::trace!("monotonic.spawn_blocking");
      // Detached: the task reports through the slot it binds.
      drop(self.handle.spawn_blocking(task));
   }
}
