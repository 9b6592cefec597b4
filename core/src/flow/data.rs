// core/src/flow/data.rs
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared, lockable context handed to every handler of a run.
///
/// Clones point at the same value, so a caller can keep one handle and read
/// the results once the run is over.
///
/// The guards are blocking locks. Take what you need into locals and drop the
/// guard before the next `.await`.
#[derive(Debug)]
pub struct FlowData<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> FlowData<T> {
  pub fn new(value: T) -> Self {
    FlowData(Arc::new(RwLock::new(value)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
    self.0.try_read()
  }

  pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
    self.0.try_write()
  }

  /// Runs `f` under a read lock and returns its result. Handy for pulling a
  /// few fields out without naming the guard.
  pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
    f(&self.0.read())
  }

  /// Copy of the current value.
  pub fn snapshot(&self) -> T
  where
    T: Clone,
  {
    self.0.read().clone()
  }
}

impl<T: Send + Sync + 'static> Clone for FlowData<T> {
  fn clone(&self) -> Self {
    FlowData(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + Default + 'static> Default for FlowData<T> {
  fn default() -> Self {
    Self::new(T::default())
  }
}
