use super::Handle;
use rustc_hash::FxHashMap;
use std::sync::{
  atomic::{AtomicU64, Ordering},
  Arc, PoisonError, RwLock,
};

/// Arena mapping handles to live instances on the side that owns them.
///
/// The other side only ever holds a [`Handle`]. Looking up or removing a handle that was never
/// issued, or was already removed, yields `None` instead of touching freed memory.
pub struct HandleRegistry<T: ?Sized> {
  next: AtomicU64,
  entries: RwLock<FxHashMap<Handle, Arc<T>>>,
}

impl<T: ?Sized> Default for HandleRegistry<T> {
  fn default() -> Self {
    Self {
      // 0 is the null handle
      next: AtomicU64::new(1),
      entries: RwLock::new(FxHashMap::default()),
    }
  }
}

impl<T: ?Sized> HandleRegistry<T> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register an instance and issue a fresh handle for it
  pub fn insert(&self, value: Arc<T>) -> Handle {
    let handle = Handle::from_raw(self.next.fetch_add(1, Ordering::Relaxed));
    self
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(handle, value);
    handle
  }

  pub fn get(&self, handle: Handle) -> Option<Arc<T>> {
    self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&handle)
      .cloned()
  }

  /// Unregister a handle. The instance lives on while other `Arc`s to it exist.
  pub fn remove(&self, handle: Handle) -> Option<Arc<T>> {
    self
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&handle)
  }

  pub fn contains(&self, handle: Handle) -> bool {
    self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .contains_key(&handle)
  }

  pub fn len(&self) -> usize {
    self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
