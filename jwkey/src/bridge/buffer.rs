use std::{ops::Deref, ptr::NonNull};

/// Release function paired with the allocator of a foreign buffer
pub type ReleaseFn = unsafe extern "C" fn(ptr: *mut u8, len: usize);

/// Byte buffer with exactly one owner.
///
/// A buffer adopted from the other side of the boundary is handed back to the release function
/// supplied with it, once, when the `OwnedBuffer` is dropped. Every exit path releases it,
/// including early returns on errors.
pub struct OwnedBuffer {
  repr: Repr,
}

enum Repr {
  Native(Box<[u8]>),
  Foreign {
    ptr: NonNull<u8>,
    len: usize,
    release: ReleaseFn,
  },
}

// SAFETY: the foreign bytes are never mutated after adoption and are released only from `drop`,
// which runs once on whichever thread holds the buffer last.
unsafe impl Send for OwnedBuffer {}
unsafe impl Sync for OwnedBuffer {}

impl OwnedBuffer {
  pub fn from_vec(bytes: Vec<u8>) -> Self {
    Self {
      repr: Repr::Native(bytes.into_boxed_slice()),
    }
  }

  /// Adopt a buffer allocated on the other side of the boundary.
  /// Returns `None` for a null pointer, which is the failure signal of the boundary.
  ///
  /// # Safety
  /// `ptr` must be null or valid for reads of `len` bytes until `release(ptr, len)` is called,
  /// and nothing else may release it.
  pub unsafe fn from_raw_parts(ptr: *mut u8, len: usize, release: ReleaseFn) -> Option<Self> {
    NonNull::new(ptr).map(|ptr| Self {
      repr: Repr::Foreign { ptr, len, release },
    })
  }

  pub fn as_slice(&self) -> &[u8] {
    match &self.repr {
      Repr::Native(bytes) => &bytes[..],
      // SAFETY: guaranteed by the contract of `from_raw_parts`
      Repr::Foreign { ptr, len, .. } => unsafe { std::slice::from_raw_parts(ptr.as_ptr(), *len) },
    }
  }

  pub fn len(&self) -> usize {
    self.as_slice().len()
  }

  pub fn is_empty(&self) -> bool {
    self.as_slice().is_empty()
  }

  pub fn is_foreign(&self) -> bool {
    matches!(self.repr, Repr::Foreign { .. })
  }

  /// Take the bytes out. Native bytes move without a copy, foreign bytes are copied and released.
  pub fn into_vec(mut self) -> Vec<u8> {
    if let Repr::Native(bytes) = &mut self.repr {
      return std::mem::take(bytes).into_vec();
    }
    self.as_slice().to_vec()
  }
}

impl Deref for OwnedBuffer {
  type Target = [u8];

  fn deref(&self) -> &[u8] {
    self.as_slice()
  }
}

impl AsRef<[u8]> for OwnedBuffer {
  fn as_ref(&self) -> &[u8] {
    self.as_slice()
  }
}

impl From<Vec<u8>> for OwnedBuffer {
  fn from(bytes: Vec<u8>) -> Self {
    Self::from_vec(bytes)
  }
}

impl std::fmt::Debug for OwnedBuffer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OwnedBuffer")
      .field("len", &self.len())
      .field("foreign", &self.is_foreign())
      .finish()
  }
}

impl Drop for OwnedBuffer {
  fn drop(&mut self) {
    if let Repr::Foreign { ptr, len, release } = self.repr {
      // SAFETY: the buffer is released here and nowhere else
      unsafe { release(ptr.as_ptr(), len) };
    }
  }
}
