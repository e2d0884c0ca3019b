use crate::{
  error::{JwkeyFfiError, JwkeyFfiResult},
  trace::*,
};
use std::{
  ffi::{c_char, CStr, CString},
  panic::{catch_unwind, AssertUnwindSafe},
};

/// Run the body of an entry point. Errors and panics are logged and turned into `fallback`,
/// so nothing unwinds into the caller.
pub(crate) fn guard<T>(name: &str, fallback: T, body: impl FnOnce() -> JwkeyFfiResult<T>) -> T {
  match catch_unwind(AssertUnwindSafe(body)) {
    Ok(Ok(value)) => value,
    Ok(Err(e)) => {
      warn!("{name}: {e}");
      fallback
    }
    Err(_) => {
      error!("{name}: panicked");
      fallback
    }
  }
}

/// Borrow a NUL-terminated UTF-8 string
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string valid for `'a`.
pub(crate) unsafe fn borrow_str<'a>(ptr: *const c_char, name: &'static str) -> JwkeyFfiResult<&'a str> {
  if ptr.is_null() {
    return Err(JwkeyFfiError::NullPointer(name));
  }
  CStr::from_ptr(ptr).to_str().map_err(|_| JwkeyFfiError::InvalidUtf8(name))
}

/// Like [`borrow_str`], null maps to `None`
pub(crate) unsafe fn borrow_opt_str<'a>(ptr: *const c_char, name: &'static str) -> JwkeyFfiResult<Option<&'a str>> {
  if ptr.is_null() {
    return Ok(None);
  }
  borrow_str(ptr, name).map(Some)
}

/// Borrow a byte range. A null pointer is accepted for the empty range.
///
/// # Safety
/// Unless null, `ptr` must be valid for reads of `len` bytes for `'a`.
pub(crate) unsafe fn borrow_bytes<'a>(ptr: *const u8, len: usize, name: &'static str) -> JwkeyFfiResult<&'a [u8]> {
  match (ptr.is_null(), len) {
    (true, 0) => Ok(&[]),
    (true, _) => Err(JwkeyFfiError::NullPointer(name)),
    (false, _) => Ok(std::slice::from_raw_parts(ptr, len)),
  }
}

pub(crate) fn to_cstring(value: &str, name: &'static str) -> JwkeyFfiResult<CString> {
  CString::new(value).map_err(|_| JwkeyFfiError::InteriorNul(name))
}

/// Hand bytes to the caller, who releases them with [`jwkey_bytes_free`]
///
/// # Safety
/// `out_len` must be null or valid for a `usize` write.
pub(crate) unsafe fn give_bytes(bytes: Vec<u8>, out_len: *mut usize) -> JwkeyFfiResult<*mut u8> {
  if out_len.is_null() {
    return Err(JwkeyFfiError::NullPointer("out_len"));
  }
  let boxed = bytes.into_boxed_slice();
  let len = boxed.len();
  let ptr = Box::into_raw(boxed) as *mut u8;
  *out_len = len;
  Ok(ptr)
}

/// Free a string returned by this library
///
/// # Safety
/// `ptr` must be null or a string returned by this library and not yet freed.
#[no_mangle]
pub unsafe extern "C" fn jwkey_string_free(ptr: *mut c_char) {
  if !ptr.is_null() {
    drop(CString::from_raw(ptr));
  }
}

/// Free a byte buffer returned by this library, together with the length reported for it
///
/// # Safety
/// `ptr` must be null or a buffer returned by this library with its reported `len`, not yet freed.
#[no_mangle]
pub unsafe extern "C" fn jwkey_bytes_free(ptr: *mut u8, len: usize) {
  if !ptr.is_null() {
    drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len)));
  }
}
