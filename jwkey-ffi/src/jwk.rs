use crate::{
  boundary::{borrow_opt_str, borrow_str, guard, to_cstring},
  error::{JwkeyFfiError, JwkeyFfiResult},
};
use jwkey::prelude::Jwk;
use std::{
  ffi::{c_char, CString},
  ptr,
};

/// Jwk as seen from C. Members are NUL-terminated UTF-8; optional ones may be null.
#[repr(C)]
#[derive(Debug)]
pub struct CJwk {
  pub alg: *const c_char,
  pub kty: *const c_char,
  pub crv: *const c_char,
  pub d: *const c_char,
  pub x: *const c_char,
  pub y: *const c_char,
}

impl CJwk {
  /// Copy the members out
  ///
  /// # Safety
  /// Every non-null member must point to a NUL-terminated string.
  pub(crate) unsafe fn to_jwk(&self) -> JwkeyFfiResult<Jwk> {
    Ok(Jwk {
      alg: borrow_opt_str(self.alg, "alg")?.map(str::to_string),
      kty: borrow_str(self.kty, "kty")?.to_string(),
      crv: borrow_str(self.crv, "crv")?.to_string(),
      d: borrow_opt_str(self.d, "d")?.map(str::to_string),
      x: borrow_str(self.x, "x")?.to_string(),
      y: borrow_opt_str(self.y, "y")?.map(str::to_string),
    })
  }

  /// # Safety
  /// `ptr` must be null or point to a valid `CJwk`.
  pub(crate) unsafe fn read(ptr: *const CJwk, name: &'static str) -> JwkeyFfiResult<Jwk> {
    ptr.as_ref().ok_or(JwkeyFfiError::NullPointer(name))?.to_jwk()
  }
}

/// `CJwk` whose strings are allocated here and freed on drop
pub(crate) struct OwnedCJwk(CJwk);

impl OwnedCJwk {
  pub(crate) fn new(jwk: &Jwk) -> JwkeyFfiResult<Self> {
    let opt = |value: Option<&str>, name| value.map(|v| to_cstring(v, name)).transpose();
    // every conversion happens before the first allocation is leaked into a raw pointer
    let alg = opt(jwk.alg.as_deref(), "alg")?;
    let kty = to_cstring(&jwk.kty, "kty")?;
    let crv = to_cstring(&jwk.crv, "crv")?;
    let d = opt(jwk.d.as_deref(), "d")?;
    let x = to_cstring(&jwk.x, "x")?;
    let y = opt(jwk.y.as_deref(), "y")?;

    let raw = |s: Option<CString>| s.map_or(ptr::null(), |s| s.into_raw() as *const c_char);
    Ok(Self(CJwk {
      alg: raw(alg),
      kty: raw(Some(kty)),
      crv: raw(Some(crv)),
      d: raw(d),
      x: raw(Some(x)),
      y: raw(y),
    }))
  }

  pub(crate) fn as_ptr(&self) -> *const CJwk {
    &self.0
  }

  /// Hand ownership to the caller, who releases it with [`jwkey_jwk_free`]
  pub(crate) fn into_raw(self) -> *mut CJwk {
    let this = std::mem::ManuallyDrop::new(self);
    Box::into_raw(Box::new(CJwk { ..this.0 }))
  }
}

impl Drop for OwnedCJwk {
  fn drop(&mut self) {
    let c = &mut self.0;
    for member in [&mut c.alg, &mut c.kty, &mut c.crv, &mut c.d, &mut c.x, &mut c.y] {
      if !member.is_null() {
        drop(unsafe { CString::from_raw(*member as *mut c_char) });
        *member = ptr::null();
      }
    }
  }
}

/// Free a jwk returned by this library
///
/// # Safety
/// `jwk` must be null or a jwk returned by this library and not yet freed.
#[no_mangle]
pub unsafe extern "C" fn jwkey_jwk_free(jwk: *mut CJwk) {
  if !jwk.is_null() {
    drop(OwnedCJwk(*Box::from_raw(jwk)));
  }
}

/// RFC 7638 thumbprint of a jwk. Returns null on failure; free the result with `jwkey_string_free`.
///
/// # Safety
/// `jwk` must be null or point to a valid `CJwk`.
#[no_mangle]
pub unsafe extern "C" fn jwkey_compute_thumbprint(jwk: *const CJwk) -> *mut c_char {
  guard("jwkey_compute_thumbprint", ptr::null_mut(), || {
    let thumbprint = CJwk::read(jwk, "jwk")?.compute_thumbprint()?;
    Ok(to_cstring(&thumbprint, "thumbprint")?.into_raw())
  })
}
