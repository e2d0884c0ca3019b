use crate::{
  boundary::{borrow_bytes, give_bytes, guard},
  error::{JwkeyFfiError, JwkeyFfiResult},
  jwk::CJwk,
  trace::*,
};
use jwkey::prelude::{
  bridge::{Handle, OwnedBuffer, ReleaseFn, SignerDispatch},
  signer_from_private_jwk, ForeignSigner, Signer,
};
use std::{ptr, sync::Arc};

/// Foreign sign function: returns a buffer released through the paired `release_buffer`, or null
pub type SignFn =
  unsafe extern "C" fn(signer_id: u64, payload: *const u8, payload_len: usize, out_len: *mut usize) -> *mut u8;

/// Releases the C-side signer instance named by `signer_id`, not its key
pub type ReleaseSignerFn = unsafe extern "C" fn(signer_id: u64);

/// Signer implemented on the C side. `signer_id` is opaque to this library.
///
/// `release_signer` is called exactly once, when this library drops its last reference to the
/// signer. It may be null when the C side has nothing to release.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CSigner {
  pub signer_id: u64,
  pub sign: Option<SignFn>,
  pub release_buffer: Option<ReleaseFn>,
  pub release_signer: Option<ReleaseSignerFn>,
}

impl CSigner {
  pub(crate) const EMPTY: CSigner = CSigner {
    signer_id: 0,
    sign: None,
    release_buffer: None,
    release_signer: None,
  };

  pub(crate) fn into_foreign_signer(self) -> JwkeyFfiResult<ForeignSigner> {
    let dispatch = CSignerDispatch {
      sign: self.sign.ok_or(JwkeyFfiError::MissingFunction("sign"))?,
      release_buffer: self.release_buffer.ok_or(JwkeyFfiError::MissingFunction("release_buffer"))?,
      release_signer: self.release_signer,
    };
    Ok(ForeignSigner::new(Handle::from_raw(self.signer_id), Arc::new(dispatch)))
  }

  /// Hand an instance that will never be used back to the C side
  pub(crate) fn discard(self) {
    if let Some(release_signer) = self.release_signer {
      unsafe { release_signer(self.signer_id) };
    }
  }
}

struct CSignerDispatch {
  sign: SignFn,
  release_buffer: ReleaseFn,
  release_signer: Option<ReleaseSignerFn>,
}

impl SignerDispatch for CSignerDispatch {
  fn sign(&self, handle: Handle, payload: &[u8]) -> Option<OwnedBuffer> {
    let mut len = 0usize;
    let ptr = unsafe { (self.sign)(handle.as_raw(), payload.as_ptr(), payload.len(), &mut len) };
    if ptr.is_null() {
      debug!("Foreign signer {handle} returned null");
    }
    unsafe { OwnedBuffer::from_raw_parts(ptr, len, self.release_buffer) }
  }

  fn release(&self, handle: Handle) {
    if let Some(release_signer) = self.release_signer {
      unsafe { release_signer(handle.as_raw()) };
    }
  }
}

/* -------------------------------- */
/// Signer over key material held by this library
pub struct JwkeyNativeSigner(Arc<dyn Signer>);

/// Build a signer from a private jwk of any supported algorithm. Returns null on failure.
///
/// # Safety
/// `private_jwk` must be null or point to a valid `CJwk`.
#[no_mangle]
pub unsafe extern "C" fn jwkey_native_signer_new(private_jwk: *const CJwk) -> *mut JwkeyNativeSigner {
  guard("jwkey_native_signer_new", ptr::null_mut(), || {
    let signer = signer_from_private_jwk(&CJwk::read(private_jwk, "private_jwk")?)?;
    Ok(Box::into_raw(Box::new(JwkeyNativeSigner(signer))))
  })
}

/// Sign `payload`. Returns null on failure; free the signature with `jwkey_bytes_free`.
///
/// # Safety
/// `signer` must come from `jwkey_native_signer_new`. `payload` must be valid for `payload_len`
/// bytes, or null when the length is 0.
#[no_mangle]
pub unsafe extern "C" fn jwkey_native_signer_sign(
  signer: *const JwkeyNativeSigner,
  payload: *const u8,
  payload_len: usize,
  out_len: *mut usize,
) -> *mut u8 {
  guard("jwkey_native_signer_sign", ptr::null_mut(), || {
    let signer = signer.as_ref().ok_or(JwkeyFfiError::NullPointer("signer"))?;
    let signature = signer.0.sign(borrow_bytes(payload, payload_len, "payload")?)?;
    give_bytes(signature, out_len)
  })
}

/// # Safety
/// `signer` must be null or come from `jwkey_native_signer_new`, not yet freed.
#[no_mangle]
pub unsafe extern "C" fn jwkey_native_signer_free(signer: *mut JwkeyNativeSigner) {
  if !signer.is_null() {
    drop(Box::from_raw(signer));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{boundary::jwkey_bytes_free, jwk::OwnedCJwk};
  use jwkey::prelude::{Jwk, PublicKey, Verifier};
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn rfc8037_private_jwk() -> Jwk {
    Jwk {
      alg: Some("EdDSA".to_string()),
      kty: "OKP".to_string(),
      crv: "Ed25519".to_string(),
      d: Some("nWGxne_9WmC6hEr0kuwsxERJxWl7MmkZcDusAxyuf2A".to_string()),
      x: "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo".to_string(),
      y: None,
    }
  }

  static RELEASED: AtomicUsize = AtomicUsize::new(0);

  // plays the C side: echoes the payload reversed, refuses signer id 0
  unsafe extern "C" fn reverse_sign(signer_id: u64, payload: *const u8, payload_len: usize, out_len: *mut usize) -> *mut u8 {
    if signer_id == 0 {
      return ptr::null_mut();
    }
    let mut out = std::slice::from_raw_parts(payload, payload_len).to_vec();
    out.reverse();
    *out_len = out.len();
    Box::into_raw(out.into_boxed_slice()) as *mut u8
  }

  unsafe extern "C" fn release(ptr: *mut u8, len: usize) {
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)));
    RELEASED.fetch_add(1, Ordering::SeqCst);
  }

  static SIGNERS_RELEASED: AtomicUsize = AtomicUsize::new(0);

  unsafe extern "C" fn release_signer(signer_id: u64) {
    if signer_id == 11 {
      SIGNERS_RELEASED.fetch_add(1, Ordering::SeqCst);
    }
  }

  #[test]
  fn test_foreign_signer_from_vtable() {
    let c = CSigner {
      signer_id: 7,
      sign: Some(reverse_sign),
      release_buffer: Some(release),
      release_signer: None,
    };
    let signer = c.into_foreign_signer().unwrap();
    assert_eq!(signer.handle(), Handle::from_raw(7));

    let before = RELEASED.load(Ordering::SeqCst);
    assert_eq!(signer.sign(b"abc").unwrap(), b"cba");
    assert_eq!(RELEASED.load(Ordering::SeqCst), before + 1);

    let refused = CSigner { signer_id: 0, ..c }.into_foreign_signer().unwrap();
    assert!(refused.sign(b"abc").is_err());
  }

  #[test]
  fn test_release_signer_called_once_after_last_clone() {
    let c = CSigner {
      signer_id: 11,
      sign: Some(reverse_sign),
      release_buffer: Some(release),
      release_signer: Some(release_signer),
    };
    let signer = c.into_foreign_signer().unwrap();
    let clone = signer.clone();
    drop(signer);
    assert_eq!(SIGNERS_RELEASED.load(Ordering::SeqCst), 0);
    assert_eq!(clone.sign(b"ab").unwrap(), b"ba");
    drop(clone);
    assert_eq!(SIGNERS_RELEASED.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_vtable_must_be_complete() {
    assert!(matches!(
      CSigner::EMPTY.into_foreign_signer(),
      Err(JwkeyFfiError::MissingFunction("sign"))
    ));
    let no_release = CSigner {
      sign: Some(reverse_sign),
      ..CSigner::EMPTY
    };
    assert!(matches!(
      no_release.into_foreign_signer(),
      Err(JwkeyFfiError::MissingFunction("release_buffer"))
    ));
  }

  #[test]
  fn test_native_signer_through_c() {
    let c = OwnedCJwk::new(&rfc8037_private_jwk()).unwrap();
    let signer = unsafe { jwkey_native_signer_new(c.as_ptr()) };
    assert!(!signer.is_null());

    let mut len = 0usize;
    let sig = unsafe { jwkey_native_signer_sign(signer, b"abc".as_ptr(), 3, &mut len) };
    assert!(!sig.is_null());
    let signature = unsafe { std::slice::from_raw_parts(sig, len) }.to_vec();
    unsafe { jwkey_bytes_free(sig, len) };
    PublicKey::from_jwk(&rfc8037_private_jwk())
      .unwrap()
      .verify(b"abc", &signature)
      .unwrap();

    // empty payload passed as null
    let sig = unsafe { jwkey_native_signer_sign(signer, ptr::null(), 0, &mut len) };
    assert!(!sig.is_null());
    assert_eq!(len, 64);
    unsafe { jwkey_bytes_free(sig, len) };

    assert!(unsafe { jwkey_native_signer_sign(ptr::null(), ptr::null(), 0, &mut len) }.is_null());
    unsafe { jwkey_native_signer_free(signer) };
  }

  #[test]
  fn test_native_signer_rejects_public_jwk() {
    let c = OwnedCJwk::new(&rfc8037_private_jwk().to_public()).unwrap();
    assert!(unsafe { jwkey_native_signer_new(c.as_ptr()) }.is_null());
    assert!(unsafe { jwkey_native_signer_new(ptr::null()) }.is_null());
  }
}
