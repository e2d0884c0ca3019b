//! Capabilities by handle. A handle of 0 signals failure.

use crate::{
  boundary::{borrow_bytes, give_bytes, guard},
  error::{JwkeyFfiError, JwkeyFfiResult},
  jwk::{CJwk, OwnedCJwk},
  key_manager::CKeyManager,
  signer::CSigner,
  trace::*,
};
use jwkey::prelude::{bridge::Bridge, bridge::Handle, signer_from_private_jwk, InMemoryKeyManager};
use std::{ptr, sync::Arc};

/// Owns every capability registered through it; freeing it drops them all
#[derive(Default)]
pub struct JwkeyBridge(Bridge);

unsafe fn bridge_ref<'a>(bridge: *const JwkeyBridge) -> JwkeyFfiResult<&'a Bridge> {
  bridge
    .as_ref()
    .map(|b| &b.0)
    .ok_or(JwkeyFfiError::NullPointer("bridge"))
}

#[no_mangle]
pub extern "C" fn jwkey_bridge_new() -> *mut JwkeyBridge {
  guard("jwkey_bridge_new", ptr::null_mut(), || {
    Ok(Box::into_raw(Box::default()))
  })
}

/// # Safety
/// `bridge` must be null or come from `jwkey_bridge_new`, not yet freed, and not in use on
/// another thread.
#[no_mangle]
pub unsafe extern "C" fn jwkey_bridge_free(bridge: *mut JwkeyBridge) {
  if !bridge.is_null() {
    let bridge = Box::from_raw(bridge);
    debug!(
      "Free bridge holding {} signers and {} key managers",
      bridge.0.signer_count(),
      bridge.0.key_manager_count()
    );
  }
}

/// Register a native signer over a private jwk
///
/// # Safety
/// `bridge` must come from `jwkey_bridge_new`. `private_jwk` must be null or point to a valid `CJwk`.
#[no_mangle]
pub unsafe extern "C" fn jwkey_bridge_signer_from_private_jwk(bridge: *const JwkeyBridge, private_jwk: *const CJwk) -> u64 {
  guard("jwkey_bridge_signer_from_private_jwk", 0, || {
    let bridge = bridge_ref(bridge)?;
    let signer = signer_from_private_jwk(&CJwk::read(private_jwk, "private_jwk")?)?;
    Ok(bridge.register_signer(signer).as_raw())
  })
}

/// Register a signer implemented on the C side
///
/// # Safety
/// `bridge` must come from `jwkey_bridge_new`. The functions in `signer` must stay callable, from
/// any thread, until the returned handle is released.
#[no_mangle]
pub unsafe extern "C" fn jwkey_bridge_register_foreign_signer(bridge: *const JwkeyBridge, signer: CSigner) -> u64 {
  guard("jwkey_bridge_register_foreign_signer", 0, || {
    let bridge = bridge_ref(bridge)?;
    let signer = signer.into_foreign_signer()?;
    Ok(bridge.register_signer(Arc::new(signer)).as_raw())
  })
}

/// Sign with a registered signer. Returns null on failure; free the signature with `jwkey_bytes_free`.
///
/// # Safety
/// `bridge` must come from `jwkey_bridge_new`. `payload` must be valid for `payload_len` bytes,
/// or null when the length is 0.
#[no_mangle]
pub unsafe extern "C" fn jwkey_bridge_sign(
  bridge: *const JwkeyBridge,
  signer: u64,
  payload: *const u8,
  payload_len: usize,
  out_len: *mut usize,
) -> *mut u8 {
  guard("jwkey_bridge_sign", ptr::null_mut(), || {
    let bridge = bridge_ref(bridge)?;
    let signature = bridge.sign(Handle::from_raw(signer), borrow_bytes(payload, payload_len, "payload")?)?;
    give_bytes(signature, out_len)
  })
}

/// Returns false if the handle was unknown or already released
///
/// # Safety
/// `bridge` must come from `jwkey_bridge_new`.
#[no_mangle]
pub unsafe extern "C" fn jwkey_bridge_release_signer(bridge: *const JwkeyBridge, signer: u64) -> bool {
  guard("jwkey_bridge_release_signer", false, || {
    Ok(bridge_ref(bridge)?.release_signer(Handle::from_raw(signer)))
  })
}

/* -------------------------------- */
/// # Safety
/// `bridge` must come from `jwkey_bridge_new`.
#[no_mangle]
pub unsafe extern "C" fn jwkey_bridge_in_memory_key_manager_new(bridge: *const JwkeyBridge) -> u64 {
  guard("jwkey_bridge_in_memory_key_manager_new", 0, || {
    let bridge = bridge_ref(bridge)?;
    Ok(bridge.register_key_manager(Arc::new(InMemoryKeyManager::new())).as_raw())
  })
}

/// Register a key manager implemented on the C side
///
/// # Safety
/// `bridge` must come from `jwkey_bridge_new`. The functions in `key_manager` must stay callable,
/// from any thread, until the returned handle and every signer issued through it are released.
#[no_mangle]
pub unsafe extern "C" fn jwkey_bridge_register_foreign_key_manager(
  bridge: *const JwkeyBridge,
  key_manager: CKeyManager,
) -> u64 {
  guard("jwkey_bridge_register_foreign_key_manager", 0, || {
    let bridge = bridge_ref(bridge)?;
    let key_manager = key_manager.into_foreign_key_manager()?;
    Ok(bridge.register_key_manager(Arc::new(key_manager)).as_raw())
  })
}

/// Import a private jwk into a registered key manager. Returns its public jwk, or null on
/// failure; free the result with `jwkey_jwk_free`.
///
/// # Safety
/// `bridge` must come from `jwkey_bridge_new`. `private_jwk` must be null or point to a valid `CJwk`.
#[no_mangle]
pub unsafe extern "C" fn jwkey_bridge_import_private_jwk(
  bridge: *const JwkeyBridge,
  key_manager: u64,
  private_jwk: *const CJwk,
) -> *mut CJwk {
  guard("jwkey_bridge_import_private_jwk", ptr::null_mut(), || {
    let bridge = bridge_ref(bridge)?;
    let private_jwk = CJwk::read(private_jwk, "private_jwk")?;
    let public_jwk = bridge.import_private_jwk(Handle::from_raw(key_manager), private_jwk)?;
    Ok(OwnedCJwk::new(&public_jwk)?.into_raw())
  })
}

/// Look up the signer for a public jwk and register it. Returns the signer handle, or 0.
///
/// # Safety
/// `bridge` must come from `jwkey_bridge_new`. `public_jwk` must be null or point to a valid `CJwk`.
#[no_mangle]
pub unsafe extern "C" fn jwkey_bridge_get_signer(bridge: *const JwkeyBridge, key_manager: u64, public_jwk: *const CJwk) -> u64 {
  guard("jwkey_bridge_get_signer", 0, || {
    let bridge = bridge_ref(bridge)?;
    let public_jwk = CJwk::read(public_jwk, "public_jwk")?;
    Ok(bridge.get_signer(Handle::from_raw(key_manager), &public_jwk)?.as_raw())
  })
}

/// Signers issued through the key manager stay registered
///
/// # Safety
/// `bridge` must come from `jwkey_bridge_new`.
#[no_mangle]
pub unsafe extern "C" fn jwkey_bridge_release_key_manager(bridge: *const JwkeyBridge, key_manager: u64) -> bool {
  guard("jwkey_bridge_release_key_manager", false, || {
    Ok(bridge_ref(bridge)?.release_key_manager(Handle::from_raw(key_manager)))
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{boundary::jwkey_bytes_free, jwk::jwkey_jwk_free};
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

  unsafe fn sign(bridge: *const JwkeyBridge, signer: u64, payload: &[u8]) -> Option<Vec<u8>> {
    let mut len = 0usize;
    let ptr = jwkey_bridge_sign(bridge, signer, payload.as_ptr(), payload.len(), &mut len);
    if ptr.is_null() {
      return None;
    }
    let signature = std::slice::from_raw_parts(ptr, len).to_vec();
    jwkey_bytes_free(ptr, len);
    Some(signature)
  }

  #[test]
  fn test_in_memory_key_manager_through_c() {
    let bridge = jwkey_bridge_new();
    unsafe {
      let manager = jwkey_bridge_in_memory_key_manager_new(bridge);
      assert_ne!(manager, 0);

      let private_jwk = OwnedCJwk::new(&rfc8037_private_jwk()).unwrap();
      let public_jwk = jwkey_bridge_import_private_jwk(bridge, manager, private_jwk.as_ptr());
      assert!(!public_jwk.is_null());
      assert!((*public_jwk).d.is_null());

      let signer = jwkey_bridge_get_signer(bridge, manager, public_jwk);
      assert_ne!(signer, 0);
      let signature = sign(bridge, signer, b"abc").unwrap();
      PublicKey::from_jwk(&CJwk::read(public_jwk, "jwk").unwrap())
        .unwrap()
        .verify(b"abc", &signature)
        .unwrap();

      // the private jwk is not a valid lookup key
      assert_eq!(jwkey_bridge_get_signer(bridge, manager, private_jwk.as_ptr()), 0);

      assert!(jwkey_bridge_release_key_manager(bridge, manager));
      assert!(sign(bridge, signer, b"abc").is_some());
      assert_eq!(jwkey_bridge_get_signer(bridge, manager, public_jwk), 0);

      assert!(jwkey_bridge_release_signer(bridge, signer));
      assert!(!jwkey_bridge_release_signer(bridge, signer));
      assert!(sign(bridge, signer, b"abc").is_none());

      jwkey_jwk_free(public_jwk);
      jwkey_bridge_free(bridge);
    }
  }

  #[test]
  fn test_native_signer_by_handle() {
    let bridge = jwkey_bridge_new();
    unsafe {
      let private_jwk = OwnedCJwk::new(&rfc8037_private_jwk()).unwrap();
      let signer = jwkey_bridge_signer_from_private_jwk(bridge, private_jwk.as_ptr());
      assert_ne!(signer, 0);
      assert_eq!(sign(bridge, signer, b"").unwrap().len(), 64);

      let mut len = 0usize;
      let empty = jwkey_bridge_sign(bridge, signer, ptr::null(), 0, &mut len);
      assert!(!empty.is_null());
      jwkey_bytes_free(empty, len);
      assert!(jwkey_bridge_sign(bridge, signer, ptr::null(), 1, &mut len).is_null());
      jwkey_bridge_free(bridge);
    }
  }

  static RELEASED: AtomicUsize = AtomicUsize::new(0);

  unsafe extern "C" fn constant_sign(_signer_id: u64, _payload: *const u8, _payload_len: usize, out_len: *mut usize) -> *mut u8 {
    *out_len = 2;
    Box::into_raw(vec![0xabu8, 0xcd].into_boxed_slice()) as *mut u8
  }

  unsafe extern "C" fn counted_release(ptr: *mut u8, len: usize) {
    jwkey_bytes_free(ptr, len);
    RELEASED.fetch_add(1, Ordering::SeqCst);
  }

  #[test]
  fn test_foreign_signer_by_handle() {
    let bridge = jwkey_bridge_new();
    unsafe {
      let c = CSigner {
        signer_id: 99,
        sign: Some(constant_sign),
        release_buffer: Some(counted_release),
        release_signer: None,
      };
      let signer = jwkey_bridge_register_foreign_signer(bridge, c);
      assert_ne!(signer, 0);
      assert_eq!(sign(bridge, signer, b"abc").unwrap(), [0xab, 0xcd]);
      assert_eq!(RELEASED.load(Ordering::SeqCst), 1);

      assert_eq!(jwkey_bridge_register_foreign_signer(bridge, CSigner::EMPTY), 0);
      jwkey_bridge_free(bridge);
    }
  }

  static SIGNERS_RELEASED: AtomicUsize = AtomicUsize::new(0);

  unsafe extern "C" fn counted_release_signer(signer_id: u64) {
    if signer_id == 98 {
      SIGNERS_RELEASED.fetch_add(1, Ordering::SeqCst);
    }
  }

  #[test]
  fn test_foreign_signer_released_with_its_handle() {
    let bridge = jwkey_bridge_new();
    unsafe {
      let c = CSigner {
        signer_id: 98,
        sign: Some(constant_sign),
        release_buffer: Some(jwkey_bytes_free),
        release_signer: Some(counted_release_signer),
      };
      let signer = jwkey_bridge_register_foreign_signer(bridge, c);
      assert_eq!(sign(bridge, signer, b"abc").unwrap(), [0xab, 0xcd]);
      assert_eq!(SIGNERS_RELEASED.load(Ordering::SeqCst), 0);

      assert!(jwkey_bridge_release_signer(bridge, signer));
      assert_eq!(SIGNERS_RELEASED.load(Ordering::SeqCst), 1);
      assert!(!jwkey_bridge_release_signer(bridge, signer));
      assert_eq!(SIGNERS_RELEASED.load(Ordering::SeqCst), 1);

      // still registered when the bridge goes away
      let signer = jwkey_bridge_register_foreign_signer(bridge, c);
      assert_ne!(signer, 0);
      jwkey_bridge_free(bridge);
      assert_eq!(SIGNERS_RELEASED.load(Ordering::SeqCst), 2);
    }
  }

  #[test]
  fn test_null_arguments() {
    unsafe {
      assert_eq!(jwkey_bridge_in_memory_key_manager_new(ptr::null()), 0);
      assert!(sign(ptr::null(), 1, b"abc").is_none());
      assert!(!jwkey_bridge_release_signer(ptr::null(), 1));

      let bridge = jwkey_bridge_new();
      let manager = jwkey_bridge_in_memory_key_manager_new(bridge);
      assert!(jwkey_bridge_import_private_jwk(bridge, manager, ptr::null()).is_null());
      assert_eq!(jwkey_bridge_get_signer(bridge, manager, ptr::null()), 0);
      assert_eq!(jwkey_bridge_get_signer(bridge, 0, ptr::null()), 0);
      jwkey_bridge_free(bridge);
      jwkey_bridge_free(ptr::null_mut());
    }
  }

  #[test]
  fn test_bridge_shared_across_threads() {
    struct Shared(*mut JwkeyBridge);
    unsafe impl Sync for Shared {}
    impl Shared {
      fn get(&self) -> *mut JwkeyBridge {
        self.0
      }
    }

    let bridge = Shared(jwkey_bridge_new());
    let private_jwk = OwnedCJwk::new(&rfc8037_private_jwk()).unwrap();
    let manager = unsafe { jwkey_bridge_in_memory_key_manager_new(bridge.0) };
    let public_jwk = unsafe { jwkey_bridge_import_private_jwk(bridge.0, manager, private_jwk.as_ptr()) };
    let public = unsafe { CJwk::read(public_jwk, "jwk") }.unwrap();

    let signers = std::thread::scope(|s| {
      let joins = (0..8)
        .map(|_| {
          let (bridge, public) = (&bridge, &public);
          s.spawn(move || {
            let c = OwnedCJwk::new(public).unwrap();
            let signer = unsafe { jwkey_bridge_get_signer(bridge.get(), manager, c.as_ptr()) };
            let signature = unsafe { sign(bridge.get(), signer, b"abc") }.unwrap();
            PublicKey::from_jwk(public).unwrap().verify(b"abc", &signature).unwrap();
            signer
          })
        })
        .collect::<Vec<_>>();
      joins.into_iter().map(|j| j.join().unwrap()).collect::<Vec<_>>()
    });
    let mut unique = signers.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), signers.len());

    unsafe {
      jwkey_jwk_free(public_jwk);
      jwkey_bridge_free(bridge.0);
    }
  }
}
