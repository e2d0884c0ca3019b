use crate::{
  error::{JwkeyFfiError, JwkeyFfiResult},
  jwk::{CJwk, OwnedCJwk},
  signer::CSigner,
  trace::*,
};
use jwkey::prelude::{
  bridge::{Handle, KeyManagerDispatch},
  ForeignKeyManager, ForeignSigner, Jwk,
};
use std::sync::Arc;

/// Returns the public jwk, allocated on the C side and released through `release_jwk`, or null
pub type ImportPrivateJwkFn = unsafe extern "C" fn(manager_id: u64, private_jwk: *const CJwk) -> *mut CJwk;
/// Fills `out_signer` and returns true on success
pub type GetSignerFn = unsafe extern "C" fn(manager_id: u64, public_jwk: *const CJwk, out_signer: *mut CSigner) -> bool;
pub type ReleaseJwkFn = unsafe extern "C" fn(jwk: *mut CJwk);

/// Key manager implemented on the C side. `manager_id` is opaque to this library.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CKeyManager {
  pub manager_id: u64,
  pub import_private_jwk: Option<ImportPrivateJwkFn>,
  pub get_signer: Option<GetSignerFn>,
  pub release_jwk: Option<ReleaseJwkFn>,
}

impl CKeyManager {
  pub(crate) fn into_foreign_key_manager(self) -> JwkeyFfiResult<ForeignKeyManager> {
    let dispatch = CKeyManagerDispatch {
      import_private_jwk: self
        .import_private_jwk
        .ok_or(JwkeyFfiError::MissingFunction("import_private_jwk"))?,
      get_signer: self.get_signer.ok_or(JwkeyFfiError::MissingFunction("get_signer"))?,
      release_jwk: self.release_jwk.ok_or(JwkeyFfiError::MissingFunction("release_jwk"))?,
    };
    Ok(ForeignKeyManager::new(Handle::from_raw(self.manager_id), Arc::new(dispatch)))
  }
}

struct CKeyManagerDispatch {
  import_private_jwk: ImportPrivateJwkFn,
  get_signer: GetSignerFn,
  release_jwk: ReleaseJwkFn,
}

/// Jwk returned by the C side, handed back to it on drop
struct ForeignJwk {
  ptr: *mut CJwk,
  release: ReleaseJwkFn,
}

impl Drop for ForeignJwk {
  fn drop(&mut self) {
    unsafe { (self.release)(self.ptr) };
  }
}

impl KeyManagerDispatch for CKeyManagerDispatch {
  fn import_private_jwk(&self, handle: Handle, private_jwk: &Jwk) -> Option<Jwk> {
    let arg = OwnedCJwk::new(private_jwk)
      .inspect_err(|e| warn!("Cannot pass private jwk to key manager {handle}: {e}"))
      .ok()?;
    let ptr = unsafe { (self.import_private_jwk)(handle.as_raw(), arg.as_ptr()) };
    if ptr.is_null() {
      return None;
    }
    let public_jwk = ForeignJwk {
      ptr,
      release: self.release_jwk,
    };
    unsafe { (*public_jwk.ptr).to_jwk() }
      .inspect_err(|e| warn!("Key manager {handle} returned an unreadable jwk: {e}"))
      .ok()
  }

  fn get_signer(&self, handle: Handle, public_jwk: &Jwk) -> Option<ForeignSigner> {
    let arg = OwnedCJwk::new(public_jwk)
      .inspect_err(|e| warn!("Cannot pass public jwk to key manager {handle}: {e}"))
      .ok()?;
    let mut out = CSigner::EMPTY;
    if !unsafe { (self.get_signer)(handle.as_raw(), arg.as_ptr(), &mut out) } {
      return None;
    }
    out
      .into_foreign_signer()
      .inspect_err(|e| {
        warn!("Key manager {handle} returned an incomplete signer: {e}");
        out.discard();
      })
      .ok()
  }
}
