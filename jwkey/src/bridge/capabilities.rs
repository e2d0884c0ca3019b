use super::{Handle, HandleRegistry};
use crate::{
  crypto::Signer,
  error::{JwkeyError, JwkeyResult},
  jwk::Jwk,
  key_manager::KeyManager,
  trace::*,
};
use std::sync::{Arc, OnceLock};

/// Registry of native capabilities exposed to a foreign runtime by handle.
///
/// Pass it by reference to whatever hands capabilities across the boundary. Each registry is
/// created on first use, and dropping the bridge drops every instance still registered.
#[derive(Default)]
pub struct Bridge {
  signers: OnceLock<HandleRegistry<dyn Signer>>,
  key_managers: OnceLock<HandleRegistry<dyn KeyManager>>,
}

impl Bridge {
  pub fn new() -> Self {
    Self::default()
  }

  fn signers(&self) -> &HandleRegistry<dyn Signer> {
    self.signers.get_or_init(HandleRegistry::new)
  }

  fn key_managers(&self) -> &HandleRegistry<dyn KeyManager> {
    self.key_managers.get_or_init(HandleRegistry::new)
  }

  /* ----- signers ----- */
  pub fn register_signer(&self, signer: Arc<dyn Signer>) -> Handle {
    let handle = self.signers().insert(signer);
    debug!("Registered signer {handle}");
    handle
  }

  pub fn signer(&self, handle: Handle) -> JwkeyResult<Arc<dyn Signer>> {
    self
      .signers()
      .get(handle)
      .ok_or_else(|| JwkeyError::BridgeError(format!("unknown signer handle {handle}")))
  }

  pub fn sign(&self, handle: Handle, payload: &[u8]) -> JwkeyResult<Vec<u8>> {
    self.signer(handle)?.sign(payload)
  }

  /// Drop the registration. Returns false if the handle was unknown or already released.
  pub fn release_signer(&self, handle: Handle) -> bool {
    let released = self.signers().remove(handle).is_some();
    debug!("Release signer {handle}: {released}");
    released
  }

  pub fn signer_count(&self) -> usize {
    self.signers.get().map_or(0, HandleRegistry::len)
  }

  /* ----- key managers ----- */
  pub fn register_key_manager(&self, key_manager: Arc<dyn KeyManager>) -> Handle {
    let handle = self.key_managers().insert(key_manager);
    debug!("Registered key manager {handle}");
    handle
  }

  pub fn key_manager(&self, handle: Handle) -> JwkeyResult<Arc<dyn KeyManager>> {
    self
      .key_managers()
      .get(handle)
      .ok_or_else(|| JwkeyError::BridgeError(format!("unknown key manager handle {handle}")))
  }

  pub fn import_private_jwk(&self, handle: Handle, private_jwk: Jwk) -> JwkeyResult<Jwk> {
    self.key_manager(handle)?.import_private_jwk(private_jwk)
  }

  /// Look the signer up in the key manager and register it, returning the signer handle
  pub fn get_signer(&self, handle: Handle, public_jwk: &Jwk) -> JwkeyResult<Handle> {
    let signer = self.key_manager(handle)?.get_signer(public_jwk)?;
    Ok(self.register_signer(signer))
  }

  /// Drop the registration. Signers already issued by the manager stay registered.
  pub fn release_key_manager(&self, handle: Handle) -> bool {
    let released = self.key_managers().remove(handle).is_some();
    debug!("Release key manager {handle}: {released}");
    released
  }

  pub fn key_manager_count(&self) -> usize {
    self.key_managers.get().map_or(0, HandleRegistry::len)
  }
}
