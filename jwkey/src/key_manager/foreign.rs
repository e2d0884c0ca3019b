use super::KeyManager;
use crate::{
  bridge::{Handle, KeyManagerDispatch},
  crypto::Signer,
  error::{JwkeyError, JwkeyResult},
  jwk::Jwk,
  trace::*,
};
use std::sync::Arc;

/// Key manager living in another runtime, reached through its handle and dispatch.
///
/// Dropping it is a no-op on the remote instance.
#[derive(Clone)]
pub struct ForeignKeyManager {
  handle: Handle,
  dispatch: Arc<dyn KeyManagerDispatch>,
}

impl ForeignKeyManager {
  pub fn new(handle: Handle, dispatch: Arc<dyn KeyManagerDispatch>) -> Self {
    Self { handle, dispatch }
  }

  pub fn handle(&self) -> Handle {
    self.handle
  }
}

impl KeyManager for ForeignKeyManager {
  fn import_private_jwk(&self, private_jwk: Jwk) -> JwkeyResult<Jwk> {
    if private_jwk.is_public() {
      return Err(JwkeyError::InvalidKey("private_jwk must be a private key".to_string()));
    }
    private_jwk.validate()?;

    let public_jwk = self.dispatch.import_private_jwk(self.handle, &private_jwk).ok_or_else(|| {
      warn!("Foreign key manager {} failed to import a private jwk", self.handle);
      JwkeyError::BridgeError(format!("foreign key manager {} failed to import private jwk", self.handle))
    })?;
    if public_jwk.is_private() {
      warn!("Foreign key manager {} returned private material, dropping d", self.handle);
    }
    Ok(public_jwk.to_public())
  }

  fn get_signer(&self, public_jwk: &Jwk) -> JwkeyResult<Arc<dyn Signer>> {
    if public_jwk.is_private() {
      return Err(JwkeyError::InvalidKey("public_jwk must be a public key".to_string()));
    }
    let signer = self.dispatch.get_signer(self.handle, public_jwk).ok_or_else(|| {
      warn!("Foreign key manager {} returned no signer", self.handle);
      JwkeyError::BridgeError(format!("foreign key manager {} returned no signer", self.handle))
    })?;
    debug!("Foreign key manager {} issued signer {}", self.handle, signer.handle());
    Ok(Arc::new(signer))
  }
}

impl std::fmt::Debug for ForeignKeyManager {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ForeignKeyManager").field("handle", &self.handle).finish_non_exhaustive()
  }
}
