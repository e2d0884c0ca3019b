use super::KeyManager;
use crate::{
  crypto::{SecretKey, Signer},
  error::{JwkeyError, JwkeyResult},
  jwk::Jwk,
  trace::*,
};
use rustc_hash::FxHashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Key manager keeping private jwks in process memory, never persisted.
///
/// Safe to share between threads. A key is visible to `get_signer` on any thread once
/// `import_private_jwk` has returned.
#[derive(Default)]
pub struct InMemoryKeyManager {
  map: RwLock<FxHashMap<String, Jwk>>,
}

impl InMemoryKeyManager {
  pub fn new() -> Self {
    Self::default()
  }

  /// Manager pre-populated with the given private jwks
  pub fn with_private_jwks(private_jwks: impl IntoIterator<Item = Jwk>) -> JwkeyResult<Self> {
    let manager = Self::new();
    for private_jwk in private_jwks {
      manager.import_private_jwk(private_jwk)?;
    }
    Ok(manager)
  }

  /// Copies of all stored private jwks, ordered by thumbprint
  pub fn export_private_jwks(&self) -> Vec<Jwk> {
    let map = self.read();
    let mut entries = map.iter().collect::<Vec<_>>();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    entries.into_iter().map(|(_, jwk)| jwk.clone()).collect()
  }

  pub fn contains(&self, thumbprint: &str) -> bool {
    self.read().contains_key(thumbprint)
  }

  pub fn len(&self) -> usize {
    self.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  // A panic while holding the lock cannot leave the map half-updated, so poisoning is ignored
  fn read(&self) -> RwLockReadGuard<'_, FxHashMap<String, Jwk>> {
    self.map.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, FxHashMap<String, Jwk>> {
    self.map.write().unwrap_or_else(PoisonError::into_inner)
  }
}

impl Clone for InMemoryKeyManager {
  /// Snapshot of the stored keys; later imports into either copy are not shared
  fn clone(&self) -> Self {
    Self {
      map: RwLock::new(self.read().clone()),
    }
  }
}

impl KeyManager for InMemoryKeyManager {
  fn import_private_jwk(&self, private_jwk: Jwk) -> JwkeyResult<Jwk> {
    if private_jwk.is_public() {
      return Err(JwkeyError::InvalidKey("private_jwk must be a private key".to_string()));
    }
    private_jwk.validate()?;

    let public_jwk = private_jwk.to_public();
    let thumbprint = public_jwk.compute_thumbprint()?;
    debug!("Import private jwk {thumbprint}");
    self.write().insert(thumbprint, private_jwk);
    Ok(public_jwk)
  }

  fn get_signer(&self, public_jwk: &Jwk) -> JwkeyResult<Arc<dyn Signer>> {
    if public_jwk.is_private() {
      return Err(JwkeyError::InvalidKey("public_jwk must be a public key".to_string()));
    }

    let thumbprint = public_jwk.compute_thumbprint()?;
    let private_jwk = self
      .read()
      .get(&thumbprint)
      .cloned()
      .ok_or_else(|| JwkeyError::KeyNotFound(format!("no private key for thumbprint {thumbprint}")))?;
    debug!("Found private jwk {thumbprint}");
    Ok(Arc::new(SecretKey::from_jwk(&private_jwk)?))
  }
}
