mod foreign;
mod in_memory;

use crate::{crypto::Signer, error::JwkeyResult, jwk::Jwk};
use std::sync::Arc;

pub use foreign::ForeignKeyManager;
pub use in_memory::InMemoryKeyManager;

/// Custodian of private keys, indexed by the thumbprint of their public projection.
///
/// Private material goes in through `import_private_jwk` and never comes back out of this trait;
/// callers only ever get public jwks and signers.
pub trait KeyManager: Send + Sync {
  /// Store a private jwk and return its public projection.
  /// Importing a key whose thumbprint is already present replaces the stored jwk.
  fn import_private_jwk(&self, private_jwk: Jwk) -> JwkeyResult<Jwk>;

  /// Signer bound to the private key matching the public jwk
  fn get_signer(&self, public_jwk: &Jwk) -> JwkeyResult<Arc<dyn Signer>>;
}
