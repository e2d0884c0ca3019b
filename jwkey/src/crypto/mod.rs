mod asymmetric;
mod foreign;

use crate::{
  error::{JwkeyError, JwkeyResult},
  jwk::{Jwk, KeyType},
};
use std::sync::Arc;

pub use asymmetric::{PublicKey, SecretKey};
pub use foreign::ForeignSigner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Signature algorithms, named after their JOSE `alg` values
pub enum Algorithm {
  /// EdDSA over Ed25519
  Ed25519,
  /// ES256
  EcdsaP256Sha256,
  /// ES384
  EcdsaP384Sha384,
}

impl Algorithm {
  pub fn as_str(&self) -> &'static str {
    match self {
      Algorithm::Ed25519 => "EdDSA",
      Algorithm::EcdsaP256Sha256 => "ES256",
      Algorithm::EcdsaP384Sha384 => "ES384",
    }
  }

  /// `(kty, crv)` pair this algorithm signs with
  pub fn key_type_and_curve(&self) -> (KeyType, &'static str) {
    match self {
      Algorithm::Ed25519 => (KeyType::Okp, "Ed25519"),
      Algorithm::EcdsaP256Sha256 => (KeyType::Ec, "P-256"),
      Algorithm::EcdsaP384Sha384 => (KeyType::Ec, "P-384"),
    }
  }

  /// Resolve the algorithm from `kty` and `crv`, checking an explicit `alg` agrees with them
  pub fn from_jwk(jwk: &Jwk) -> JwkeyResult<Self> {
    let alg = match (jwk.key_type()?, jwk.crv.as_str()) {
      (KeyType::Okp, "Ed25519") => Self::Ed25519,
      (KeyType::Ec, "P-256") => Self::EcdsaP256Sha256,
      (KeyType::Ec, "P-384") => Self::EcdsaP384Sha384,
      (kty, crv) => {
        return Err(JwkeyError::UnsupportedAlgorithm(format!("kty={kty} crv={crv}")));
      }
    };
    if let Some(declared) = jwk.alg.as_deref() {
      let declared = declared.parse::<Algorithm>()?;
      if declared != alg {
        return Err(JwkeyError::UnsupportedAlgorithm(format!(
          "alg {declared} does not match kty={} crv={}",
          jwk.kty, jwk.crv
        )));
      }
    }
    Ok(alg)
  }
}

impl std::fmt::Display for Algorithm {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl core::str::FromStr for Algorithm {
  type Err = JwkeyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      // some implementations put the curve name in alg
      "EdDSA" | "Ed25519" => Ok(Self::Ed25519),
      "ES256" => Ok(Self::EcdsaP256Sha256),
      "ES384" => Ok(Self::EcdsaP384Sha384),
      _ => Err(JwkeyError::UnsupportedAlgorithm(s.to_string())),
    }
  }
}

/// Signing capability bound to exactly one private key.
///
/// Implementations must be callable concurrently. Native keys are read-only while signing;
/// foreign-dispatch signers rely on the remote side honoring the same contract.
pub trait Signer: Send + Sync {
  /// Sign the payload, returning the raw (not encoded) signature
  fn sign(&self, payload: &[u8]) -> JwkeyResult<Vec<u8>>;
  /// Algorithm of the bound key, when it is known on this side of the boundary
  fn algorithm(&self) -> Option<Algorithm>;
}

/// Verification capability bound to one public key
pub trait Verifier: Send + Sync {
  fn verify(&self, payload: &[u8], signature: &[u8]) -> JwkeyResult<()>;
  fn algorithm(&self) -> Algorithm;
}

/// Build a native signer from a private jwk
pub fn signer_from_private_jwk(private_jwk: &Jwk) -> JwkeyResult<Arc<dyn Signer>> {
  Ok(Arc::new(SecretKey::from_jwk(private_jwk)?))
}

/// Build a native verifier from a jwk, private or public
pub fn verifier_from_jwk(jwk: &Jwk) -> JwkeyResult<Arc<dyn Verifier>> {
  Ok(Arc::new(PublicKey::from_jwk(jwk)?))
}
