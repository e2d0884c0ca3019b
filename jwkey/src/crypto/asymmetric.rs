use super::Algorithm;
use crate::{
  error::{JwkeyError, JwkeyResult},
  jwk::Jwk,
  trace::*,
};
use base64::{engine::general_purpose, Engine as _};
use ed25519_compact::{PublicKey as Ed25519PublicKey, SecretKey as Ed25519SecretKey};
#[cfg(feature = "ecdsa")]
use ecdsa::{
  elliptic_curve::{sec1::ToEncodedPoint, PublicKey as EcPublicKey, SecretKey as EcSecretKey},
  signature::{DigestSigner, DigestVerifier},
};
#[cfg(feature = "ecdsa")]
use p256::NistP256;
#[cfg(feature = "ecdsa")]
use p384::NistP384;
#[cfg(feature = "ecdsa")]
use sha2::{Digest, Sha256, Sha384};

#[allow(dead_code)]
/// Byte lengths of key material
mod lengths {
  pub const ED25519_SEED: usize = 32;
  pub const P256_FIELD: usize = 32;
  pub const P384_FIELD: usize = 48;
}

fn decode_member(name: &str, value: Option<&str>) -> JwkeyResult<Vec<u8>> {
  let value = value
    .filter(|v| !v.is_empty())
    .ok_or_else(|| JwkeyError::InvalidKey(format!("Missing {name}")))?;
  Ok(general_purpose::URL_SAFE_NO_PAD.decode(value)?)
}

#[cfg(feature = "ecdsa")]
fn check_len(name: &str, bytes: &[u8], expected: usize) -> JwkeyResult<()> {
  if bytes.len() != expected {
    return Err(JwkeyError::InvalidKey(format!(
      "{name} must be {expected} bytes, got {}",
      bytes.len()
    )));
  }
  Ok(())
}

/* -------------------------------- */
/// Private key held natively, usable as a [`Signer`](super::Signer)
pub enum SecretKey {
  /// ES384
  #[cfg(feature = "ecdsa")]
  EcdsaP384Sha384(EcSecretKey<NistP384>),
  /// ES256
  #[cfg(feature = "ecdsa")]
  EcdsaP256Sha256(EcSecretKey<NistP256>),
  /// EdDSA over Ed25519
  Ed25519(Ed25519SecretKey),
}

impl SecretKey {
  /// Derive secret key from a private jwk.
  /// The public members of the jwk must match the key derived from `d`.
  pub fn from_jwk(jwk: &Jwk) -> JwkeyResult<Self> {
    jwk.validate()?;
    let alg = Algorithm::from_jwk(jwk)?;
    let d = decode_member("d", jwk.d.as_deref())?;

    let sk = match alg {
      Algorithm::Ed25519 => {
        debug!("Read Ed25519 private key from jwk");
        let seed = <[u8; lengths::ED25519_SEED]>::try_from(d.as_slice()).map_err(|_| {
          JwkeyError::InvalidKey(format!(
            "Ed25519 d must be {} bytes, got {}",
            lengths::ED25519_SEED,
            d.len()
          ))
        })?;
        let sk = ed25519_compact::KeyPair::try_from_seed(ed25519_compact::Seed::new(seed))
          .map_err(|e| JwkeyError::InvalidKey(format!("Ed25519 d: {e}")))?
          .sk;
        Self::Ed25519(sk)
      }
      #[cfg(feature = "ecdsa")]
      Algorithm::EcdsaP256Sha256 => {
        debug!("Read P-256 private key from jwk");
        check_len("P-256 d", &d, lengths::P256_FIELD)?;
        let sk = p256::SecretKey::from_slice(&d).map_err(|e| JwkeyError::InvalidKey(e.to_string()))?;
        Self::EcdsaP256Sha256(sk)
      }
      #[cfg(feature = "ecdsa")]
      Algorithm::EcdsaP384Sha384 => {
        debug!("Read P-384 private key from jwk");
        check_len("P-384 d", &d, lengths::P384_FIELD)?;
        let sk = p384::SecretKey::from_slice(&d).map_err(|e| JwkeyError::InvalidKey(e.to_string()))?;
        Self::EcdsaP384Sha384(sk)
      }
      #[cfg(not(feature = "ecdsa"))]
      alg => {
        return Err(JwkeyError::UnsupportedAlgorithm(format!(
          "{alg} requires the `ecdsa` feature"
        )));
      }
    };

    if !sk.public_key().to_jwk().same_key(jwk) {
      return Err(JwkeyError::InvalidKey(
        "d does not correspond to the public members of the jwk".to_string(),
      ));
    }
    Ok(sk)
  }

  /// Get public key from secret key
  pub fn public_key(&self) -> PublicKey {
    match &self {
      #[cfg(feature = "ecdsa")]
      Self::EcdsaP256Sha256(key) => PublicKey::EcdsaP256Sha256(key.public_key()),
      #[cfg(feature = "ecdsa")]
      Self::EcdsaP384Sha384(key) => PublicKey::EcdsaP384Sha384(key.public_key()),
      Self::Ed25519(key) => PublicKey::Ed25519(key.public_key()),
    }
  }

  /// Public jwk of this key
  pub fn to_public_jwk(&self) -> Jwk {
    self.public_key().to_jwk()
  }

  /// Thumbprint of the public portion
  pub fn thumbprint(&self) -> JwkeyResult<String> {
    self.to_public_jwk().compute_thumbprint()
  }

  pub fn algorithm(&self) -> Algorithm {
    self.public_key().algorithm()
  }
}

impl std::fmt::Debug for SecretKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SecretKey")
      .field("alg", &self.algorithm())
      .field("x", &self.to_public_jwk().x)
      .finish_non_exhaustive()
  }
}

impl super::Signer for SecretKey {
  /// Sign data
  fn sign(&self, payload: &[u8]) -> JwkeyResult<Vec<u8>> {
    match &self {
      #[cfg(feature = "ecdsa")]
      Self::EcdsaP256Sha256(sk) => {
        let sk = ecdsa::SigningKey::from(sk);
        let mut digest = <Sha256 as Digest>::new();
        digest.update(payload);
        let sig: ecdsa::Signature<NistP256> = sk
          .try_sign_digest(digest)
          .map_err(|e| JwkeyError::SignError(e.to_string()))?;
        Ok(sig.to_bytes().to_vec())
      }
      #[cfg(feature = "ecdsa")]
      Self::EcdsaP384Sha384(sk) => {
        let sk = ecdsa::SigningKey::from(sk);
        let mut digest = <Sha384 as Digest>::new();
        digest.update(payload);
        let sig: ecdsa::Signature<NistP384> = sk
          .try_sign_digest(digest)
          .map_err(|e| JwkeyError::SignError(e.to_string()))?;
        Ok(sig.to_bytes().to_vec())
      }
      Self::Ed25519(sk) => {
        // no noise, so signatures are deterministic
        let sig = sk.sign(payload, None);
        Ok(sig.as_ref().to_vec())
      }
    }
  }

  fn algorithm(&self) -> Option<Algorithm> {
    Some(SecretKey::algorithm(self))
  }
}

impl super::Verifier for SecretKey {
  fn verify(&self, payload: &[u8], signature: &[u8]) -> JwkeyResult<()> {
    use super::Verifier;
    self.public_key().verify(payload, signature)
  }

  fn algorithm(&self) -> Algorithm {
    SecretKey::algorithm(self)
  }
}

/* -------------------------------- */
/// Public key held natively, usable as a [`Verifier`](super::Verifier)
pub enum PublicKey {
  /// ES256
  #[cfg(feature = "ecdsa")]
  EcdsaP256Sha256(EcPublicKey<NistP256>),
  /// ES384
  #[cfg(feature = "ecdsa")]
  EcdsaP384Sha384(EcPublicKey<NistP384>),
  /// EdDSA over Ed25519
  Ed25519(Ed25519PublicKey),
}

impl PublicKey {
  /// Convert from jwk, `d` is ignored when present
  pub fn from_jwk(jwk: &Jwk) -> JwkeyResult<Self> {
    jwk.validate()?;
    let alg = Algorithm::from_jwk(jwk)?;
    let x = decode_member("x", Some(jwk.x.as_str()))?;

    match alg {
      Algorithm::Ed25519 => {
        let pk = Ed25519PublicKey::from_slice(&x).map_err(|e| JwkeyError::InvalidKey(e.to_string()))?;
        Ok(Self::Ed25519(pk))
      }
      #[cfg(feature = "ecdsa")]
      Algorithm::EcdsaP256Sha256 => {
        let sec1 = uncompressed_point(&x, &decode_member("y", jwk.y.as_deref())?, lengths::P256_FIELD)?;
        let pk = EcPublicKey::<NistP256>::from_sec1_bytes(&sec1).map_err(|e| JwkeyError::InvalidKey(e.to_string()))?;
        Ok(Self::EcdsaP256Sha256(pk))
      }
      #[cfg(feature = "ecdsa")]
      Algorithm::EcdsaP384Sha384 => {
        let sec1 = uncompressed_point(&x, &decode_member("y", jwk.y.as_deref())?, lengths::P384_FIELD)?;
        let pk = EcPublicKey::<NistP384>::from_sec1_bytes(&sec1).map_err(|e| JwkeyError::InvalidKey(e.to_string()))?;
        Ok(Self::EcdsaP384Sha384(pk))
      }
      #[cfg(not(feature = "ecdsa"))]
      alg => Err(JwkeyError::UnsupportedAlgorithm(format!(
        "{alg} requires the `ecdsa` feature"
      ))),
    }
  }

  /// Public jwk with `alg` set
  pub fn to_jwk(&self) -> Jwk {
    let alg = self.algorithm();
    let (kty, crv) = alg.key_type_and_curve();
    let (x, y) = match self {
      #[cfg(feature = "ecdsa")]
      Self::EcdsaP256Sha256(pk) => split_point(pk.to_encoded_point(false).as_bytes(), lengths::P256_FIELD),
      #[cfg(feature = "ecdsa")]
      Self::EcdsaP384Sha384(pk) => split_point(pk.to_encoded_point(false).as_bytes(), lengths::P384_FIELD),
      Self::Ed25519(pk) => (general_purpose::URL_SAFE_NO_PAD.encode(pk.as_ref()), None),
    };
    Jwk {
      alg: Some(alg.as_str().to_string()),
      kty: kty.as_str().to_string(),
      crv: crv.to_string(),
      d: None,
      x,
      y,
    }
  }

  /// Thumbprint of this key
  pub fn thumbprint(&self) -> JwkeyResult<String> {
    self.to_jwk().compute_thumbprint()
  }

  /// Get the algorithm name
  pub fn algorithm(&self) -> Algorithm {
    match self {
      #[cfg(feature = "ecdsa")]
      Self::EcdsaP256Sha256(_) => Algorithm::EcdsaP256Sha256,
      #[cfg(feature = "ecdsa")]
      Self::EcdsaP384Sha384(_) => Algorithm::EcdsaP384Sha384,
      Self::Ed25519(_) => Algorithm::Ed25519,
    }
  }
}

impl std::fmt::Debug for PublicKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("PublicKey").field(&self.to_jwk()).finish()
  }
}

#[cfg(feature = "ecdsa")]
/// SEC1 uncompressed encoding `0x04 || x || y`
fn uncompressed_point(x: &[u8], y: &[u8], field_len: usize) -> JwkeyResult<Vec<u8>> {
  check_len("x", x, field_len)?;
  check_len("y", y, field_len)?;
  let mut sec1 = Vec::with_capacity(1 + 2 * field_len);
  sec1.push(0x04);
  sec1.extend_from_slice(x);
  sec1.extend_from_slice(y);
  Ok(sec1)
}

#[cfg(feature = "ecdsa")]
fn split_point(sec1: &[u8], field_len: usize) -> (String, Option<String>) {
  let x = &sec1[1..1 + field_len];
  let y = &sec1[1 + field_len..];
  (
    general_purpose::URL_SAFE_NO_PAD.encode(x),
    Some(general_purpose::URL_SAFE_NO_PAD.encode(y)),
  )
}

impl super::Verifier for PublicKey {
  /// Verify signature
  fn verify(&self, payload: &[u8], signature: &[u8]) -> JwkeyResult<()> {
    match self {
      #[cfg(feature = "ecdsa")]
      Self::EcdsaP256Sha256(pk) => {
        let signature = ecdsa::Signature::<NistP256>::from_slice(signature)
          .map_err(|e| JwkeyError::InvalidSignature(e.to_string()))?;
        let vk = ecdsa::VerifyingKey::from(pk);
        let mut digest = <Sha256 as Digest>::new();
        digest.update(payload);
        vk.verify_digest(digest, &signature)
          .map_err(|e| JwkeyError::InvalidSignature(e.to_string()))
      }
      #[cfg(feature = "ecdsa")]
      Self::EcdsaP384Sha384(pk) => {
        let signature = ecdsa::Signature::<NistP384>::from_slice(signature)
          .map_err(|e| JwkeyError::InvalidSignature(e.to_string()))?;
        let vk = ecdsa::VerifyingKey::from(pk);
        let mut digest = <Sha384 as Digest>::new();
        digest.update(payload);
        vk.verify_digest(digest, &signature)
          .map_err(|e| JwkeyError::InvalidSignature(e.to_string()))
      }
      Self::Ed25519(pk) => {
        let sig =
          ed25519_compact::Signature::from_slice(signature).map_err(|e| JwkeyError::InvalidSignature(e.to_string()))?;
        pk.verify(payload, &sig)
          .map_err(|e| JwkeyError::InvalidSignature(e.to_string()))
      }
    }
  }

  fn algorithm(&self) -> Algorithm {
    PublicKey::algorithm(self)
  }
}
