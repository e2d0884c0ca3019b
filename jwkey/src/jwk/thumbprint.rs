use super::{Jwk, KeyType};
use crate::error::{JwkeyError, JwkeyResult};
use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Compute the RFC 7638 thumbprint of the public portion of a jwk.
/// Only the members required for its kty are hashed, so `alg` and `d` never change the result.
pub fn compute_thumbprint(jwk: &Jwk) -> JwkeyResult<String> {
  let members = required_members(jwk)?;
  // BTreeMap keeps member names sorted and serde_json emits no whitespace
  let canonical = serde_json::to_string(&members).map_err(|e| JwkeyError::InvalidKey(e.to_string()))?;

  let mut hasher = <Sha256 as Digest>::new();
  hasher.update(canonical.as_bytes());
  let digest = hasher.finalize();
  Ok(general_purpose::URL_SAFE_NO_PAD.encode(digest))
}

fn required_members(jwk: &Jwk) -> JwkeyResult<BTreeMap<&'static str, &str>> {
  let kty = jwk.key_type()?;
  let mut members = BTreeMap::new();
  members.insert("kty", kty.as_str());
  members.insert("crv", non_empty("crv", Some(jwk.crv.as_str()))?);
  members.insert("x", non_empty("x", Some(jwk.x.as_str()))?);
  if kty == KeyType::Ec {
    members.insert("y", non_empty("y", jwk.y.as_deref())?);
  }
  Ok(members)
}

fn non_empty<'a>(name: &str, value: Option<&'a str>) -> JwkeyResult<&'a str> {
  match value {
    Some(v) if !v.is_empty() => Ok(v),
    _ => Err(JwkeyError::InvalidKey(format!("Missing required member {name}"))),
  }
}
