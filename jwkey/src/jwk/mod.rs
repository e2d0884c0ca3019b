mod thumbprint;

use crate::error::{JwkeyError, JwkeyResult};
use serde::{Deserialize, Serialize};

pub use thumbprint::compute_thumbprint;

/* -------------------------------- */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Key types this crate understands, named after the JOSE `kty` member
pub enum KeyType {
  /// Octet key pair (RFC 8037), e.g. Ed25519
  Okp,
  /// Elliptic curve (RFC 7518), e.g. P-256
  Ec,
}

impl KeyType {
  pub fn as_str(&self) -> &'static str {
    match self {
      KeyType::Okp => "OKP",
      KeyType::Ec => "EC",
    }
  }
}

impl std::fmt::Display for KeyType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl core::str::FromStr for KeyType {
  type Err = JwkeyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "OKP" => Ok(Self::Okp),
      "EC" => Ok(Self::Ec),
      _ => Err(JwkeyError::InvalidKey(format!("Unsupported kty: {s}"))),
    }
  }
}

/* -------------------------------- */
/// JSON Web Key
///
/// A private jwk carries `d`, its public projection is the same record without it.
/// Members other than `d` are kept verbatim, so a jwk round-trips through this type unchanged.
#[derive(Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Jwk {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub alg: Option<String>,
  pub kty: String,
  pub crv: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub d: Option<String>,
  pub x: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub y: Option<String>,
}

impl Jwk {
  /// True iff `d` is present and non-empty
  pub fn is_private(&self) -> bool {
    self.d.as_deref().is_some_and(|d| !d.is_empty())
  }

  pub fn is_public(&self) -> bool {
    !self.is_private()
  }

  /// Public projection, i.e., the same jwk with `d` dropped
  pub fn to_public(&self) -> Jwk {
    Jwk { d: None, ..self.clone() }
  }

  /// Parsed `kty`
  pub fn key_type(&self) -> JwkeyResult<KeyType> {
    self.kty.parse()
  }

  /// Structural validation of the members required for the key type.
  /// Key material itself is checked only when a signer or verifier is built from it.
  pub fn validate(&self) -> JwkeyResult<()> {
    let kty = self.key_type()?;
    if self.crv.is_empty() {
      return Err(JwkeyError::InvalidKey("Missing crv".to_string()));
    }
    if self.x.is_empty() {
      return Err(JwkeyError::InvalidKey("Missing x".to_string()));
    }
    match kty {
      KeyType::Ec => {
        if self.y.as_deref().map_or(true, str::is_empty) {
          return Err(JwkeyError::InvalidKey("Missing y for EC key".to_string()));
        }
      }
      KeyType::Okp => {
        if self.y.as_deref().is_some_and(|y| !y.is_empty()) {
          return Err(JwkeyError::InvalidKey("OKP key must not have y".to_string()));
        }
      }
    }
    Ok(())
  }

  /// RFC 7638 thumbprint of the public portion
  pub fn compute_thumbprint(&self) -> JwkeyResult<String> {
    compute_thumbprint(self)
  }

  /// Whether both jwks denote the same key, ignoring `alg` and `d`
  pub fn same_key(&self, other: &Jwk) -> bool {
    let same_y = match self.key_type() {
      Ok(KeyType::Okp) => true,
      _ => self.y == other.y,
    };
    self.kty == other.kty && self.crv == other.crv && self.x == other.x && same_y
  }
}

impl std::fmt::Debug for Jwk {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Jwk")
      .field("alg", &self.alg)
      .field("kty", &self.kty)
      .field("crv", &self.crv)
      .field("d", &self.d.as_ref().map(|_| "<redacted>"))
      .field("x", &self.x)
      .field("y", &self.y)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ed25519_private_jwk() -> Jwk {
    Jwk {
      alg: Some("EdDSA".to_string()),
      kty: "OKP".to_string(),
      crv: "Ed25519".to_string(),
      d: Some("nWGxne_9WmC6hEr0kuwsxERJxWl7MmkZcDusAxyuf2A".to_string()),
      x: "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo".to_string(),
      y: None,
    }
  }

  #[test]
  fn private_and_public_projection() {
    let private_jwk = ed25519_private_jwk();
    assert!(private_jwk.is_private());
    let public_jwk = private_jwk.to_public();
    assert!(public_jwk.is_public());
    assert_eq!(public_jwk.d, None);
    assert_eq!(public_jwk.alg, private_jwk.alg);
    assert!(public_jwk.same_key(&private_jwk));

    let empty_d = Jwk {
      d: Some(String::new()),
      ..private_jwk
    };
    assert!(empty_d.is_public());
  }

  #[test]
  fn validate_required_members() {
    assert!(ed25519_private_jwk().validate().is_ok());

    let unknown_kty = Jwk {
      kty: "RSA".to_string(),
      ..ed25519_private_jwk()
    };
    assert!(matches!(unknown_kty.validate(), Err(JwkeyError::InvalidKey(_))));

    let missing_x = Jwk {
      x: String::new(),
      ..ed25519_private_jwk()
    };
    assert!(matches!(missing_x.validate(), Err(JwkeyError::InvalidKey(_))));

    let okp_with_y = Jwk {
      y: Some("AAAA".to_string()),
      ..ed25519_private_jwk()
    };
    assert!(matches!(okp_with_y.validate(), Err(JwkeyError::InvalidKey(_))));

    let ec_without_y = Jwk {
      kty: "EC".to_string(),
      crv: "P-256".to_string(),
      ..ed25519_private_jwk()
    };
    assert!(matches!(ec_without_y.validate(), Err(JwkeyError::InvalidKey(_))));
  }

  #[test]
  fn same_key_ignores_alg() {
    let a = ed25519_private_jwk().to_public();
    let b = Jwk { alg: None, ..a.clone() };
    assert!(a.same_key(&b));
    let c = Jwk {
      x: "EzbXpICojY4ZI2i775GwkkTIbe5nuLL13JbdzUfsO6Q".to_string(),
      ..a.clone()
    };
    assert!(!a.same_key(&c));
  }

  #[test]
  fn serde_omits_absent_members() {
    let public_jwk = ed25519_private_jwk().to_public();
    let json = serde_json::to_string(&public_jwk).unwrap();
    assert!(!json.contains("\"d\""));
    assert!(!json.contains("\"y\""));
    let parsed: Jwk = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, public_jwk);
  }

  #[test]
  fn debug_redacts_private_scalar() {
    let debug = format!("{:?}", ed25519_private_jwk());
    assert!(!debug.contains("nWGxne_9WmC6hEr0kuwsxERJxWl7MmkZcDusAxyuf2A"));
    assert!(debug.contains("<redacted>"));
  }
}
