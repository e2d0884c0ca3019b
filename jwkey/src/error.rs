use thiserror::Error;

/// Result type for jwkey
pub type JwkeyResult<T> = std::result::Result<T, JwkeyError>;

/// Error type for jwkey
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwkeyError {
  /* ----- Key errors ----- */
  /// Structurally malformed jwk, or a member required for its kty/crv is missing
  #[error("Invalid key: {0}")]
  InvalidKey(String),
  /// kty/crv/alg combination that is not implemented
  #[error("Unsupported algorithm: {0}")]
  UnsupportedAlgorithm(String),

  /* ----- Crypto errors ----- */
  /// Native or bridged signing failed
  #[error("Failed to sign: {0}")]
  SignError(String),
  /// Signature could not be parsed or does not verify
  #[error("Invalid signature: {0}")]
  InvalidSignature(String),

  /* ----- Key manager and bridge errors ----- */
  /// No private key registered under the thumbprint
  #[error("Key not found: {0}")]
  KeyNotFound(String),
  /// A foreign-dispatch call returned a failure signal, or a handle is unknown
  #[error("Bridge error: {0}")]
  BridgeError(String),
}

impl From<base64::DecodeError> for JwkeyError {
  fn from(e: base64::DecodeError) -> Self {
    JwkeyError::InvalidKey(format!("base64url decode error: {e}"))
  }
}
