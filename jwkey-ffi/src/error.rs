use jwkey::prelude::JwkeyError;
use thiserror::Error;

/// Result type for the C boundary
pub type JwkeyFfiResult<T> = std::result::Result<T, JwkeyFfiError>;

/// Error type for the C boundary. Never crosses it: entry points log it and return null or 0.
#[derive(Error, Debug)]
pub enum JwkeyFfiError {
  /// Required pointer argument was null
  #[error("Null pointer: {0}")]
  NullPointer(&'static str),

  /// C string was not valid UTF-8
  #[error("Invalid UTF-8 in {0}")]
  InvalidUtf8(&'static str),

  /// Rust string cannot be handed out as a C string
  #[error("Interior NUL byte in {0}")]
  InteriorNul(&'static str),

  /// Foreign vtable lacks a function
  #[error("Missing function pointer: {0}")]
  MissingFunction(&'static str),

  /// Inherited from JwkeyError
  #[error(transparent)]
  Jwkey(#[from] JwkeyError),
}
