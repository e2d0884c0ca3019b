//! # jwkey
//!
//! JSON Web Keys, RFC 7638 thumbprints, and two pluggable capabilities: [`Signer`](prelude::Signer)
//! and [`KeyManager`](prelude::KeyManager). Each capability is either native (keys held in this
//! process) or foreign-dispatch (an opaque handle plus a dispatch object reaching another runtime).
//!
//! All operations are synchronous. Nothing is persisted and no keys are generated here.

mod bridge;
mod crypto;
mod error;
mod jwk;
mod key_manager;
mod trace;

pub mod prelude {
  pub mod bridge {
    pub use crate::bridge::{Bridge, Handle, HandleRegistry, KeyManagerDispatch, OwnedBuffer, ReleaseFn, SignerDispatch};
  }

  pub use crate::{
    crypto::{
      signer_from_private_jwk, verifier_from_jwk, Algorithm, ForeignSigner, PublicKey, SecretKey, Signer, Verifier,
    },
    error::{JwkeyError, JwkeyResult},
    jwk::{compute_thumbprint, Jwk, KeyType},
    key_manager::{ForeignKeyManager, InMemoryKeyManager, KeyManager},
  };
}

/* ----------------------------------------------------------------- */
