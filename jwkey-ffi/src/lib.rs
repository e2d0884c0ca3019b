//! # jwkey-ffi
//!
//! C ABI over `jwkey`. Jwks cross as [`CJwk`], byte results as pointer plus length, and
//! capabilities as `u64` handles issued by a [`JwkeyBridge`]. Signers and key managers
//! implemented in C are registered through the [`CSigner`] and [`CKeyManager`] vtables and are
//! then indistinguishable from native ones.
//!
//! Every entry point reports failure as null, 0 or false, and logs the reason through `tracing`.
//! Panics never unwind into the caller. Memory returned by this library is released with the
//! matching `jwkey_*_free` function; memory returned by C vtables goes back through the release
//! function of the same vtable.

mod boundary;
mod bridge;
mod error;
mod jwk;
mod key_manager;
mod signer;
mod trace;

pub use boundary::{jwkey_bytes_free, jwkey_string_free};
pub use bridge::{
  jwkey_bridge_free, jwkey_bridge_get_signer, jwkey_bridge_import_private_jwk, jwkey_bridge_in_memory_key_manager_new,
  jwkey_bridge_new, jwkey_bridge_register_foreign_key_manager, jwkey_bridge_register_foreign_signer,
  jwkey_bridge_release_key_manager, jwkey_bridge_release_signer, jwkey_bridge_sign, jwkey_bridge_signer_from_private_jwk,
  JwkeyBridge,
};
pub use error::{JwkeyFfiError, JwkeyFfiResult};
pub use jwk::{jwkey_compute_thumbprint, jwkey_jwk_free, CJwk};
pub use key_manager::{CKeyManager, GetSignerFn, ImportPrivateJwkFn, ReleaseJwkFn};
pub use signer::{
  jwkey_native_signer_free, jwkey_native_signer_new, jwkey_native_signer_sign, CSigner, JwkeyNativeSigner, ReleaseSignerFn,
  SignFn,
};
