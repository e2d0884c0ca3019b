//! Capability bridge.
//!
//! A bridged capability is an opaque [`Handle`] paired with a dispatch object that knows how to reach
//! the instance it names. The core never interprets a foreign handle, it only passes it back on
//! every call. Calls are synchronous and blocking from the core's point of view and carry no timeout;
//! wrapping them in a deadline is up to the caller.
//!
//! Going the other way, [`Bridge`] hands out handles for native instances so that a foreign runtime
//! never holds a raw reference into this side's memory.

mod buffer;
mod capabilities;
mod registry;

use crate::{crypto::ForeignSigner, jwk::Jwk};

pub use buffer::{OwnedBuffer, ReleaseFn};
pub use capabilities::Bridge;
pub use registry::HandleRegistry;

/* -------------------------------- */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Opaque identifier of a capability instance, meaningful only to the side that owns it
pub struct Handle(u64);

impl Handle {
  /// Never issued, marks failure at the C boundary
  pub const NULL: Handle = Handle(0);

  pub const fn from_raw(raw: u64) -> Self {
    Self(raw)
  }

  pub const fn as_raw(&self) -> u64 {
    self.0
  }

  pub const fn is_null(&self) -> bool {
    self.0 == 0
  }
}

impl std::fmt::Display for Handle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/* -------------------------------- */
/// Dispatch for a signer living in another runtime.
///
/// `None` is the failure signal. A returned buffer, even an empty one, is a result.
/// The remote implementation must be safe to call from several threads at once if the signer is
/// shared; the bridge cannot enforce that.
pub trait SignerDispatch: Send + Sync {
  fn sign(&self, handle: Handle, payload: &[u8]) -> Option<OwnedBuffer>;

  /// Called once when the last local reference to the signer named by `handle` is dropped.
  /// Releases the remote signer instance only, never key material it does not own.
  fn release(&self, _handle: Handle) {}
}

impl<F> SignerDispatch for F
where
  F: Fn(Handle, &[u8]) -> Option<OwnedBuffer> + Send + Sync,
{
  fn sign(&self, handle: Handle, payload: &[u8]) -> Option<OwnedBuffer> {
    self(handle, payload)
  }
}

/// Dispatch for a key manager living in another runtime.
///
/// `None` is the failure signal for both operations. The same concurrency caveat as
/// [`SignerDispatch`] applies.
pub trait KeyManagerDispatch: Send + Sync {
  /// Hand a private jwk over, receiving its public projection
  fn import_private_jwk(&self, handle: Handle, private_jwk: &Jwk) -> Option<Jwk>;
  /// Obtain a signer for a public jwk, bound to a handle issued by the remote side
  fn get_signer(&self, handle: Handle, public_jwk: &Jwk) -> Option<ForeignSigner>;
}
