use super::{Algorithm, Signer};
use crate::{
  bridge::{Handle, SignerDispatch},
  error::{JwkeyError, JwkeyResult},
  trace::*,
};
use std::sync::Arc;

/// Signer whose key lives in another runtime.
///
/// Holds only the remote handle and the dispatch used to reach it. Clones share the remote
/// instance; when the last clone is dropped the dispatch is told to release it, exactly once.
/// The key material stays with the remote side.
#[derive(Clone)]
pub struct ForeignSigner {
  remote: Arc<RemoteSigner>,
}

struct RemoteSigner {
  handle: Handle,
  dispatch: Arc<dyn SignerDispatch>,
}

impl Drop for RemoteSigner {
  fn drop(&mut self) {
    debug!("Release foreign signer {}", self.handle);
    self.dispatch.release(self.handle);
  }
}

impl ForeignSigner {
  pub fn new(handle: Handle, dispatch: Arc<dyn SignerDispatch>) -> Self {
    Self {
      remote: Arc::new(RemoteSigner { handle, dispatch }),
    }
  }

  /// Remote handle, passed back unchanged on every call
  pub fn handle(&self) -> Handle {
    self.remote.handle
  }
}

impl Signer for ForeignSigner {
  fn sign(&self, payload: &[u8]) -> JwkeyResult<Vec<u8>> {
    let handle = self.handle();
    match self.remote.dispatch.sign(handle, payload) {
      Some(signature) => Ok(signature.into_vec()),
      None => {
        warn!("Foreign signer {handle} returned no signature");
        Err(JwkeyError::SignError(format!("foreign signer {handle} returned no signature")))
      }
    }
  }

  /// The algorithm is known only to the remote side
  fn algorithm(&self) -> Option<Algorithm> {
    None
  }
}

impl std::fmt::Debug for ForeignSigner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ForeignSigner").field("handle", &self.handle()).finish_non_exhaustive()
  }
}
