// Transient playable handles
//
// A handle maps a short token to an entry's bytes for the duration of one
// playback. Dropping or releasing the handle revokes the token.
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::db::models::AudioEntry;

const TOKEN_PREFIX: &str = "blob:audioshelf";

#[derive(Default)]
struct RegistryInner {
    handles: Mutex<HashMap<String, Arc<[u8]>>>,
    next_serial: AtomicU64,
}

/// Resolves live handle tokens to audio bytes
#[derive(Clone, Default)]
pub struct HandleRegistry {
    inner: Arc<RegistryInner>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the entry's bytes under a fresh token
    pub fn derive(&self, entry: &AudioEntry) -> TransientHandle {
        let serial = self.inner.next_serial.fetch_add(1, Ordering::Relaxed) + 1;
        let token = format!("{}/{}/{}", TOKEN_PREFIX, entry.id, serial);
        let bytes: Arc<[u8]> = Arc::from(entry.data.as_slice());

        self.inner.handles.lock().insert(token.clone(), Arc::clone(&bytes));
        debug!("Derived handle {}", token);

        TransientHandle {
            token,
            entry_id: entry.id,
            bytes,
            registry: self.clone(),
        }
    }

    /// Bytes behind a live token, `None` once revoked
    pub fn resolve(&self, token: &str) -> Option<Arc<[u8]>> {
        self.inner.handles.lock().get(token).cloned()
    }

    /// Number of tokens not yet revoked
    pub fn live_count(&self) -> usize {
        self.inner.handles.lock().len()
    }

    fn revoke(&self, token: &str) {
        if self.inner.handles.lock().remove(token).is_some() {
            debug!("Revoked handle {}", token);
        }
    }
}

/// Short-lived reference to one entry's bytes. Never persisted.
pub struct TransientHandle {
    token: String,
    entry_id: i64,
    bytes: Arc<[u8]>,
    registry: HandleRegistry,
}

impl TransientHandle {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn entry_id(&self) -> i64 {
        self.entry_id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Revoke the token now
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for TransientHandle {
    fn drop(&mut self) {
        self.registry.revoke(&self.token);
    }
}

impl std::fmt::Debug for TransientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransientHandle")
            .field("token", &self.token)
            .field("entry_id", &self.entry_id)
            .field("len", &self.bytes.len())
            .finish()
    }
}
