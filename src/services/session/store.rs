//! Session-scoped key/value storage and the access-token holder built on it.
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Storage scoped to the current session (a browser tab's `sessionStorage`, a CLI process).
///
/// Values do not outlive the session. Implementations must be cheap to share
/// (typically `Arc<...>` inside).
pub trait SessionStorage: Send + Sync + 'static {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&self, key: &str, value: &str);

    fn remove_item(&self, key: &str);

    // Drops every key, not only the token.
    fn clear(&self);
}

/// In-memory storage living as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.read().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        self.items.write().insert(key.to_string(), value.to_string());
    }

    fn remove_item(&self, key: &str) {
        self.items.write().remove(key);
    }

    fn clear(&self) {
        self.items.write().clear();
    }
}

/// Holds zero or one access token under the configured key.
///
/// No shape validation happens here; decoding is the codec's job and is
/// always done on demand from the raw string returned by [`SessionStore::get_token`].
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    key: Arc<str>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the token
        f.debug_struct("SessionStore")
            .field("key", &self.key)
            .field("has_token", &self.get_token().is_some())
            .finish()
    }
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>, token_name: &str) -> Self {
        Self {
            storage,
            key: Arc::from(token_name),
        }
    }

    /// Store backed by a fresh [`MemorySessionStorage`].
    pub fn in_memory(token_name: &str) -> Self {
        Self::new(Arc::new(MemorySessionStorage::new()), token_name)
    }

    pub fn token_name(&self) -> &str {
        &self.key
    }

    pub fn get_token(&self) -> Option<String> {
        self.storage.get_item(&self.key)
    }

    pub fn set_token(&self, token: &str) {
        self.storage.set_item(&self.key, token);
    }

    pub fn remove_token(&self) {
        self.storage.remove_item(&self.key);
    }

    /// Tear down the whole session storage (logout).
    pub fn clear_session(&self) {
        self.storage.clear();
    }
}
