//! Credential-scoped cache of provider clients.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::client::{GeminiClient, GeminiError};

/// At most one live client per credential. Owned by the adapter and torn
/// down once at process stop; tests inject their own instance.
pub struct ClientCache {
    base_url: String,
    clients: RwLock<HashMap<String, Arc<GeminiClient>>>,
}

impl ClientCache {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached client for this credential, constructing one on a
    /// miss. The client is built with no lock held; when two callers race on
    /// the same new credential, the first install wins and the loser's
    /// client is dropped. A construction failure leaves the entry empty.
    pub fn get(&self, api_key: &str) -> Result<Arc<GeminiClient>, GeminiError> {
        {
            let clients = self.clients.read().unwrap_or_else(|e| e.into_inner());
            if let Some(client) = clients.get(api_key) {
                return Ok(Arc::clone(client));
            }
        }

        let fresh = Arc::new(GeminiClient::with_base_url(api_key, self.base_url.as_str())?);

        let mut clients = self.clients.write().unwrap_or_else(|e| e.into_inner());
        match clients.entry(api_key.to_string()) {
            Entry::Occupied(existing) => Ok(Arc::clone(existing.get())),
            Entry::Vacant(slot) => Ok(Arc::clone(slot.insert(fresh))),
        }
    }

    /// Drops every cached client. Not safe to call concurrently with
    /// in-flight `get` calls.
    pub fn teardown(&self) {
        self.clients
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
