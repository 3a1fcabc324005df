use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::KeyStoreError;
use crate::traits::*;

type MemoryStore = Arc<RwLock<BTreeMap<String, String>>>;

/// In-process key store with etcd's prefix semantics. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    store: MemoryStore,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut store = self.store.write().await;
        store.insert(key.into(), value.into());
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let store = self.store.read().await;
        store.get(key).cloned()
    }

    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let store = self.store.read().await;
        store
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn delete_keys(
        &self,
        cancel: &CancellationToken,
        key_prefix: &str,
    ) -> KeyStoreResult<()> {
        let mut store = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(KeyStoreError::Cancelled),
            guard = self.store.write() => guard,
        };
        store.retain(|k, _| !k.starts_with(key_prefix));
        Ok(())
    }
}

#[async_trait]
impl KeyStoreHealth for MemoryKeyStore {
    async fn health(&self) -> KeyStoreResult<()> {
        Ok(())
    }
}
