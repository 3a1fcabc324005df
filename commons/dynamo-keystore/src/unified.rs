use crate::traits::*;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "memory")]
use crate::memory::MemoryKeyStore;

#[cfg(feature = "etcd")]
use crate::etcd::EtcdKeyStore;

/// Key store chosen at runtime without exposing the concrete backend type.
#[derive(Clone)]
pub enum DynKeyStore {
    #[cfg(feature = "memory")]
    Memory(MemoryKeyStore),
    #[cfg(feature = "etcd")]
    Etcd(EtcdKeyStore),
}

impl DynKeyStore {
    pub fn backend_name(&self) -> &'static str {
        match self {
            #[cfg(feature = "memory")]
            DynKeyStore::Memory(_) => "memory",
            #[cfg(feature = "etcd")]
            DynKeyStore::Etcd(_) => "etcd",
        }
    }
}

#[async_trait]
impl KeyStore for DynKeyStore {
    async fn delete_keys(
        &self,
        cancel: &CancellationToken,
        key_prefix: &str,
    ) -> KeyStoreResult<()> {
        match self {
            #[cfg(feature = "memory")]
            DynKeyStore::Memory(s) => s.delete_keys(cancel, key_prefix).await,
            #[cfg(feature = "etcd")]
            DynKeyStore::Etcd(s) => s.delete_keys(cancel, key_prefix).await,
        }
    }
}

#[async_trait]
impl KeyStoreHealth for DynKeyStore {
    async fn health(&self) -> KeyStoreResult<()> {
        match self {
            #[cfg(feature = "memory")]
            DynKeyStore::Memory(s) => s.health().await,
            #[cfg(feature = "etcd")]
            DynKeyStore::Etcd(s) => s.health().await,
        }
    }
}

#[cfg(feature = "memory")]
impl From<MemoryKeyStore> for DynKeyStore {
    fn from(s: MemoryKeyStore) -> Self {
        DynKeyStore::Memory(s)
    }
}

#[cfg(feature = "etcd")]
impl From<EtcdKeyStore> for DynKeyStore {
    fn from(s: EtcdKeyStore) -> Self {
        DynKeyStore::Etcd(s)
    }
}
