use crate::error::KeyStoreError;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub type KeyStoreResult<T> = Result<T, KeyStoreError>;

#[async_trait]
pub trait KeyStoreHealth: Send + Sync {
    /// Lightweight connectivity check to the backing store.
    async fn health(&self) -> KeyStoreResult<()>;
}

/// Delete-by-prefix capability of a coordination service.
///
/// Implementations must be idempotent: deleting a prefix that matches no keys
/// succeeds. When `cancel` fires before the store answers, the call returns
/// [`KeyStoreError::Cancelled`] instead of waiting.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn delete_keys(
        &self,
        cancel: &CancellationToken,
        key_prefix: &str,
    ) -> KeyStoreResult<()>;
}

#[async_trait]
impl<T: KeyStore + ?Sized> KeyStore for std::sync::Arc<T> {
    async fn delete_keys(
        &self,
        cancel: &CancellationToken,
        key_prefix: &str,
    ) -> KeyStoreResult<()> {
        (**self).delete_keys(cancel, key_prefix).await
    }
}
