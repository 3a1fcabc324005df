#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Key store backend error: {0}")]
    Backend(String),

    #[cfg(feature = "etcd")]
    #[error("etcd error: {0}")]
    Etcd(#[from] etcd_client::Error),
}

impl KeyStoreError {
    /// True when the failure came from the caller giving up rather than the store.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, KeyStoreError::Cancelled)
    }
}
