use std::future::Future;
use std::time::Duration;

use crate::error::KeyStoreError;
use crate::traits::*;
use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions, DeleteOptions, GetOptions};
use tokio_util::sync::CancellationToken;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct EtcdCredentials {
    pub username: String,
    pub password: String,
}

pub struct EtcdKeyStoreFactory {
    endpoints: Vec<String>,
    credentials: Option<EtcdCredentials>,
    timeout_seconds: Option<u64>,
}

impl EtcdKeyStoreFactory {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            credentials: None,
            timeout_seconds: None,
        }
    }

    pub fn with_credentials(mut self, credentials: EtcdCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    fn timeout(&self) -> Duration {
        self.timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    pub async fn connect(&self) -> Result<EtcdKeyStore, KeyStoreError> {
        if self.endpoints.is_empty() {
            return Err(KeyStoreError::Connection(
                "no etcd endpoints configured".into(),
            ));
        }
        let timeout = self.timeout();
        let mut options = ConnectOptions::new().with_connect_timeout(timeout);
        if let Some(ref creds) = self.credentials {
            options = options
                .with_user(creds.username.clone(), creds.password.clone());
        }

        let client = Client::connect(&self.endpoints, Some(options))
            .await
            .map_err(|e| KeyStoreError::Connection(e.to_string()))?;
        tracing::debug!(endpoints = ?self.endpoints, "connected to etcd");
        Ok(EtcdKeyStore { client, timeout })
    }
}

/// etcd-backed [`KeyStore`]. Cloning is cheap and shares the channel.
#[derive(Clone)]
pub struct EtcdKeyStore {
    client: Client,
    timeout: Duration,
}

impl EtcdKeyStore {
    /// Run one etcd request bounded by the per-request timeout and `cancel`.
    async fn bounded<T, F>(
        &self,
        cancel: &CancellationToken,
        op: &str,
        fut: F,
    ) -> KeyStoreResult<T>
    where
        F: Future<Output = Result<T, etcd_client::Error>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(KeyStoreError::Cancelled),
            res = tokio::time::timeout(self.timeout, fut) => match res {
                Ok(inner) => inner.map_err(KeyStoreError::from),
                Err(_) => Err(KeyStoreError::Timeout(format!(
                    "etcd {op} exceeded {:?}",
                    self.timeout
                ))),
            },
        }
    }

    pub async fn put(
        &self,
        cancel: &CancellationToken,
        key: &str,
        value: &str,
    ) -> KeyStoreResult<()> {
        let mut client = self.client.clone();
        self.bounded(cancel, "put", client.put(key, value, None))
            .await?;
        Ok(())
    }

    /// All keys starting with `prefix`, in key order.
    pub async fn get_prefix(
        &self,
        cancel: &CancellationToken,
        prefix: &str,
    ) -> KeyStoreResult<Vec<(String, String)>> {
        let mut client = self.client.clone();
        let options = GetOptions::new().with_prefix();
        let response = self
            .bounded(cancel, "get", client.get(prefix, Some(options)))
            .await?;
        let mut out = Vec::with_capacity(response.kvs().len());
        for kv in response.kvs() {
            out.push((kv.key_str()?.to_string(), kv.value_str()?.to_string()));
        }
        Ok(out)
    }
}

#[async_trait]
impl KeyStore for EtcdKeyStore {
    async fn delete_keys(
        &self,
        cancel: &CancellationToken,
        key_prefix: &str,
    ) -> KeyStoreResult<()> {
        let mut client = self.client.clone();
        let options = DeleteOptions::new().with_prefix();
        // An empty range deletes nothing and still succeeds.
        let response = self
            .bounded(cancel, "delete", client.delete(key_prefix, Some(options)))
            .await?;
        tracing::trace!(prefix = %key_prefix, deleted = response.deleted(), "etcd delete by prefix");
        Ok(())
    }
}

#[async_trait]
impl KeyStoreHealth for EtcdKeyStore {
    async fn health(&self) -> KeyStoreResult<()> {
        let mut client = self.client.clone();
        let never = CancellationToken::new();
        self.bounded(&never, "status", client.status()).await?;
        Ok(())
    }
}
