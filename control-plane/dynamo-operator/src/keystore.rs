use dynamo_keystore::etcd::{EtcdCredentials, EtcdKeyStoreFactory};
use dynamo_keystore::memory::MemoryKeyStore;
use dynamo_keystore::unified::DynKeyStore;
use dynamo_keystore::{KeyStoreError, KeyStoreHealth};
use tracing::{info, warn};

use crate::config::{EtcdConfig, OperatorConfig};

fn etcd_factory(cfg: &EtcdConfig) -> EtcdKeyStoreFactory {
    let mut factory =
        EtcdKeyStoreFactory::new(cfg.endpoint_list()).with_timeout(cfg.timeout_secs);
    if let (Some(username), Some(password)) = (&cfg.username, &cfg.password) {
        factory = factory.with_credentials(EtcdCredentials {
            username: username.clone(),
            password: password.clone(),
        });
    }
    factory
}

/// Build the key store selected by `DYNAMO_OPERATOR_KEYSTORE`.
pub async fn connect_keystore(
    cfg: &OperatorConfig,
) -> Result<DynKeyStore, KeyStoreError> {
    let store: DynKeyStore = match cfg.keystore.as_str() {
        "memory" => {
            warn!(
                "in-memory key store selected: deletions do not reach the coordination service"
            );
            MemoryKeyStore::new().into()
        }
        "etcd" => etcd_factory(&cfg.etcd).connect().await?.into(),
        other => {
            return Err(KeyStoreError::Backend(format!(
                "unknown key store backend {other:?}"
            )));
        }
    };
    match store.health().await {
        Ok(()) => info!(backend = store.backend_name(), "key store ready"),
        Err(e) => {
            warn!(backend = store.backend_name(), error = %e, "key store health check failed")
        }
    }
    Ok(store)
}
