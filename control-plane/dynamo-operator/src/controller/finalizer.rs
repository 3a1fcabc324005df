use dynamo_keystore::{KeyStore, KeyStoreError, KeyStoreResult};
use tokio_util::sync::CancellationToken;

/// Namespace used when a resource does not name one.
pub const DEFAULT_DYNAMO_NAMESPACE: &str = "default";

const COMPONENTS_SEGMENT: &str = "components";

/// Stable identity of a resource's registrations in the coordination service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceIdentity {
    pub namespace: Option<String>,
    pub service_name: String,
}

impl ResourceIdentity {
    pub fn namespace_or_default(&self) -> &str {
        self.namespace
            .as_deref()
            .unwrap_or(DEFAULT_DYNAMO_NAMESPACE)
    }

    /// `/{namespace}/components/{service_name}`
    pub fn key_prefix(&self) -> String {
        format!(
            "/{}/{}/{}",
            self.namespace_or_default(),
            COMPONENTS_SEGMENT,
            self.service_name
        )
    }

    /// Reject identities whose prefix would be unsafe to delete by.
    ///
    /// An empty service name would widen the prefix to every component in the
    /// namespace, so it is refused rather than defaulted.
    pub fn validate(&self) -> KeyStoreResult<()> {
        if self.service_name.is_empty() {
            return Err(KeyStoreError::InvalidKey(
                "service name must not be empty".into(),
            ));
        }
        let ns = self.namespace_or_default();
        if ns.is_empty() {
            return Err(KeyStoreError::InvalidKey(
                "namespace must not be empty".into(),
            ));
        }
        if ns.chars().chain(self.service_name.chars()).any(char::is_control)
        {
            return Err(KeyStoreError::InvalidKey(format!(
                "control character in key prefix {:?}",
                self.key_prefix()
            )));
        }
        Ok(())
    }
}

/// Retract every coordination-service key registered under `identity`.
///
/// Issues exactly one delete-by-prefix and returns the store's result as is,
/// so a failure keeps the resource around until a later pass succeeds.
pub async fn finalize_resource<S>(
    store: &S,
    cancel: &CancellationToken,
    identity: &ResourceIdentity,
) -> KeyStoreResult<()>
where
    S: KeyStore + ?Sized,
{
    identity.validate()?;
    store.delete_keys(cancel, &identity.key_prefix()).await
}
