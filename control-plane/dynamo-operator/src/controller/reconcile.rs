use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dynamo_keystore::{KeyStore, KeyStoreError, cancel_after};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::finalizer::finalize_resource;
use super::readiness::is_deployment_ready;
use super::status::readiness_status;
use super::{ControllerContext, ReconcileErr, into_internal};
use crate::crd::nim_deployment::{
    DynamoNimDeployment, DynamoNimDeploymentStatus,
};
use crate::envoy::{EnvoyConfigSpec, generate_envoy_config};

pub const FINALIZER: &str = "nvidia.com/finalizer";
const FIELD_MANAGER: &str = "dynamo-operator";
const OWNER_LABEL: &str = "nvidia.com/dynamo-nim-deployment";
const ENVOY_CONFIG_KEY: &str = "envoy.yaml";

pub fn has_finalizer(obj: &DynamoNimDeployment) -> bool {
    obj.finalizers().iter().any(|f| f == FINALIZER)
}

/// Whether `next` differs from `prev` in anything but the refresh timestamp.
pub fn status_changed(
    prev: Option<&DynamoNimDeploymentStatus>,
    next: &DynamoNimDeploymentStatus,
) -> bool {
    let Some(prev) = prev else {
        return true;
    };
    let mut a = prev.clone();
    let mut b = next.clone();
    a.last_updated = None;
    b.last_updated = None;
    a != b
}

/// ConfigMap carrying the rendered Envoy bootstrap, owned by `obj`.
pub fn envoy_config_map(obj: &DynamoNimDeployment, content: String) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(obj.envoy_config_map_name()),
            namespace: obj.namespace(),
            labels: Some(BTreeMap::from([(
                OWNER_LABEL.to_string(),
                obj.name_any(),
            )])),
            owner_references: obj.controller_owner_ref(&()).map(|o| vec![o]),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(ENVOY_CONFIG_KEY.to_string(), content)])),
        ..Default::default()
    }
}

/// Finalizer list with ours appended, `None` when already present. Refused
/// for identities whose keys could not be retracted on deletion.
pub fn finalizers_to_add(
    obj: &DynamoNimDeployment,
) -> Result<Option<Vec<String>>, KeyStoreError> {
    if has_finalizer(obj) {
        return Ok(None);
    }
    obj.identity().validate()?;
    let mut finals = obj.finalizers().to_vec();
    finals.push(FINALIZER.to_string());
    Ok(Some(finals))
}

/// Retract the keys of a deleted resource and return the finalizer list to
/// write back. `None` when this controller's finalizer is already gone. A
/// failed retraction is returned as is and the finalizer stays.
pub async fn release_finalizer<S>(
    store: &S,
    cancel: &CancellationToken,
    obj: &DynamoNimDeployment,
) -> Result<Option<Vec<String>>, KeyStoreError>
where
    S: KeyStore + ?Sized,
{
    if !has_finalizer(obj) {
        return Ok(None);
    }
    let identity = obj.identity();
    debug!(prefix = %identity.key_prefix(), "retracting coordination keys");
    finalize_resource(store, cancel, &identity).await?;
    Ok(Some(
        obj.finalizers()
            .iter()
            .filter(|f| *f != FINALIZER)
            .cloned()
            .collect(),
    ))
}

#[instrument(skip_all, fields(ns = %obj.namespace().unwrap_or_else(|| "default".into()), name = %obj.name_any()))]
pub async fn reconcile(
    obj: Arc<DynamoNimDeployment>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let ns = obj.namespace().unwrap_or_else(|| "default".to_string());
    let name = obj.name_any();
    let api: Api<DynamoNimDeployment> =
        Api::namespaced(ctx.client.clone(), &ns);

    // Deletion: retract coordination keys, then release the finalizer.
    if obj.meta().deletion_timestamp.is_some() {
        let deadline = cancel_after(
            &ctx.shutdown,
            Duration::from_secs(ctx.cfg.finalize_timeout_secs),
        );
        if let Some(finals) =
            release_finalizer(ctx.store.as_ref(), deadline.token(), &obj).await?
        {
            info!(%ns, %name, "reconcile: removing finalizer");
            let patch = json!({"metadata": {"finalizers": finals}});
            api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
                .await?;
        }
        return Ok(Action::await_change());
    }

    match finalizers_to_add(&obj) {
        Ok(Some(finals)) => {
            info!(%ns, %name, "reconcile: adding finalizer");
            let patch = json!({"metadata": {"finalizers": finals}});
            api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
                .await?;
        }
        Ok(None) => {}
        // A finalizer on an invalid identity would pin the resource in Terminating.
        Err(e) => {
            warn!(%ns, %name, error = %e, "reconcile: invalid identity, finalizer not added")
        }
    }

    if let Some(routing) = obj.spec.debug_routing.as_ref() {
        let content = generate_envoy_config(&EnvoyConfigSpec::from(routing))?;
        let cm = envoy_config_map(&obj, content);
        let cm_api: Api<ConfigMap> = Api::namespaced(ctx.client.clone(), &ns);
        let pp = PatchParams::apply(FIELD_MANAGER).force();
        cm_api
            .patch(&obj.envoy_config_map_name(), &pp, &Patch::Apply(&cm))
            .await?;
        debug!(%ns, %name, "reconcile: envoy config applied");
    }

    let dep_api: Api<Deployment> = Api::namespaced(ctx.client.clone(), &ns);
    let deployment = dep_api.get_opt(&name).await?;
    let ready = is_deployment_ready(deployment.as_ref());

    let now = Utc::now().to_rfc3339();
    let status = readiness_status(
        ready,
        deployment.is_some(),
        obj.meta().generation,
        obj.status.as_ref(),
        &now,
    );
    if status_changed(obj.status.as_ref(), &status) {
        info!(%ns, %name, ready, "reconcile: updating status");
        let body = serde_json::to_value(&status).map_err(into_internal)?;
        api.patch_status(
            &name,
            &PatchParams::default(),
            &Patch::Merge(&json!({ "status": body })),
        )
        .await?;
    }

    Ok(Action::requeue(Duration::from_secs(ctx.cfg.requeue_secs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::nim_deployment::{
        BackendSpec, DebugRoutingSpec, DynamoNimDeploymentSpec,
    };
    use dynamo_keystore::memory::MemoryKeyStore;

    fn dnd() -> DynamoNimDeployment {
        let mut d = DynamoNimDeployment::new(
            "llm-worker",
            DynamoNimDeploymentSpec {
                service_name: "worker".into(),
                dynamo_namespace: None,
                debug_routing: Some(DebugRoutingSpec {
                    listen_port: 8000,
                    header_name: "x-debug".into(),
                    header_value: "on".into(),
                    debug_backend: BackendSpec {
                        address: "dbg".into(),
                        port: 1,
                    },
                    production_backend: BackendSpec {
                        address: "prod".into(),
                        port: 2,
                    },
                }),
            },
        );
        d.metadata.namespace = Some("team-a".into());
        d.metadata.uid = Some("uid-1".into());
        d
    }

    #[test]
    fn finalizer_detection() {
        let mut d = dnd();
        assert!(!has_finalizer(&d));
        d.metadata.finalizers = Some(vec!["other".into(), FINALIZER.into()]);
        assert!(has_finalizer(&d));
    }

    #[test]
    fn config_map_is_owned_and_named_after_resource() {
        let d = dnd();
        let cm = envoy_config_map(&d, "static_resources: {}".into());
        assert_eq!(cm.metadata.name.as_deref(), Some("llm-worker-envoy-config"));
        assert_eq!(cm.metadata.namespace.as_deref(), Some("team-a"));
        let owners = cm.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "DynamoNimDeployment");
        assert_eq!(owners[0].uid, "uid-1");
        assert_eq!(owners[0].controller, Some(true));
        assert_eq!(
            cm.data.unwrap().get(ENVOY_CONFIG_KEY).map(String::as_str),
            Some("static_resources: {}")
        );
    }

    #[test]
    fn status_refresh_alone_is_not_a_change() {
        let a = readiness_status(true, true, Some(1), None, "t1");
        let b = readiness_status(true, true, Some(1), Some(&a), "t2");
        assert!(!status_changed(Some(&a), &b));

        let c = readiness_status(false, true, Some(1), Some(&b), "t3");
        assert!(status_changed(Some(&b), &c));
        assert!(status_changed(None, &c));
    }

    struct UnreachableStore;

    #[async_trait::async_trait]
    impl KeyStore for UnreachableStore {
        async fn delete_keys(
            &self,
            _cancel: &CancellationToken,
            _key_prefix: &str,
        ) -> dynamo_keystore::KeyStoreResult<()> {
            Err(KeyStoreError::Connection("etcd unreachable".into()))
        }
    }

    #[tokio::test]
    async fn release_drops_only_own_finalizer_after_retraction() {
        let store = MemoryKeyStore::new();
        store.put("/default/components/worker/a", "1").await;
        store.put("/default/components/other/a", "2").await;
        let mut d = dnd();
        d.metadata.finalizers = Some(vec!["other".into(), FINALIZER.into()]);

        let finals = release_finalizer(&store, &CancellationToken::new(), &d)
            .await
            .unwrap();

        assert_eq!(finals, Some(vec!["other".to_string()]));
        assert!(store.keys_with_prefix("/default/components/worker").await.is_empty());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn release_failure_keeps_finalizer() {
        let mut d = dnd();
        d.metadata.finalizers = Some(vec![FINALIZER.into()]);
        let err = release_finalizer(&UnreachableStore, &CancellationToken::new(), &d)
            .await
            .unwrap_err();
        assert!(matches!(err, KeyStoreError::Connection(_)));
    }

    #[tokio::test]
    async fn release_without_finalizer_skips_the_store() {
        let d = dnd();
        let res = release_finalizer(&UnreachableStore, &CancellationToken::new(), &d)
            .await
            .unwrap();
        assert_eq!(res, None);
    }

    #[test]
    fn finalizer_is_appended_once() {
        let mut d = dnd();
        d.metadata.finalizers = Some(vec!["other".into()]);
        assert_eq!(
            finalizers_to_add(&d).unwrap(),
            Some(vec!["other".to_string(), FINALIZER.to_string()])
        );
        d.metadata.finalizers = Some(vec!["other".into(), FINALIZER.into()]);
        assert_eq!(finalizers_to_add(&d).unwrap(), None);
    }

    #[test]
    fn invalid_identity_is_not_given_a_finalizer() {
        let mut d = dnd();
        d.spec.service_name = String::new();
        let err = finalizers_to_add(&d).unwrap_err();
        assert!(matches!(err, KeyStoreError::InvalidKey(_)));

        let mut d = dnd();
        d.spec.dynamo_namespace = Some("team\nb".into());
        assert!(finalizers_to_add(&d).is_err());
    }
}
