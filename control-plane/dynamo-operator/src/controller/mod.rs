use std::sync::Arc;

use dynamo_keystore::{KeyStore, KeyStoreError};
use futures_util::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    Api, Client, ResourceExt,
    runtime::{
        Controller, controller::Action, reflector::ObjectRef, watcher::Config,
    },
};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::OperatorConfig;
use crate::crd::nim_deployment::DynamoNimDeployment;
use crate::envoy::EnvoyConfigError;

pub mod finalizer;
pub mod readiness;
mod reconcile;
pub mod status;

pub use finalizer::{ResourceIdentity, finalize_resource};
pub use readiness::{WorkloadStatus, is_deployment_ready, is_ready};
pub use reconcile::{
    FINALIZER, envoy_config_map, has_finalizer, reconcile, status_changed,
};

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),
    #[error("key store cleanup failed: {0}")]
    KeyStore(#[from] KeyStoreError),
    #[error(transparent)]
    EnvoyConfig(#[from] EnvoyConfigError),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Clone)]
pub struct ControllerContext {
    pub client: Client,
    pub cfg: OperatorConfig,
    pub store: Arc<dyn KeyStore>,
    /// Cancelled on shutdown; in-flight cleanups observe it.
    pub shutdown: CancellationToken,
}

pub async fn run_controller(
    client: Client,
    cfg: OperatorConfig,
    store: Arc<dyn KeyStore>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let (api, deployments): (Api<DynamoNimDeployment>, Api<Deployment>) =
        match cfg.watch_namespace.as_deref() {
            Some(ns) => (
                Api::namespaced(client.clone(), ns),
                Api::namespaced(client.clone(), ns),
            ),
            None => (Api::all(client.clone()), Api::all(client.clone())),
        };
    info!(namespace = ?cfg.watch_namespace, "starting DynamoNimDeployment controller");

    let ctx = Arc::new(ControllerContext {
        client,
        cfg,
        store,
        shutdown,
    });

    // Workloads share the name of the resource that manages them.
    let workload_owner = |d: Deployment| {
        let ns = d.namespace()?;
        Some(ObjectRef::<DynamoNimDeployment>::new(&d.name_any()).within(&ns))
    };

    Controller::new(api, Config::default())
        .watches(deployments, Config::default(), workload_owner)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    info!(object = %obj_ref, "reconciled: requeue={:?}", action)
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

fn into_internal<E: std::fmt::Display>(e: E) -> ReconcileErr {
    ReconcileErr::Internal(e.to_string())
}

/// Render faults are programming errors and wait for a spec change; every
/// other failure is retried after the configured backoff.
pub fn requeue_after_error(err: &ReconcileErr, cfg: &OperatorConfig) -> Action {
    match err {
        ReconcileErr::EnvoyConfig(_) => Action::await_change(),
        _ => Action::requeue(Duration::from_secs(cfg.error_requeue_secs)),
    }
}

fn error_policy(
    _obj: Arc<DynamoNimDeployment>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    requeue_after_error(error, &ctx.cfg)
}
