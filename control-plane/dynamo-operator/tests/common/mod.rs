#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use dynamo_operator::config::OperatorConfig;
use envconfig::Envconfig;
use kube::Api;
use kube::api::DeleteParams;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use dynamo_operator::crd::nim_deployment::DynamoNimDeployment;

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

pub fn test_config(ns: &str) -> OperatorConfig {
    OperatorConfig::init_from_hashmap(&HashMap::from([
        ("DYNAMO_OPERATOR_WATCH_NAMESPACE".to_string(), ns.to_string()),
        ("DYNAMO_OPERATOR_KEYSTORE".to_string(), "memory".to_string()),
        ("DYNAMO_OPERATOR_REQUEUE_SECS".to_string(), "2".to_string()),
        ("DYNAMO_OPERATOR_ERROR_REQUEUE_SECS".to_string(), "1".to_string()),
    ]))
    .expect("test config")
}

/// Poll `check` once per second until it holds or `secs` elapse.
pub async fn wait_until<F, Fut>(secs: u64, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..secs {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    false
}

/// Stops the controller and removes the test resource on drop.
pub struct ControllerGuard {
    pub api: Api<DynamoNimDeployment>,
    pub name: String,
    pub shutdown: CancellationToken,
    pub handle: Option<JoinHandle<()>>,
}

impl Drop for ControllerGuard {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(h) = self.handle.take() {
            h.abort();
        }
        let api = self.api.clone();
        let name = self.name.clone();
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            rt.spawn(async move {
                let _ = api.delete(&name, &DeleteParams::default()).await;
            });
        }
    }
}
