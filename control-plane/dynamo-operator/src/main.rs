use std::sync::Arc;

use dynamo_operator::{
    config::OperatorConfig, controller::run_controller, init_tracing,
    keystore::connect_keystore,
};
use envconfig::Envconfig;
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let cfg = OperatorConfig::init_from_env()?;
    info!(
        keystore = %cfg.keystore,
        namespace = ?cfg.watch_namespace,
        "Starting dynamo operator"
    );

    let store = connect_keystore(&cfg).await?;
    let client = Client::try_default().await?;

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            on_signal.cancel();
        }
    });

    run_controller(client, cfg, Arc::new(store), shutdown).await
}
