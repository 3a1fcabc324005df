use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct OperatorConfig {
    /// Namespace to watch; all namespaces when unset.
    /// Env: DYNAMO_OPERATOR_WATCH_NAMESPACE
    #[envconfig(from = "DYNAMO_OPERATOR_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Key store backend: etcd | memory. `memory` keeps keys in process and
    /// is for local runs and tests only.
    #[envconfig(from = "DYNAMO_OPERATOR_KEYSTORE", default = "etcd")]
    pub keystore: String,

    #[envconfig(from = "DYNAMO_OPERATOR_REQUEUE_SECS", default = "60")]
    pub requeue_secs: u64,

    #[envconfig(from = "DYNAMO_OPERATOR_ERROR_REQUEUE_SECS", default = "10")]
    pub error_requeue_secs: u64,

    /// Upper bound for one coordination-service cleanup during deletion.
    #[envconfig(
        from = "DYNAMO_OPERATOR_FINALIZE_TIMEOUT_SECS",
        default = "30"
    )]
    pub finalize_timeout_secs: u64,

    #[envconfig(nested)]
    pub etcd: EtcdConfig,
}

#[derive(Envconfig, Clone, Debug)]
pub struct EtcdConfig {
    /// Comma-separated list, e.g. "etcd-0:2379,etcd-1:2379"
    #[envconfig(from = "ETCD_ENDPOINTS", default = "127.0.0.1:2379")]
    pub endpoints: String,
    #[envconfig(from = "ETCD_USERNAME")]
    pub username: Option<String>,
    #[envconfig(from = "ETCD_PASSWORD")]
    pub password: Option<String>,
    #[envconfig(from = "ETCD_TIMEOUT_SECS", default = "5")]
    pub timeout_secs: u64,
}

impl EtcdConfig {
    pub fn endpoint_list(&self) -> Vec<String> {
        self.endpoints
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect()
    }
}
