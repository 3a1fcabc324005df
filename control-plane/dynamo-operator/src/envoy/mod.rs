//! Envoy bootstrap generation for header-based debug traffic splitting.
//!
//! Requests carrying `debug_header_name: debug_header_value` are sent to the
//! debug backend; everything else goes to production.

pub mod types;

use types::*;

pub const ENVOY_ADMIN_PORT: u16 = 9901;

pub const LISTENER_NAME: &str = "listener_0";
pub const DEBUG_CLUSTER: &str = "service_debug";
pub const PRODUCTION_CLUSTER: &str = "service_production";

const ANY_ADDRESS: &str = "0.0.0.0";
const CONNECT_TIMEOUT: &str = "0.25s";
const HCM_FILTER: &str = "envoy.filters.network.http_connection_manager";
const HCM_TYPE: &str = "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager";
const STDOUT_LOGGER: &str = "envoy.access_loggers.stdout";
const STDOUT_LOGGER_TYPE: &str =
    "type.googleapis.com/envoy.extensions.access_loggers.stream.v3.StdoutAccessLog";
const ROUTER_FILTER: &str = "envoy.filters.http.router";
const ROUTER_TYPE: &str =
    "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router";
const NULL_ACCESS_LOG: &str = "/dev/null";

#[derive(Debug, thiserror::Error)]
pub enum EnvoyConfigError {
    #[error("failed to render envoy config: {0}")]
    Render(#[from] serde_yaml::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvoyConfigSpec {
    pub listen_port: u16,
    pub debug_header_name: String,
    pub debug_header_value: String,
    pub debug_server_address: String,
    pub debug_server_port: u16,
    pub production_server_address: String,
    pub production_server_port: u16,
}

fn socket(address: &str, port: u16) -> Address {
    Address {
        socket_address: SocketAddress {
            address: address.to_string(),
            port_value: port,
        },
    }
}

fn typed(name: &str, type_url: &str) -> TypedExtension {
    TypedExtension {
        name: name.to_string(),
        typed_config: TypeUrl {
            type_url: type_url.to_string(),
        },
    }
}

fn route(cluster: &str, headers: Vec<HeaderMatcher>) -> Route {
    Route {
        match_: RouteMatch {
            prefix: "/".to_string(),
            headers,
        },
        route: RouteAction {
            cluster: cluster.to_string(),
        },
    }
}

fn cluster(name: &str, address: &str, port: u16) -> Cluster {
    Cluster {
        name: name.to_string(),
        connect_timeout: CONNECT_TIMEOUT.to_string(),
        discovery_type: DiscoveryType::StrictDns,
        dns_lookup_family: DnsLookupFamily::V4Only,
        lb_policy: LbPolicy::RoundRobin,
        load_assignment: ClusterLoadAssignment {
            cluster_name: name.to_string(),
            endpoints: vec![LocalityLbEndpoints {
                lb_endpoints: vec![LbEndpoint {
                    endpoint: Endpoint {
                        address: socket(address, port),
                    },
                }],
            }],
        },
    }
}

/// Assemble the bootstrap. The header route is placed ahead of the catch-all.
pub fn build_bootstrap(spec: &EnvoyConfigSpec) -> EnvoyBootstrap {
    let routes = vec![
        route(
            DEBUG_CLUSTER,
            vec![HeaderMatcher {
                name: spec.debug_header_name.clone(),
                exact_match: spec.debug_header_value.clone(),
            }],
        ),
        route(PRODUCTION_CLUSTER, Vec::new()),
    ];

    let hcm = HttpConnectionManager {
        type_url: HCM_TYPE.to_string(),
        stat_prefix: "ingress_http".to_string(),
        access_log: vec![typed(STDOUT_LOGGER, STDOUT_LOGGER_TYPE)],
        http_filters: vec![typed(ROUTER_FILTER, ROUTER_TYPE)],
        route_config: RouteConfiguration {
            name: "local_route".to_string(),
            virtual_hosts: vec![VirtualHost {
                name: "backend".to_string(),
                domains: vec!["*".to_string()],
                routes,
            }],
        },
    };

    EnvoyBootstrap {
        static_resources: StaticResources {
            listeners: vec![Listener {
                name: LISTENER_NAME.to_string(),
                address: socket(ANY_ADDRESS, spec.listen_port),
                filter_chains: vec![FilterChain {
                    filters: vec![NetworkFilter {
                        name: HCM_FILTER.to_string(),
                        typed_config: hcm,
                    }],
                }],
            }],
            clusters: vec![
                cluster(
                    DEBUG_CLUSTER,
                    &spec.debug_server_address,
                    spec.debug_server_port,
                ),
                cluster(
                    PRODUCTION_CLUSTER,
                    &spec.production_server_address,
                    spec.production_server_port,
                ),
            ],
        },
        admin: Admin {
            access_log_path: NULL_ACCESS_LOG.to_string(),
            address: socket(ANY_ADDRESS, ENVOY_ADMIN_PORT),
        },
    }
}

/// Render the Envoy bootstrap as YAML, trimmed at both ends.
pub fn generate_envoy_config(
    spec: &EnvoyConfigSpec,
) -> Result<String, EnvoyConfigError> {
    let yaml = serde_yaml::to_string(&build_bootstrap(spec))?;
    Ok(yaml.trim().to_string())
}
