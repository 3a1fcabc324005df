//! Typed subset of the Envoy v3 bootstrap. Field order is serialization order.

use serde::Serialize;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct EnvoyBootstrap {
    pub static_resources: StaticResources,
    pub admin: Admin,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct StaticResources {
    pub listeners: Vec<Listener>,
    pub clusters: Vec<Cluster>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Listener {
    pub name: String,
    pub address: Address,
    pub filter_chains: Vec<FilterChain>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Address {
    pub socket_address: SocketAddress,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SocketAddress {
    pub address: String,
    pub port_value: u16,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct FilterChain {
    pub filters: Vec<NetworkFilter>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct NetworkFilter {
    pub name: String,
    pub typed_config: HttpConnectionManager,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HttpConnectionManager {
    #[serde(rename = "@type")]
    pub type_url: String,
    pub stat_prefix: String,
    pub access_log: Vec<TypedExtension>,
    pub http_filters: Vec<TypedExtension>,
    pub route_config: RouteConfiguration,
}

/// A named extension whose config carries only its type URL.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TypedExtension {
    pub name: String,
    pub typed_config: TypeUrl,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TypeUrl {
    #[serde(rename = "@type")]
    pub type_url: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RouteConfiguration {
    pub name: String,
    pub virtual_hosts: Vec<VirtualHost>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VirtualHost {
    pub name: String,
    pub domains: Vec<String>,
    /// Evaluated first match wins.
    pub routes: Vec<Route>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Route {
    #[serde(rename = "match")]
    pub match_: RouteMatch,
    pub route: RouteAction,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RouteMatch {
    pub prefix: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HeaderMatcher>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HeaderMatcher {
    pub name: String,
    pub exact_match: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RouteAction {
    pub cluster: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Cluster {
    pub name: String,
    pub connect_timeout: String,
    #[serde(rename = "type")]
    pub discovery_type: DiscoveryType,
    pub dns_lookup_family: DnsLookupFamily,
    pub lb_policy: LbPolicy,
    pub load_assignment: ClusterLoadAssignment,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryType {
    StrictDns,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DnsLookupFamily {
    V4Only,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LbPolicy {
    RoundRobin,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ClusterLoadAssignment {
    pub cluster_name: String,
    pub endpoints: Vec<LocalityLbEndpoints>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct LocalityLbEndpoints {
    pub lb_endpoints: Vec<LbEndpoint>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct LbEndpoint {
    pub endpoint: Endpoint,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Endpoint {
    pub address: Address,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Admin {
    pub access_log_path: String,
    pub address: Address,
}
