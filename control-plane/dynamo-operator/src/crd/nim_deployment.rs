use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::controller::finalizer::ResourceIdentity;
use crate::envoy::EnvoyConfigSpec;

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "nvidia.com",
    version = "v1alpha1",
    kind = "DynamoNimDeployment",
    plural = "dynamonimdeployments",
    shortname = "dnd",
    namespaced,
    status = "DynamoNimDeploymentStatus"
)]
pub struct DynamoNimDeploymentSpec {
    /// Component name registered in the coordination service
    #[schemars(length(min = 1), regex(pattern = r"^[^\x00-\x1F\x7F]+$"))]
    pub service_name: String,
    /// Logical Dynamo namespace; "default" when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(min = 1), regex(pattern = r"^[^\x00-\x1F\x7F]+$"))]
    pub dynamo_namespace: Option<String>,
    /// Header-based split between a debug and a production backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_routing: Option<DebugRoutingSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
pub struct DebugRoutingSpec {
    pub listen_port: u16,
    pub header_name: String,
    pub header_value: String,
    pub debug_backend: BackendSpec,
    pub production_backend: BackendSpec,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
pub struct BackendSpec {
    pub address: String,
    pub port: u16,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct DynamoNimDeploymentStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: ConditionType,
    pub status: ConditionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionType {
    Available,
    Progressing,
    Degraded,
    #[serde(other)]
    Unknown,
}

/// Kubernetes tri-state condition status. A condition that is missing from a
/// list is distinct from `False`; callers model that with `Option`.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    /// Parse the string form used by core API objects. Anything that is not
    /// exactly "True" or "False" is `Unknown`.
    pub fn from_k8s(s: &str) -> Self {
        match s {
            "True" => ConditionStatus::True,
            "False" => ConditionStatus::False,
            _ => ConditionStatus::Unknown,
        }
    }
}

impl DynamoNimDeployment {
    /// Identity under which this resource registers coordination-service keys.
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity {
            namespace: self.spec.dynamo_namespace.clone(),
            service_name: self.spec.service_name.clone(),
        }
    }

    pub fn envoy_config_map_name(&self) -> String {
        format!("{}-envoy-config", self.name_any())
    }
}

impl From<&DebugRoutingSpec> for EnvoyConfigSpec {
    fn from(r: &DebugRoutingSpec) -> Self {
        EnvoyConfigSpec {
            listen_port: r.listen_port,
            debug_header_name: r.header_name.clone(),
            debug_header_value: r.header_value.clone(),
            debug_server_address: r.debug_backend.address.clone(),
            debug_server_port: r.debug_backend.port,
            production_server_address: r.production_backend.address.clone(),
            production_server_port: r.production_backend.port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::CustomResourceExt;

    fn spec(ns: Option<&str>) -> DynamoNimDeploymentSpec {
        DynamoNimDeploymentSpec {
            service_name: "service1".into(),
            dynamo_namespace: ns.map(str::to_string),
            debug_routing: None,
        }
    }

    #[test]
    fn identity_uses_sentinel_namespace_when_unset() {
        let dnd = DynamoNimDeployment::new("dnd-a", spec(None));
        assert_eq!(dnd.identity().key_prefix(), "/default/components/service1");
    }

    #[test]
    fn identity_uses_explicit_dynamo_namespace() {
        let dnd = DynamoNimDeployment::new("dnd-a", spec(Some("llm")));
        assert_eq!(dnd.identity().key_prefix(), "/llm/components/service1");
    }

    #[test]
    fn crd_metadata() {
        let crd = DynamoNimDeployment::crd();
        assert_eq!(crd.spec.group, "nvidia.com");
        assert_eq!(crd.spec.names.kind, "DynamoNimDeployment");
        assert_eq!(crd.spec.names.plural, "dynamonimdeployments");
        assert_eq!(crd.spec.scope, "Namespaced");
    }

    #[test]
    fn crd_schema_rejects_empty_identity_fields() {
        let crd = serde_json::to_value(DynamoNimDeployment::crd()).unwrap();
        let spec = &crd["spec"]["versions"][0]["schema"]["openAPIV3Schema"]
            ["properties"]["spec"];
        for field in ["service_name", "dynamo_namespace"] {
            let prop = &spec["properties"][field];
            assert_eq!(prop["minLength"], 1, "{field}");
            assert_eq!(prop["pattern"], r"^[^\x00-\x1F\x7F]+$", "{field}");
        }
        assert_eq!(spec["required"], serde_json::json!(["service_name"]));
    }

    #[test]
    fn unknown_condition_status_strings_map_to_unknown() {
        assert_eq!(ConditionStatus::from_k8s("True"), ConditionStatus::True);
        assert_eq!(ConditionStatus::from_k8s("False"), ConditionStatus::False);
        assert_eq!(ConditionStatus::from_k8s("true"), ConditionStatus::Unknown);
        assert_eq!(ConditionStatus::from_k8s(""), ConditionStatus::Unknown);
    }

    #[test]
    fn debug_routing_maps_onto_envoy_spec() {
        let r = DebugRoutingSpec {
            listen_port: 8080,
            header_name: "x-debug".into(),
            header_value: "1".into(),
            debug_backend: BackendSpec {
                address: "dbg.svc".into(),
                port: 9000,
            },
            production_backend: BackendSpec {
                address: "prod.svc".into(),
                port: 9001,
            },
        };
        let e = EnvoyConfigSpec::from(&r);
        assert_eq!(e.listen_port, 8080);
        assert_eq!(e.debug_server_address, "dbg.svc");
        assert_eq!(e.production_server_port, 9001);
    }
}
