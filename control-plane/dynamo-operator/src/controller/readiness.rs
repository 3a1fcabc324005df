use k8s_openapi::api::apps::v1::Deployment;

use crate::crd::nim_deployment::ConditionStatus;

/// Condition name a Deployment reports once minimum availability is reached.
pub const AVAILABLE_CONDITION: &str = "Available";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadCondition {
    pub type_: String,
    pub status: ConditionStatus,
}

/// Owned snapshot of a workload's declared and observed state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkloadStatus {
    pub paused: bool,
    /// `None` means the replica count was never set.
    pub desired_replicas: Option<i32>,
    pub generation: i64,
    pub observed_generation: i64,
    pub updated_replicas: i32,
    pub available_replicas: i32,
    pub conditions: Vec<WorkloadCondition>,
}

impl WorkloadStatus {
    /// Status of the first condition named `type_`, if reported at all.
    pub fn condition(&self, type_: &str) -> Option<ConditionStatus> {
        self.conditions
            .iter()
            .find(|c| c.type_ == type_)
            .map(|c| c.status)
    }
}

impl From<&Deployment> for WorkloadStatus {
    fn from(d: &Deployment) -> Self {
        let spec = d.spec.as_ref();
        let status = d.status.as_ref();
        WorkloadStatus {
            paused: spec.and_then(|s| s.paused).unwrap_or(false),
            desired_replicas: spec.and_then(|s| s.replicas),
            generation: d.metadata.generation.unwrap_or(0),
            observed_generation: status
                .and_then(|s| s.observed_generation)
                .unwrap_or(0),
            updated_replicas: status
                .and_then(|s| s.updated_replicas)
                .unwrap_or(0),
            available_replicas: status
                .and_then(|s| s.available_replicas)
                .unwrap_or(0),
            conditions: status
                .and_then(|s| s.conditions.as_ref())
                .map(|conds| {
                    conds
                        .iter()
                        .map(|c| WorkloadCondition {
                            type_: c.type_.clone(),
                            status: ConditionStatus::from_k8s(&c.status),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Whether the workload has converged on its declared state.
///
/// A paused workload is never ready. With zero desired replicas only the
/// generations have to match; otherwise the rollout must be observed, fully
/// updated, fully available and report `Available=True`.
pub fn is_ready(status: Option<&WorkloadStatus>) -> bool {
    let Some(s) = status else {
        return false;
    };
    if s.paused {
        return false;
    }
    let generation_observed = s.observed_generation == s.generation;
    let desired = s.desired_replicas.unwrap_or(1);
    if desired == 0 {
        return generation_observed;
    }
    generation_observed
        && s.updated_replicas >= desired
        && s.available_replicas >= desired
        && s.condition(AVAILABLE_CONDITION) == Some(ConditionStatus::True)
}

pub fn is_deployment_ready(deployment: Option<&Deployment>) -> bool {
    is_ready(deployment.map(WorkloadStatus::from).as_ref())
}
