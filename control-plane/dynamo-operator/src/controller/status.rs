use crate::crd::nim_deployment::{
    Condition, ConditionStatus, ConditionType, DynamoNimDeploymentStatus,
};

pub const PHASE_AVAILABLE: &str = "Available";
pub const PHASE_PROGRESSING: &str = "Progressing";

/// Status reported for one reconcile pass.
///
/// `last_transition_time` of the Available condition is carried over from
/// `prev` when its status did not change.
pub fn readiness_status(
    ready: bool,
    workload_found: bool,
    observed_generation: Option<i64>,
    prev: Option<&DynamoNimDeploymentStatus>,
    now: &str,
) -> DynamoNimDeploymentStatus {
    let (status, reason, message, phase) = match (workload_found, ready) {
        (false, _) => (
            ConditionStatus::False,
            "WorkloadMissing",
            "Deployment not found",
            PHASE_PROGRESSING,
        ),
        (true, false) => (
            ConditionStatus::False,
            "WorkloadNotReady",
            "Deployment has not converged",
            PHASE_PROGRESSING,
        ),
        (true, true) => (
            ConditionStatus::True,
            "WorkloadReady",
            "Deployment is available",
            PHASE_AVAILABLE,
        ),
    };

    let transition = prev
        .and_then(|p| p.conditions.as_ref())
        .and_then(|cs| cs.iter().find(|c| c.type_ == ConditionType::Available))
        .filter(|c| c.status == status)
        .and_then(|c| c.last_transition_time.clone())
        .unwrap_or_else(|| now.to_string());

    DynamoNimDeploymentStatus {
        ready: Some(ready),
        phase: Some(phase.into()),
        message: Some(message.into()),
        observed_generation,
        last_updated: Some(now.to_string()),
        conditions: Some(vec![Condition {
            type_: ConditionType::Available,
            status,
            reason: Some(reason.into()),
            message: Some(message.into()),
            last_transition_time: Some(transition),
        }]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available(s: &DynamoNimDeploymentStatus) -> &Condition {
        &s.conditions.as_ref().unwrap()[0]
    }

    #[test]
    fn ready_workload_reports_available() {
        let s = readiness_status(true, true, Some(2), None, "t1");
        assert_eq!(s.ready, Some(true));
        assert_eq!(s.phase.as_deref(), Some(PHASE_AVAILABLE));
        assert_eq!(s.observed_generation, Some(2));
        assert_eq!(available(&s).status, ConditionStatus::True);
        assert_eq!(available(&s).last_transition_time.as_deref(), Some("t1"));
    }

    #[test]
    fn missing_workload_is_progressing() {
        let s = readiness_status(false, false, Some(1), None, "t1");
        assert_eq!(s.ready, Some(false));
        assert_eq!(s.phase.as_deref(), Some(PHASE_PROGRESSING));
        assert_eq!(available(&s).reason.as_deref(), Some("WorkloadMissing"));
    }

    #[test]
    fn transition_time_kept_while_status_unchanged() {
        let first = readiness_status(true, true, Some(1), None, "t1");
        let second = readiness_status(true, true, Some(1), Some(&first), "t2");
        assert_eq!(available(&second).last_transition_time.as_deref(), Some("t1"));
        assert_eq!(second.last_updated.as_deref(), Some("t2"));

        let third = readiness_status(false, true, Some(1), Some(&second), "t3");
        assert_eq!(available(&third).last_transition_time.as_deref(), Some("t3"));
    }
}
