//! Validated service plan.

use serde::Serialize;

use crate::config::validation::{validate_services, ValidationError};
use crate::config::ServiceSpec;

/// An ordered service list that passed validation: exactly one foreground
/// service, placed last.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct SupervisorPlan {
    services: Vec<ServiceSpec>,
}

impl SupervisorPlan {
    pub fn new(services: Vec<ServiceSpec>) -> Result<Self, Vec<ValidationError>> {
        validate_services(&services)?;
        Ok(Self { services })
    }

    /// Services started before the foreground one, in launch order.
    pub fn auxiliaries(&self) -> &[ServiceSpec] {
        &self.services[..self.services.len() - 1]
    }

    pub fn foreground(&self) -> &ServiceSpec {
        &self.services[self.services.len() - 1]
    }

    pub fn into_services(self) -> Vec<ServiceSpec> {
        self.services
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_auxiliaries_from_foreground() {
        let plan = SupervisorPlan::new(vec![
            ServiceSpec::auxiliary("udevd", ["/sbin/udevd"]),
            ServiceSpec::auxiliary("haveged", ["/usr/sbin/haveged"]),
            ServiceSpec::foreground("sshd", ["/usr/sbin/sshd"]),
        ])
        .unwrap();

        let names: Vec<&str> = plan.auxiliaries().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["udevd", "haveged"]);
        assert_eq!(plan.foreground().name, "sshd");
    }

    #[test]
    fn foreground_only_plan_is_valid() {
        let plan = SupervisorPlan::new(vec![ServiceSpec::foreground("sh", ["/bin/sh"])]).unwrap();
        assert!(plan.auxiliaries().is_empty());
    }

    #[test]
    fn construction_fails_without_exactly_one_foreground() {
        assert!(SupervisorPlan::new(vec![ServiceSpec::auxiliary("a", ["/bin/true"])]).is_err());
        assert!(SupervisorPlan::new(vec![
            ServiceSpec::foreground("a", ["/bin/true"]),
            ServiceSpec::foreground("b", ["/bin/true"]),
        ])
        .is_err());
    }
}
