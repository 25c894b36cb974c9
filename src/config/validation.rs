//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce the single trailing foreground service
//! - Validate value ranges (timeouts > 0, delays within timeouts)
//! - Detect duplicate service names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: &[ServiceSpec] → Result<(), Vec<ValidationError>>
//! - Runs before any process is launched

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{ReadinessCheck, ServiceSpec, SupervisorConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no services configured")]
    NoServices,

    #[error("no service is marked foreground")]
    NoForeground,

    #[error("more than one foreground service: {}", .0.join(", "))]
    MultipleForeground(Vec<String>),

    #[error("foreground service `{0}` must be the last entry")]
    ForegroundNotLast(String),

    #[error("service #{0} has an empty name")]
    EmptyName(usize),

    #[error("duplicate service name `{0}`")]
    DuplicateName(String),

    #[error("service `{0}` has an empty command")]
    EmptyCommand(String),

    #[error("service `{0}` has a zero readiness timeout")]
    ZeroTimeout(String),

    #[error("service `{service}` delay of {delay_ms}ms does not fit in its {timeout_ms}ms readiness timeout")]
    DelayExceedsTimeout {
        service: String,
        delay_ms: u64,
        timeout_ms: u64,
    },

    #[error("service `{service}` settle time of {settle_ms}ms does not fit in its {timeout_ms}ms readiness timeout")]
    SettleExceedsTimeout {
        service: String,
        settle_ms: u64,
        timeout_ms: u64,
    },

    #[error("service `{0}` has a zero poll interval")]
    ZeroPollInterval(String),

    #[error("shutdown grace period must be greater than zero")]
    ZeroShutdownGrace,
}

/// Validate a whole configuration file.
pub fn validate_config(config: &SupervisorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = match validate_services(&config.services) {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    };

    if config.supervisor.shutdown_grace_ms == 0 {
        errors.push(ValidationError::ZeroShutdownGrace);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate an ordered service list.
pub fn validate_services(services: &[ServiceSpec]) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if services.is_empty() {
        return Err(vec![ValidationError::NoServices]);
    }

    let foreground: Vec<&ServiceSpec> = services.iter().filter(|s| s.foreground).collect();
    match foreground.as_slice() {
        [] => errors.push(ValidationError::NoForeground),
        [only] => {
            let is_last = services.last().map(|s| s.name == only.name && s.foreground);
            if is_last != Some(true) {
                errors.push(ValidationError::ForegroundNotLast(only.name.clone()));
            }
        }
        many => errors.push(ValidationError::MultipleForeground(
            many.iter().map(|s| s.name.clone()).collect(),
        )),
    }

    let mut seen = HashSet::new();
    for (index, service) in services.iter().enumerate() {
        if service.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName(index));
        } else if !seen.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateName(service.name.clone()));
        }

        if service.program().map_or(true, |p| p.is_empty()) {
            errors.push(ValidationError::EmptyCommand(service.name.clone()));
        }

        if service.ready_timeout_ms == 0 {
            errors.push(ValidationError::ZeroTimeout(service.name.clone()));
        }

        match &service.readiness {
            Some(ReadinessCheck::Delay { delay_ms }) if *delay_ms >= service.ready_timeout_ms => {
                errors.push(ValidationError::DelayExceedsTimeout {
                    service: service.name.clone(),
                    delay_ms: *delay_ms,
                    timeout_ms: service.ready_timeout_ms,
                });
            }
            Some(ReadinessCheck::ProcessAlive { settle_ms }) if *settle_ms >= service.ready_timeout_ms => {
                errors.push(ValidationError::SettleExceedsTimeout {
                    service: service.name.clone(),
                    settle_ms: *settle_ms,
                    timeout_ms: service.ready_timeout_ms,
                });
            }
            Some(ReadinessCheck::FileExists { poll_ms: 0, .. }) => {
                errors.push(ValidationError::ZeroPollInterval(service.name.clone()));
            }
            _ => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn aux(name: &str) -> ServiceSpec {
        ServiceSpec::auxiliary(name, ["/bin/true"])
    }

    fn fg(name: &str) -> ServiceSpec {
        ServiceSpec::foreground(name, ["/bin/true"])
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&SupervisorConfig::default()).is_ok());
    }

    #[test]
    fn empty_plan_is_rejected() {
        assert_eq!(validate_services(&[]), Err(vec![ValidationError::NoServices]));
    }

    #[test]
    fn missing_foreground_is_rejected() {
        let errors = validate_services(&[aux("a"), aux("b")]).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoForeground]);
    }

    #[test]
    fn multiple_foreground_is_rejected() {
        let errors = validate_services(&[aux("a"), fg("b"), fg("c")]).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MultipleForeground(vec!["b".into(), "c".into()])]
        );
    }

    #[test]
    fn foreground_must_be_last() {
        let errors = validate_services(&[fg("main"), aux("a")]).unwrap_err();
        assert_eq!(errors, vec![ValidationError::ForegroundNotLast("main".into())]);
    }

    #[test]
    fn collects_every_problem() {
        let mut empty = aux("a");
        empty.command.clear();
        let slow = aux("slow")
            .with_ready_timeout(Duration::from_millis(100))
            .with_readiness(ReadinessCheck::Delay { delay_ms: 500 });

        let errors = validate_services(&[empty, aux("a"), slow, fg("main")]).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyCommand("a".into()),
                ValidationError::DuplicateName("a".into()),
                ValidationError::DelayExceedsTimeout {
                    service: "slow".into(),
                    delay_ms: 500,
                    timeout_ms: 100,
                },
            ]
        );
    }

    #[test]
    fn probe_durations_must_fit_in_the_timeout() {
        let settle = aux("settle")
            .with_ready_timeout(Duration::from_millis(100))
            .with_readiness(ReadinessCheck::ProcessAlive { settle_ms: 500 });
        let exact = aux("exact")
            .with_ready_timeout(Duration::from_millis(100))
            .with_readiness(ReadinessCheck::Delay { delay_ms: 100 });
        let fits = aux("fits")
            .with_ready_timeout(Duration::from_millis(100))
            .with_readiness(ReadinessCheck::ProcessAlive { settle_ms: 99 });

        let errors = validate_services(&[settle, exact, fits, fg("main")]).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::SettleExceedsTimeout {
                    service: "settle".into(),
                    settle_ms: 500,
                    timeout_ms: 100,
                },
                ValidationError::DelayExceedsTimeout {
                    service: "exact".into(),
                    delay_ms: 100,
                    timeout_ms: 100,
                },
            ]
        );
    }

    #[test]
    fn zero_grace_is_rejected() {
        let mut config = SupervisorConfig::default();
        config.supervisor.shutdown_grace_ms = 0;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::ZeroShutdownGrace])
        );
    }

    #[test]
    fn error_messages_name_the_service() {
        let err = ValidationError::MultipleForeground(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "more than one foreground service: a, b");
    }
}
