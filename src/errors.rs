//! Typed error hierarchy for the Aurora runtime.
//!
//! Three enums cover the three places a failure can originate:
//! - `ServiceError`: identifier resolution and request validation at the service boundary
//! - `ModelError`: a single backend call that did not produce text
//! - `CycleError`: a reflection cycle that produced no usable data
//!
//! Only `ServiceError` ever reaches a caller. `ModelError` is absorbed by the
//! fallback chain and `CycleError` becomes a `fail` burn outcome.

use thiserror::Error;

/// Errors surfaced by the persona, turn and burn services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Persona instance '{id}' not found or is not active")]
    InstanceNotFound { id: String },

    #[error("Persona blueprint '{id}' not found")]
    BlueprintNotFound { id: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Integrity check failed for persona '{id}'")]
    IntegrityCheckFailed { id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    /// Whether this error names an identifier the caller supplied.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::InstanceNotFound { .. } | ServiceError::BlueprintNotFound { .. }
        )
    }
}

/// Errors from one call against one model backend.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Backend did not answer within {secs}s")]
    Timeout { secs: u64 },

    #[error("Backend returned an empty completion")]
    EmptyResponse,

    #[error("Call budget exhausted for client '{client}'")]
    BudgetExhausted { client: String },
}

/// Errors that stop a reflection cycle from emitting a record.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Reflection cycle exceeded {secs}s")]
    TimedOut { secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_instance_not_found_carries_id() {
        let err = ServiceError::InstanceNotFound {
            id: "active_x_1".to_string(),
        };
        assert!(err.to_string().contains("active_x_1"));
        assert!(err.is_not_found());
    }

    #[test]
    fn service_error_other_is_not_a_not_found() {
        let err: ServiceError = anyhow::anyhow!("disk on fire").into();
        assert!(!err.is_not_found());
        assert!(matches!(err, ServiceError::Other(_)));
    }

    #[test]
    fn service_error_blueprint_not_found_is_matchable() {
        let err = ServiceError::BlueprintNotFound { id: "ghost".into() };
        match &err {
            ServiceError::BlueprintNotFound { id } => assert_eq!(id, "ghost"),
            _ => panic!("Expected BlueprintNotFound"),
        }
        assert!(err.is_not_found());
    }

    #[test]
    fn model_error_status_renders_code_and_body() {
        let err = ModelError::Status {
            code: 503,
            body: "overloaded".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("overloaded"));
    }

    #[test]
    fn cycle_error_timeout_names_limit() {
        let err = CycleError::TimedOut { secs: 300 };
        assert_eq!(err.to_string(), "Reflection cycle exceeded 300s");
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&ServiceError::InvalidRequest("x".into()));
        assert_std_error(&ModelError::EmptyResponse);
        assert_std_error(&CycleError::TimedOut { secs: 1 });
    }
}
