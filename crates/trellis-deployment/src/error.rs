//! Deployment error types

use thiserror::Error;
use trellis_workload::WorkloadError;

/// Errors raised while building or resolving a Deployment
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeploymentError {
    /// Rollout strategy bounds are unusable
    #[error("invalid rollout strategy: {message}")]
    StrategyConfiguration {
        /// What is wrong with the strategy
        message: String,
    },

    /// No selector labels and the default selector is disabled
    #[error("deployment '{name}' has an empty label selector")]
    EmptySelector {
        /// Deployment name
        name: String,
    },

    /// Error from the owned pod template
    #[error(transparent)]
    Workload(#[from] WorkloadError),
}

impl DeploymentError {
    /// Create a strategy configuration error
    pub fn strategy(msg: impl Into<String>) -> Self {
        Self::StrategyConfiguration {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workload_errors_pass_through_unchanged() {
        let err: DeploymentError = WorkloadError::EmptyContainerSet.into();
        assert_eq!(err.to_string(), WorkloadError::EmptyContainerSet.to_string());
    }

    #[test]
    fn strategy_error_display() {
        let err = DeploymentError::strategy("maxSurge and maxUnavailable are both zero");
        assert!(err.to_string().contains("both zero"));
    }
}
