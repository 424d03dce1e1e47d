//! Rollout strategies
//!
//! Rolling update bounds are either a percentage of desired replicas or an
//! absolute pod count. On the wire a percentage is the string `"N%"` and a
//! count is a bare integer.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::DeploymentError;

/// Rolling update bound
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PercentOrAbsolute {
    /// Percentage of desired replicas
    Percent(u32),
    /// Absolute number of pods
    Absolute(u32),
}

impl PercentOrAbsolute {
    /// Whether the bound allows no pods at all
    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Percent(0) | Self::Absolute(0))
    }
}

impl fmt::Display for PercentOrAbsolute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(p) => write!(f, "{}%", p),
            Self::Absolute(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for PercentOrAbsolute {
    type Err = DeploymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_suffix('%') {
            Some(percent) => percent.trim().parse().map(Self::Percent),
            None => s.parse().map(Self::Absolute),
        };
        parsed.map_err(|_| {
            DeploymentError::strategy(format!(
                "'{}' is neither a percentage (e.g. 25%) nor a pod count",
                s
            ))
        })
    }
}

impl Serialize for PercentOrAbsolute {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Percent(_) => serializer.serialize_str(&self.to_string()),
            Self::Absolute(n) => serializer.serialize_u32(*n),
        }
    }
}

/// Bounds for a rolling update; unset bounds default to 25%
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RollingUpdateOptions {
    /// Pods that may be created above the desired count
    pub max_surge: Option<PercentOrAbsolute>,
    /// Pods that may be unavailable during the update
    pub max_unavailable: Option<PercentOrAbsolute>,
}

/// Validated rolling update bounds.
///
/// Only [`DeploymentStrategy::rolling_update`] builds one, so at least one
/// bound is always non-zero. The fields cannot be set from outside:
///
/// ```compile_fail
/// use trellis_deployment::{DeploymentStrategy, PercentOrAbsolute, RollingUpdate};
///
/// let _ = DeploymentStrategy::RollingUpdate(RollingUpdate {
///     max_surge: PercentOrAbsolute::Percent(0),
///     max_unavailable: PercentOrAbsolute::Absolute(0),
/// });
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RollingUpdate {
    max_surge: PercentOrAbsolute,
    max_unavailable: PercentOrAbsolute,
}

impl RollingUpdate {
    /// Pods that may be created above the desired count
    pub fn max_surge(&self) -> PercentOrAbsolute {
        self.max_surge
    }

    /// Pods that may be unavailable during the update
    pub fn max_unavailable(&self) -> PercentOrAbsolute {
        self.max_unavailable
    }
}

/// How a Deployment replaces old pods with new ones
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeploymentStrategy {
    /// Kill all old pods before creating new ones
    Recreate,
    /// Replace pods gradually within the given bounds
    RollingUpdate(RollingUpdate),
}

const DEFAULT_BOUND: PercentOrAbsolute = PercentOrAbsolute::Percent(25);

impl Default for DeploymentStrategy {
    fn default() -> Self {
        Self::RollingUpdate(RollingUpdate {
            max_surge: DEFAULT_BOUND,
            max_unavailable: DEFAULT_BOUND,
        })
    }
}

impl DeploymentStrategy {
    /// Recreate strategy
    pub fn recreate() -> Self {
        Self::Recreate
    }

    /// Rolling update strategy.
    ///
    /// Fails when both bounds are zero, since the rollout could never make
    /// progress.
    pub fn rolling_update(options: RollingUpdateOptions) -> Result<Self, DeploymentError> {
        let max_surge = options.max_surge.unwrap_or(DEFAULT_BOUND);
        let max_unavailable = options.max_unavailable.unwrap_or(DEFAULT_BOUND);
        if max_surge.is_zero() && max_unavailable.is_zero() {
            return Err(DeploymentError::strategy(format!(
                "maxSurge ({}) and maxUnavailable ({}) cannot both be zero",
                max_surge, max_unavailable
            )));
        }
        debug!(%max_surge, %max_unavailable, "Configured rolling update strategy");
        Ok(Self::RollingUpdate(RollingUpdate {
            max_surge,
            max_unavailable,
        }))
    }

    pub(crate) fn to_spec(self) -> StrategySpec {
        match self {
            Self::Recreate => StrategySpec {
                type_: "Recreate",
                rolling_update: None,
            },
            Self::RollingUpdate(bounds) => StrategySpec {
                type_: "RollingUpdate",
                rolling_update: Some(RollingUpdateSpec {
                    max_surge: bounds.max_surge,
                    max_unavailable: bounds.max_unavailable,
                }),
            },
        }
    }
}

/// Wire form of a strategy
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StrategySpec {
    #[serde(rename = "type")]
    type_: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    rolling_update: Option<RollingUpdateSpec>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct RollingUpdateSpec {
    max_surge: PercentOrAbsolute,
    max_unavailable: PercentOrAbsolute,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // =========================================================================
    // Story: Rolling update bounds
    // =========================================================================

    #[test]
    fn zero_percent_surge_and_zero_unavailable_is_rejected() {
        let err = DeploymentStrategy::rolling_update(RollingUpdateOptions {
            max_surge: Some(PercentOrAbsolute::Percent(0)),
            max_unavailable: Some(PercentOrAbsolute::Absolute(0)),
        })
        .unwrap_err();
        assert!(matches!(err, DeploymentError::StrategyConfiguration { .. }));
    }

    #[test]
    fn one_zero_bound_is_allowed() {
        let strategy = DeploymentStrategy::rolling_update(RollingUpdateOptions {
            max_surge: Some(PercentOrAbsolute::Percent(100)),
            max_unavailable: Some(PercentOrAbsolute::Absolute(0)),
        })
        .unwrap();
        assert_eq!(
            serde_json::to_value(strategy.to_spec()).unwrap(),
            json!({"type": "RollingUpdate", "rollingUpdate": {"maxSurge": "100%", "maxUnavailable": 0}})
        );
    }

    #[test]
    fn accepted_bounds_are_readable_and_never_both_zero() {
        let strategy = DeploymentStrategy::rolling_update(RollingUpdateOptions {
            max_surge: Some(PercentOrAbsolute::Percent(0)),
            max_unavailable: None,
        })
        .unwrap();
        let DeploymentStrategy::RollingUpdate(bounds) = strategy else {
            panic!("expected a rolling update, got {strategy:?}");
        };
        assert_eq!(bounds.max_surge(), PercentOrAbsolute::Percent(0));
        assert_eq!(bounds.max_unavailable(), PercentOrAbsolute::Percent(25));
        assert!(!(bounds.max_surge().is_zero() && bounds.max_unavailable().is_zero()));
    }

    #[test]
    fn unset_bounds_default_to_quarter() {
        let strategy = DeploymentStrategy::rolling_update(RollingUpdateOptions::default()).unwrap();
        assert_eq!(strategy, DeploymentStrategy::default());
    }

    #[test]
    fn recreate_has_no_rolling_update_block() {
        assert_eq!(
            serde_json::to_value(DeploymentStrategy::recreate().to_spec()).unwrap(),
            json!({"type": "Recreate"})
        );
    }

    // =========================================================================
    // Story: Parsing bounds from text
    // =========================================================================

    #[test]
    fn parses_percentages_and_counts() {
        assert_eq!("25%".parse::<PercentOrAbsolute>().unwrap(), PercentOrAbsolute::Percent(25));
        assert_eq!(" 3 ".parse::<PercentOrAbsolute>().unwrap(), PercentOrAbsolute::Absolute(3));
        assert!("quarter".parse::<PercentOrAbsolute>().is_err());
        assert!("-1".parse::<PercentOrAbsolute>().is_err());
    }
}
