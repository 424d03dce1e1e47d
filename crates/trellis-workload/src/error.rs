//! Workload construction error types
//!
//! Every variant is a correctness error in the caller's input. Messages name
//! the offending volume or container so the author knows what to fix.

use thiserror::Error;

use crate::container::{ContainerRole, ProbeKind};

/// Errors raised while building or resolving a pod template
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkloadError {
    /// A distinct volume was registered under a name that is already taken
    #[error("volume '{name}' is already registered ({existing}); cannot register {incoming} under the same name")]
    NameConflict {
        /// Shared volume name
        name: String,
        /// Source of the volume already registered
        existing: String,
        /// Source of the volume being registered
        incoming: String,
    },

    /// Mounts reference two distinct volumes that carry the same name
    #[error("volume name '{name}' is shared by distinct volumes: {first} and {second}")]
    VolumeNameCollision {
        /// Shared volume name
        name: String,
        /// Source of the volume registered under the name
        first: String,
        /// Source of the conflicting mounted volume
        second: String,
    },

    /// A probe was attached to an init container
    #[error("init container '{container}' cannot declare a {probe} probe")]
    RoleViolation {
        /// Init container name
        container: String,
        /// Probe kind that was rejected
        probe: ProbeKind,
    },

    /// A mount references a volume that is not registered on the template
    #[error("container '{container}' mounts volume '{volume}', which is not registered on the pod template")]
    UnregisteredVolume {
        /// Container carrying the mount
        container: String,
        /// Mounted volume name
        volume: String,
    },

    /// A container name is already used by another container in the pod
    #[error("{role} name '{name}' is already used in this pod template")]
    DuplicateContainerName {
        /// Duplicated name
        name: String,
        /// Role of the container being added
        role: ContainerRole,
    },

    /// Resolution was attempted with no regular containers
    #[error("pod template has no containers; at least one regular container is required")]
    EmptyContainerSet,
}

impl WorkloadError {
    /// Create a name conflict error
    pub fn name_conflict(
        name: impl Into<String>,
        existing: impl Into<String>,
        incoming: impl Into<String>,
    ) -> Self {
        Self::NameConflict {
            name: name.into(),
            existing: existing.into(),
            incoming: incoming.into(),
        }
    }

    /// Create a volume name collision error
    pub fn volume_name_collision(
        name: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::VolumeNameCollision {
            name: name.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create a role violation error
    pub fn role_violation(container: impl Into<String>, probe: ProbeKind) -> Self {
        Self::RoleViolation {
            container: container.into(),
            probe,
        }
    }

    /// Create a duplicate container name error
    pub fn duplicate_container_name(name: impl Into<String>, role: ContainerRole) -> Self {
        Self::DuplicateContainerName {
            name: name.into(),
            role,
        }
    }

    /// Volume name involved in this error, if any
    pub fn volume_name(&self) -> Option<&str> {
        match self {
            Self::NameConflict { name, .. } | Self::VolumeNameCollision { name, .. } => Some(name),
            Self::UnregisteredVolume { volume, .. } => Some(volume),
            _ => None,
        }
    }
}
