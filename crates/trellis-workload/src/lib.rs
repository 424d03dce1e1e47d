//! Pod template builder for Trellis workloads
//!
//! Workloads (Pod, Deployment, Job) each own a [`PodTemplate`]. The template
//! is built up with containers, init containers, volumes and pod-level
//! settings, then resolved into a [`k8s::PodSpec`] when the chart is
//! synthesized.
//!
//! - [`volume`] - volumes and the per-template registry
//! - [`mount`] - container-to-volume bindings
//! - [`container`] - container builder and probe slots
//! - [`probe`] - health probes
//! - [`security`] - pod security context
//! - [`pod_template`] - aggregation and resolution
//! - [`workload`] - capability trait implemented by every adapter
//! - [`pod`] - standalone Pod resource
//! - [`k8s`] - wire types

#![deny(missing_docs)]

pub mod container;
pub mod error;
pub mod k8s;
pub mod mount;
pub mod pod;
pub mod pod_template;
pub mod probe;
pub mod security;
pub mod volume;
pub mod workload;

pub use container::{Container, ContainerMut, ContainerProps, ContainerRole, ImagePullPolicy, ProbeKind};
pub use error::WorkloadError;
pub use mount::{Mount, MountOptions};
pub use pod::{Pod, PodProps};
pub use pod_template::{PodTemplate, PodTemplateProps, RestartPolicy};
pub use probe::Probe;
pub use security::{FsGroupChangePolicy, PodSecurityContext};
pub use volume::{ProjectionOptions, Volume, VolumeId, VolumeRegistry, VolumeSource};
pub use workload::Workload;
