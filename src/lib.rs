//! Trellis - typed builders for Kubernetes workload manifests
//!
//! Workloads are assembled through mutable builders and resolved into
//! immutable documents when their chart is synthesized.
//!
//! # Crates
//!
//! - [`common`] - chart tree, deferred producers, metadata, telemetry
//! - [`workload`] - pod template, containers, volumes, probes, Pod
//! - [`deployment`] - Deployment and rollout strategies
//! - [`job`] - Job
//!
//! ```rust,ignore
//! use trellis::prelude::*;
//!
//! let mut chart = Chart::new("shop");
//! let web = chart.add("web", Deployment::new(DeploymentProps::default())?)?;
//! let config = Volume::from_config_map("web-config");
//! web.borrow_mut()
//!     .add_container(ContainerProps::new("nginx:1.25"))?
//!     .mount("/etc/nginx/conf.d", &config, MountOptions::read_only());
//! chart.synth()?.write_to("dist")?;
//! ```

pub use trellis_common as common;
pub use trellis_deployment as deployment;
pub use trellis_job as job;
pub use trellis_workload as workload;

/// Commonly used types
pub mod prelude {
    pub use trellis_common::{ApiObject, Chart, Handle, Manifest, ObjectMeta};
    pub use trellis_deployment::{
        Deployment, DeploymentError, DeploymentProps, DeploymentStrategy, PercentOrAbsolute,
        RollingUpdateOptions,
    };
    pub use trellis_job::{Job, JobProps};
    pub use trellis_workload::{
        ContainerProps, MountOptions, Pod, PodProps, PodTemplate, Probe, RestartPolicy, Volume,
        Workload, WorkloadError,
    };
}
