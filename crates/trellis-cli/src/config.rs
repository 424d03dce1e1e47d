//! App file format.
//!
//! An app file describes one chart and its workloads:
//!
//! ```yaml
//! chart: shop
//! namespace: prod
//! labels:
//!   team: payments
//! workloads:
//!   - id: web
//!     kind: Deployment
//!     replicas: 3
//!     volumes:
//!       - configMap: { name: web-config }
//!     containers:
//!       - image: nginx:1.25
//!         mounts:
//!           - { volume: configmap-web-config, path: /etc/nginx/conf.d }
//! ```
//!
//! Mounts refer to volumes by their resolved name: the explicit `name` when
//! given, otherwise the name derived from the source (`configmap-<name>`,
//! `secret-<name>`, `pvc-<claim>`, `hostpath-<path>`).

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use trellis_workload::k8s::{ResourceRequirements, SecurityContext};

use crate::{Error, Result};

/// Top-level app file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Chart name; also the output file stem
    pub chart: String,
    /// Default namespace for every workload
    #[serde(default)]
    pub namespace: Option<String>,
    /// Labels applied to every workload
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Workloads in output order
    #[serde(default)]
    pub workloads: Vec<WorkloadConfig>,
}

impl AppConfig {
    /// Parse an app file from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(text)?;
        if config.chart.trim().is_empty() {
            return Err(Error::config("chart name must not be empty"));
        }
        Ok(config)
    }

    /// Read and parse an app file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::AppFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }
}

/// One workload, discriminated by `kind`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum WorkloadConfig {
    Pod(PodConfig),
    Deployment(DeploymentConfig),
    Job(JobConfig),
}

impl WorkloadConfig {
    pub fn pod(&self) -> &PodConfig {
        match self {
            Self::Pod(pod) => pod,
            Self::Deployment(d) => &d.pod,
            Self::Job(j) => &j.pod,
        }
    }
}

/// Fields shared by every workload kind
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodConfig {
    /// Chart-unique node id
    pub id: String,
    /// Explicit resource name (derived from chart and id when unset)
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub volumes: Vec<VolumeConfig>,
    #[serde(default)]
    pub containers: Vec<ContainerConfig>,
    #[serde(default)]
    pub init_containers: Vec<ContainerConfig>,
    #[serde(default)]
    pub host_aliases: Vec<HostAliasConfig>,
    #[serde(default)]
    pub security_context: Option<SecurityContextConfig>,
    #[serde(default)]
    pub restart_policy: Option<String>,
    #[serde(default)]
    pub service_account_name: Option<String>,
    #[serde(default)]
    pub automount_service_account_token: Option<bool>,
    #[serde(default)]
    pub image_pull_secrets: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    #[serde(flatten)]
    pub pod: PodConfig,
    #[serde(default)]
    pub replicas: Option<i32>,
    /// Selector labels; `app.kubernetes.io/name` is used when empty
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    #[serde(default)]
    pub pod_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub min_ready_seconds: Option<i32>,
    #[serde(default)]
    pub progress_deadline_seconds: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    #[serde(flatten)]
    pub pod: PodConfig,
    #[serde(default)]
    pub pod_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub backoff_limit: Option<i32>,
    #[serde(default)]
    pub active_deadline_seconds: Option<u64>,
    #[serde(default)]
    pub ttl_seconds_after_finished: Option<u64>,
    #[serde(default)]
    pub parallelism: Option<i32>,
    #[serde(default)]
    pub completions: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum StrategyConfig {
    Recreate,
    RollingUpdate {
        #[serde(default, rename = "maxSurge")]
        max_surge: Option<BoundConfig>,
        #[serde(default, rename = "maxUnavailable")]
        max_unavailable: Option<BoundConfig>,
    },
}

/// Rolling update bound written as a count (`1`) or text (`"25%"`)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BoundConfig {
    Count(u32),
    Text(String),
}

// =============================================================================
// Volumes
// =============================================================================

/// A volume; exactly one source must be set
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeConfig {
    /// Explicit volume name (required for emptyDir)
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config_map: Option<ProjectionConfig>,
    #[serde(default)]
    pub secret: Option<ProjectionConfig>,
    #[serde(default)]
    pub empty_dir: Option<EmptyDirConfig>,
    #[serde(default)]
    pub persistent_volume_claim: Option<PvcConfig>,
    #[serde(default)]
    pub host_path: Option<HostPathConfig>,
}

/// ConfigMap or Secret projection
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionConfig {
    pub name: String,
    /// Key → relative path
    #[serde(default)]
    pub items: BTreeMap<String, String>,
    #[serde(default)]
    pub default_mode: Option<i32>,
    #[serde(default)]
    pub optional: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyDirConfig {
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub size_limit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvcConfig {
    pub claim_name: String,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPathConfig {
    pub path: String,
    #[serde(default, rename = "type")]
    pub type_: Option<String>,
}

// =============================================================================
// Containers
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub image: String,
    /// Always, IfNotPresent or Never
    #[serde(default)]
    pub image_pull_policy: Option<String>,
    #[serde(default)]
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub ports: Vec<PortConfig>,
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
    #[serde(default)]
    pub security_context: Option<SecurityContext>,
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
    #[serde(default)]
    pub liveness_probe: Option<ProbeConfig>,
    #[serde(default)]
    pub readiness_probe: Option<ProbeConfig>,
    #[serde(default)]
    pub startup_probe: Option<ProbeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub container_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountConfig {
    /// Resolved name of a volume declared on the same workload
    pub volume: String,
    pub path: String,
    #[serde(default)]
    pub sub_path: Option<String>,
    #[serde(default)]
    pub read_only: Option<bool>,
}

/// A probe; exactly one handler must be set
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeConfig {
    #[serde(default)]
    pub http_get: Option<HttpGetConfig>,
    #[serde(default)]
    pub exec: Option<ExecConfig>,
    #[serde(default)]
    pub tcp_socket: Option<TcpSocketConfig>,
    #[serde(default)]
    pub initial_delay_seconds: Option<u64>,
    #[serde(default)]
    pub period_seconds: Option<u64>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub failure_threshold: Option<i32>,
    #[serde(default)]
    pub success_threshold: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpGetConfig {
    pub path: String,
    pub port: u16,
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecConfig {
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TcpSocketConfig {
    pub port: u16,
}

// =============================================================================
// Pod-level settings
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct HostAliasConfig {
    pub ip: String,
    pub hostnames: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContextConfig {
    #[serde(default)]
    pub run_as_non_root: bool,
    #[serde(default)]
    pub run_as_user: Option<i64>,
    #[serde(default)]
    pub run_as_group: Option<i64>,
    #[serde(default)]
    pub fs_group: Option<i64>,
    /// Always or OnRootMismatch
    #[serde(default)]
    pub fs_group_change_policy: Option<String>,
    #[serde(default)]
    pub sysctls: BTreeMap<String, String>,
}
