//! Volumes and the per-template volume registry
//!
//! A [`Volume`] is an immutable value with an identity assigned at
//! construction. Clones share that identity, so mounting a cloned volume is
//! mounting the same volume. Two separately constructed volumes are distinct
//! even when their names match, which is what the registry and pod template
//! resolution check for.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use trellis_common::names::sanitize_dns_label;
use tracing::debug;

use crate::error::WorkloadError;
use crate::k8s::{
    self, ConfigMapVolumeSource, EmptyDirVolumeSource, HostPathVolumeSource, KeyToPath,
    PvcVolumeSource, SecretVolumeSource,
};

static NEXT_VOLUME_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a volume object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VolumeId(u64);

impl VolumeId {
    fn next() -> Self {
        Self(NEXT_VOLUME_ID.fetch_add(1, Ordering::Relaxed))
    }
}

// =============================================================================
// Volume sources
// =============================================================================

/// Where a volume's content comes from
#[derive(Clone, Debug, PartialEq)]
pub enum VolumeSource {
    /// Keys of a ConfigMap projected as files
    ConfigMap(ConfigMapVolumeSource),
    /// Keys of a Secret projected as files
    Secret(SecretVolumeSource),
    /// Scratch space that lives as long as the pod
    EmptyDir(EmptyDirVolumeSource),
    /// A PersistentVolumeClaim
    PersistentVolumeClaim(PvcVolumeSource),
    /// A path on the node
    HostPath(HostPathVolumeSource),
}

impl VolumeSource {
    /// Short human-readable description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Self::ConfigMap(s) => format!("configMap '{}'", s.name),
            Self::Secret(s) => format!("secret '{}'", s.secret_name),
            Self::EmptyDir(_) => "emptyDir".to_string(),
            Self::PersistentVolumeClaim(s) => format!("persistentVolumeClaim '{}'", s.claim_name),
            Self::HostPath(s) => format!("hostPath '{}'", s.path),
        }
    }
}

/// Options for ConfigMap and Secret backed volumes
#[derive(Clone, Debug, Default)]
pub struct ProjectionOptions {
    /// Explicit volume name (derived from the source when unset)
    pub name: Option<String>,
    /// Key → relative path projections; all keys when empty
    pub items: BTreeMap<String, String>,
    /// Default mode bits for projected files
    pub default_mode: Option<i32>,
    /// Whether the source object may be missing
    pub optional: Option<bool>,
}

impl ProjectionOptions {
    fn key_to_paths(&self) -> Vec<KeyToPath> {
        self.items
            .iter()
            .map(|(key, path)| KeyToPath {
                key: key.clone(),
                path: path.clone(),
                mode: None,
            })
            .collect()
    }
}

// =============================================================================
// Volume
// =============================================================================

/// A mountable volume
#[derive(Clone, Debug)]
pub struct Volume {
    id: VolumeId,
    name: String,
    source: VolumeSource,
}

impl Volume {
    fn new(name: String, source: VolumeSource) -> Self {
        Self {
            id: VolumeId::next(),
            name,
            source,
        }
    }

    /// Volume backed by a ConfigMap, named `configmap-<name>`
    pub fn from_config_map(config_map: &str) -> Self {
        Self::from_config_map_with(config_map, ProjectionOptions::default())
    }

    /// Volume backed by a ConfigMap with projection options
    pub fn from_config_map_with(config_map: &str, options: ProjectionOptions) -> Self {
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| derived_name("configmap", config_map));
        Self::new(
            name,
            VolumeSource::ConfigMap(ConfigMapVolumeSource {
                name: config_map.to_string(),
                items: options.key_to_paths(),
                default_mode: options.default_mode,
                optional: options.optional,
            }),
        )
    }

    /// Volume backed by a Secret, named `secret-<name>`
    pub fn from_secret(secret: &str) -> Self {
        Self::from_secret_with(secret, ProjectionOptions::default())
    }

    /// Volume backed by a Secret with projection options
    pub fn from_secret_with(secret: &str, options: ProjectionOptions) -> Self {
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| derived_name("secret", secret));
        Self::new(
            name,
            VolumeSource::Secret(SecretVolumeSource {
                secret_name: secret.to_string(),
                items: options.key_to_paths(),
                default_mode: options.default_mode,
                optional: options.optional,
            }),
        )
    }

    /// Empty scratch volume
    pub fn from_empty_dir(name: impl Into<String>) -> Self {
        Self::from_empty_dir_with(name, EmptyDirVolumeSource::default())
    }

    /// Empty scratch volume with medium and size limit
    pub fn from_empty_dir_with(name: impl Into<String>, source: EmptyDirVolumeSource) -> Self {
        Self::new(name.into(), VolumeSource::EmptyDir(source))
    }

    /// Volume backed by a PVC, named `pvc-<claim>`
    pub fn from_pvc(claim_name: &str) -> Self {
        Self::from_pvc_with(claim_name, false)
    }

    /// Volume backed by a PVC, optionally read-only
    pub fn from_pvc_with(claim_name: &str, read_only: bool) -> Self {
        Self::new(
            derived_name("pvc", claim_name),
            VolumeSource::PersistentVolumeClaim(PvcVolumeSource {
                claim_name: claim_name.to_string(),
                read_only: read_only.then_some(true),
            }),
        )
    }

    /// Volume backed by a node path, named `hostpath-<path>`
    pub fn from_host_path(path: &str, type_: Option<String>) -> Self {
        Self::new(
            derived_name("hostpath", path),
            VolumeSource::HostPath(HostPathVolumeSource {
                path: path.to_string(),
                type_,
            }),
        )
    }

    /// Same source under an explicit name.
    ///
    /// Renaming yields a new volume identity.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self::new(name.into(), self.source)
    }

    /// Object identity
    pub fn id(&self) -> VolumeId {
        self.id
    }

    /// Volume name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Volume source
    pub fn source(&self) -> &VolumeSource {
        &self.source
    }

    /// Whether `other` is the same volume object
    pub fn same_as(&self, other: &Volume) -> bool {
        self.id == other.id
    }

    /// Description including name and source, used in error messages
    pub fn describe(&self) -> String {
        format!("volume '{}' from {}", self.name, self.source.describe())
    }

    /// Wire representation
    pub(crate) fn to_spec(&self) -> k8s::Volume {
        let name = self.name.clone();
        match &self.source {
            VolumeSource::ConfigMap(s) => k8s::Volume::from_config_map(name, s.clone()),
            VolumeSource::Secret(s) => k8s::Volume::from_secret(name, s.clone()),
            VolumeSource::EmptyDir(s) => k8s::Volume::from_empty_dir(name, s.clone()),
            VolumeSource::PersistentVolumeClaim(s) => k8s::Volume::from_pvc(name, s.clone()),
            VolumeSource::HostPath(s) => k8s::Volume::from_host_path(name, s.clone()),
        }
    }
}

fn derived_name(prefix: &str, reference: &str) -> String {
    sanitize_dns_label(&format!("{}-{}", prefix, sanitize_dns_label(reference)))
}

// =============================================================================
// Volume registry
// =============================================================================

/// Volumes registered on one pod template, keyed by name, in registration order
#[derive(Clone, Debug, Default)]
pub struct VolumeRegistry {
    volumes: Vec<Volume>,
}

impl VolumeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a volume explicitly.
    ///
    /// Fails with `NameConflict` if a distinct volume already holds the name.
    /// Registering the same volume object again is a no-op.
    pub fn register(&mut self, volume: &Volume) -> Result<(), WorkloadError> {
        match self.get(volume.name()) {
            Some(existing) if existing.same_as(volume) => Ok(()),
            Some(existing) => Err(WorkloadError::name_conflict(
                volume.name(),
                existing.source().describe(),
                volume.source().describe(),
            )),
            None => {
                debug!(volume = %volume.name(), source = %volume.source().describe(), "Registered volume");
                self.volumes.push(volume.clone());
                Ok(())
            }
        }
    }

    /// Register a volume as a side effect of mounting it.
    ///
    /// Registers only when the name is unknown and returns whether it did. A
    /// distinct volume under a taken name is left for resolution to reject, so
    /// the identity check sees every container's mounts together.
    pub fn register_from_mount(&mut self, volume: &Volume) -> bool {
        if self.get(volume.name()).is_some() {
            return false;
        }
        debug!(volume = %volume.name(), "Registered volume from mount");
        self.volumes.push(volume.clone());
        true
    }

    /// Volume registered under `name`
    pub fn get(&self, name: &str) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.name() == name)
    }

    /// Whether this exact volume object is registered
    pub fn contains(&self, volume: &Volume) -> bool {
        self.get(volume.name()).is_some_and(|v| v.same_as(volume))
    }

    /// Registered volumes in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Volume> {
        self.volumes.iter()
    }

    /// Number of registered volumes
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Whether no volume is registered
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Story: Volume naming and identity
    // =========================================================================

    #[test]
    fn derived_names_follow_source_reference() {
        assert_eq!(Volume::from_config_map("app-config").name(), "configmap-app-config");
        assert_eq!(Volume::from_secret("TLS.Certs").name(), "secret-tls-certs");
        assert_eq!(Volume::from_pvc("data").name(), "pvc-data");
        assert_eq!(
            Volume::from_host_path("/var/run/docker.sock", None).name(),
            "hostpath-var-run-docker-sock"
        );
    }

    #[test]
    fn explicit_name_overrides_derived_name() {
        let vol = Volume::from_config_map_with(
            "app-config",
            ProjectionOptions {
                name: Some("config".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(vol.name(), "config");
    }

    #[test]
    fn clones_share_identity_and_constructions_do_not() {
        let a = Volume::from_empty_dir("v");
        let b = Volume::from_empty_dir("v");
        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
    }

    #[test]
    fn renaming_creates_a_new_volume() {
        let a = Volume::from_empty_dir("v");
        let renamed = a.clone().with_name("w");
        assert_eq!(renamed.name(), "w");
        assert!(!renamed.same_as(&a));
    }

    #[test]
    fn spec_carries_source_payload() {
        let mut items = BTreeMap::new();
        items.insert("app.yaml".to_string(), "config/app.yaml".to_string());
        let vol = Volume::from_config_map_with(
            "settings",
            ProjectionOptions {
                items,
                default_mode: Some(0o444),
                ..Default::default()
            },
        );

        let json = serde_json::to_value(vol.to_spec()).unwrap();
        assert_eq!(json["name"], "configmap-settings");
        assert_eq!(json["configMap"]["name"], "settings");
        assert_eq!(json["configMap"]["items"][0]["key"], "app.yaml");
        assert_eq!(json["configMap"]["items"][0]["path"], "config/app.yaml");
        assert_eq!(json["configMap"]["defaultMode"], 0o444);
        assert!(json.get("secret").is_none());
    }

    #[test]
    fn read_only_pvc_sets_flag() {
        let json = serde_json::to_value(Volume::from_pvc_with("data", true).to_spec()).unwrap();
        assert_eq!(json["persistentVolumeClaim"]["claimName"], "data");
        assert_eq!(json["persistentVolumeClaim"]["readOnly"], true);
    }

    // =========================================================================
    // Story: Registration
    // =========================================================================

    #[test]
    fn explicit_registration_rejects_distinct_volume_with_same_name() {
        let mut registry = VolumeRegistry::new();
        registry.register(&Volume::from_empty_dir("v")).unwrap();

        let err = registry
            .register(&Volume::from_config_map_with(
                "settings",
                ProjectionOptions {
                    name: Some("v".to_string()),
                    ..Default::default()
                },
            ))
            .unwrap_err();

        assert!(matches!(err, WorkloadError::NameConflict { ref name, .. } if name == "v"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registering_the_same_volume_twice_is_a_no_op() {
        let mut registry = VolumeRegistry::new();
        let vol = Volume::from_empty_dir("v");
        registry.register(&vol).unwrap();
        registry.register(&vol.clone()).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn mount_registration_only_adds_unknown_names() {
        let mut registry = VolumeRegistry::new();
        let first = Volume::from_empty_dir("v");
        let other = Volume::from_empty_dir("v");

        assert!(registry.register_from_mount(&first));
        assert!(!registry.register_from_mount(&first));
        assert!(!registry.register_from_mount(&other));

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&first));
        assert!(!registry.contains(&other));
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut registry = VolumeRegistry::new();
        registry.register(&Volume::from_empty_dir("b")).unwrap();
        registry.register(&Volume::from_empty_dir("a")).unwrap();
        let names: Vec<_> = registry.iter().map(Volume::name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
