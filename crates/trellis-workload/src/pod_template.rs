//! Pod template: the aggregation root shared by every workload
//!
//! A [`PodTemplate`] is mutable while it is being built. [`PodTemplate::resolve`]
//! reads the whole graph and produces an immutable [`PodSpec`]; it can run any
//! number of times and never changes the template.
//!
//! Volume names are checked in two places:
//! - explicit registration ([`PodTemplate::add_volume`]) rejects a distinct
//!   volume under a taken name immediately with `NameConflict`
//! - mounts register their volume only when the name is unknown, and
//!   resolution rejects any mount whose volume is not the one registered under
//!   its name with `VolumeNameCollision`

use std::collections::HashMap;

use tracing::debug;

use crate::container::{Container, ContainerMut, ContainerProps, ContainerRole};
use crate::error::WorkloadError;
use crate::k8s::{HostAlias, LocalObjectReference, PodMeta, PodSpec, PodTemplateSpec};
use crate::security::PodSecurityContext;
use crate::volume::{Volume, VolumeRegistry};

/// Pod restart policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Always restart
    Always,
    /// Restart only on non-zero exit
    OnFailure,
    /// Never restart
    Never,
}

impl RestartPolicy {
    /// Wire value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "Always",
            Self::OnFailure => "OnFailure",
            Self::Never => "Never",
        }
    }
}

/// Initial contents of a pod template
#[derive(Clone, Debug, Default)]
pub struct PodTemplateProps {
    /// Regular containers
    pub containers: Vec<ContainerProps>,
    /// Init containers
    pub init_containers: Vec<ContainerProps>,
    /// Volumes registered before any container
    pub volumes: Vec<Volume>,
    /// `/etc/hosts` entries
    pub host_aliases: Vec<HostAlias>,
    /// Pod security context
    pub security_context: PodSecurityContext,
    /// Restart policy
    pub restart_policy: Option<RestartPolicy>,
    /// Service account
    pub service_account_name: Option<String>,
    /// Mount the service account token
    pub automount_service_account_token: Option<bool>,
    /// Names of image pull secrets
    pub image_pull_secrets: Vec<String>,
}

/// Mutable description of a pod
#[derive(Clone, Debug, Default)]
pub struct PodTemplate {
    containers: Vec<Container>,
    init_containers: Vec<Container>,
    volumes: VolumeRegistry,
    host_aliases: Vec<HostAlias>,
    security_context: PodSecurityContext,
    restart_policy: Option<RestartPolicy>,
    service_account_name: Option<String>,
    automount_service_account_token: Option<bool>,
    image_pull_secrets: Vec<String>,
}

impl PodTemplate {
    /// Build a template from props.
    ///
    /// Volumes are registered first, then init containers, then regular
    /// containers, each in the order given.
    pub fn new(props: PodTemplateProps) -> Result<Self, WorkloadError> {
        let mut template = Self {
            host_aliases: props.host_aliases,
            security_context: props.security_context,
            restart_policy: props.restart_policy,
            service_account_name: props.service_account_name,
            automount_service_account_token: props.automount_service_account_token,
            image_pull_secrets: props.image_pull_secrets,
            ..Self::default()
        };
        for volume in &props.volumes {
            template.add_volume(volume)?;
        }
        for container in props.init_containers {
            template.add_init_container(container)?;
        }
        for container in props.containers {
            template.add_container(container)?;
        }
        Ok(template)
    }

    /// Add a regular container.
    ///
    /// Unnamed containers are called `main`, then `main-1`, `main-2`, ...
    /// Volumes referenced by the container's mounts are registered. Fails
    /// with `DuplicateContainerName` if another container in the pod already
    /// uses the name.
    pub fn add_container(&mut self, props: ContainerProps) -> Result<ContainerMut<'_>, WorkloadError> {
        let index = self.containers.len();
        let name = props
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| default_container_name(index));
        self.ensure_unused(&name, ContainerRole::Regular)?;
        let container = props.into_regular(name);
        Ok(self.attach(container, false))
    }

    /// Add an init container.
    ///
    /// Unnamed init containers are called `init-0`, `init-1`, ... Fails with
    /// `RoleViolation` if the props carry a probe and with
    /// `DuplicateContainerName` if the name is taken.
    pub fn add_init_container(&mut self, props: ContainerProps) -> Result<ContainerMut<'_>, WorkloadError> {
        let index = self.init_containers.len();
        let name = props
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("init-{}", index));
        self.ensure_unused(&name, ContainerRole::Init)?;
        let container = props.into_init(name)?;
        Ok(self.attach(container, true))
    }

    /// Container names are unique across both lists of a pod.
    fn ensure_unused(&self, name: &str, role: ContainerRole) -> Result<(), WorkloadError> {
        let taken = self
            .containers
            .iter()
            .chain(&self.init_containers)
            .any(|c| c.name() == name);
        if taken {
            return Err(WorkloadError::duplicate_container_name(name, role));
        }
        Ok(())
    }

    fn attach(&mut self, container: Container, init: bool) -> ContainerMut<'_> {
        for mount in container.mounts() {
            self.volumes.register_from_mount(mount.volume());
        }
        debug!(
            container = %container.name(),
            image = %container.image(),
            init,
            "Added container to pod template"
        );

        let list = if init {
            &mut self.init_containers
        } else {
            &mut self.containers
        };
        list.push(container);
        let index = list.len() - 1;
        ContainerMut::new(&mut list[index], &mut self.volumes)
    }

    /// Register a volume explicitly.
    ///
    /// Fails with `NameConflict` if a distinct volume already holds the name.
    pub fn add_volume(&mut self, volume: &Volume) -> Result<(), WorkloadError> {
        self.volumes.register(volume)
    }

    /// Add an `/etc/hosts` entry
    pub fn add_host_alias(&mut self, alias: HostAlias) {
        self.host_aliases.push(alias);
    }

    /// Pod security context
    pub fn security_context(&self) -> &PodSecurityContext {
        &self.security_context
    }

    /// Mutable pod security context
    pub fn security_context_mut(&mut self) -> &mut PodSecurityContext {
        &mut self.security_context
    }

    /// Restart policy, if set
    pub fn restart_policy(&self) -> Option<RestartPolicy> {
        self.restart_policy
    }

    /// Set the restart policy
    pub fn set_restart_policy(&mut self, policy: RestartPolicy) {
        self.restart_policy = Some(policy);
    }

    /// Set the service account
    pub fn set_service_account(&mut self, name: impl Into<String>) {
        self.service_account_name = Some(name.into());
    }

    /// Whether the service account token is mounted
    pub fn set_automount_service_account_token(&mut self, enabled: bool) {
        self.automount_service_account_token = Some(enabled);
    }

    /// Add an image pull secret by name
    pub fn add_image_pull_secret(&mut self, name: impl Into<String>) {
        self.image_pull_secrets.push(name.into());
    }

    /// Regular container by name
    pub fn container_mut(&mut self, name: &str) -> Option<ContainerMut<'_>> {
        let container = self.containers.iter_mut().find(|c| c.name() == name)?;
        Some(ContainerMut::new(container, &mut self.volumes))
    }

    /// Init container by name
    pub fn init_container_mut(&mut self, name: &str) -> Option<ContainerMut<'_>> {
        let container = self.init_containers.iter_mut().find(|c| c.name() == name)?;
        Some(ContainerMut::new(container, &mut self.volumes))
    }

    /// Regular containers in insertion order
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    /// Init containers in insertion order
    pub fn init_containers(&self) -> &[Container] {
        &self.init_containers
    }

    /// Registered volumes
    pub fn volumes(&self) -> &VolumeRegistry {
        &self.volumes
    }

    /// Host aliases in insertion order
    pub fn host_aliases(&self) -> &[HostAlias] {
        &self.host_aliases
    }

    /// Resolve the template into a pod spec
    pub fn resolve(&self) -> Result<PodSpec, WorkloadError> {
        if self.containers.is_empty() {
            return Err(WorkloadError::EmptyContainerSet);
        }

        let by_name: HashMap<&str, &Volume> =
            self.volumes.iter().map(|v| (v.name(), v)).collect();

        for container in self.containers.iter().chain(&self.init_containers) {
            for mount in container.mounts() {
                let mounted = mount.volume();
                let registered = by_name.get(mounted.name()).ok_or_else(|| {
                    WorkloadError::UnregisteredVolume {
                        container: container.name().to_string(),
                        volume: mounted.name().to_string(),
                    }
                })?;
                if !registered.same_as(mounted) {
                    return Err(WorkloadError::volume_name_collision(
                        mounted.name(),
                        registered.describe(),
                        mounted.describe(),
                    ));
                }
            }
        }

        let spec = PodSpec {
            containers: self.containers.iter().map(Container::to_spec).collect(),
            init_containers: self.init_containers.iter().map(Container::to_spec).collect(),
            volumes: self.volumes.iter().map(Volume::to_spec).collect(),
            security_context: self.security_context.to_spec(),
            host_aliases: self.host_aliases.clone(),
            restart_policy: self.restart_policy.map(|p| p.as_str().to_string()),
            service_account_name: self.service_account_name.clone(),
            automount_service_account_token: self.automount_service_account_token,
            image_pull_secrets: self
                .image_pull_secrets
                .iter()
                .map(|name| LocalObjectReference { name: name.clone() })
                .collect(),
        };

        debug!(
            containers = spec.containers.len(),
            init_containers = spec.init_containers.len(),
            volumes = spec.volumes.len(),
            "Resolved pod template"
        );

        Ok(spec)
    }

    /// Resolve into a pod template spec carrying `metadata`
    pub fn resolve_template(&self, metadata: PodMeta) -> Result<PodTemplateSpec, WorkloadError> {
        Ok(PodTemplateSpec {
            metadata,
            spec: self.resolve()?,
        })
    }
}

fn default_container_name(index: usize) -> String {
    if index == 0 {
        "main".to_string()
    } else {
        format!("main-{}", index)
    }
}
