//! Container builder
//!
//! [`ContainerProps`] describes a container before it joins a pod template.
//! Once added, the template hands out [`ContainerMut`], which pairs the
//! container with the template's volume registry so that mounting a volume
//! also registers it.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::error::WorkloadError;
use crate::k8s::{self, ContainerPort, EnvVar, ResourceRequirements, SecurityContext};
use crate::mount::{Mount, MountOptions};
use crate::probe::Probe;
use crate::volume::{Volume, VolumeRegistry};

// =============================================================================
// Roles and enums
// =============================================================================

/// Whether a container runs to completion before the others or alongside them
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerRole {
    /// Long-running application container
    Regular,
    /// Runs to completion before regular containers start
    Init,
}

impl fmt::Display for ContainerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regular => f.write_str("container"),
            Self::Init => f.write_str("init container"),
        }
    }
}

/// Probe slot on a container
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeKind {
    /// Restarts the container on failure
    Liveness,
    /// Removes the pod from endpoints on failure
    Readiness,
    /// Holds back the other probes until it passes
    Startup,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Liveness => "liveness",
            Self::Readiness => "readiness",
            Self::Startup => "startup",
        };
        f.write_str(s)
    }
}

/// Image pull policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImagePullPolicy {
    /// Pull on every start
    Always,
    /// Pull only when the image is missing on the node
    IfNotPresent,
    /// Never pull
    Never,
}

impl ImagePullPolicy {
    /// Wire value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "Always",
            Self::IfNotPresent => "IfNotPresent",
            Self::Never => "Never",
        }
    }

    /// Default for an image reference: `Always` for `:latest` or untagged
    /// images, `IfNotPresent` otherwise.
    pub fn default_for(image: &str) -> Self {
        if image.contains('@') {
            return Self::IfNotPresent;
        }
        let last_segment = image.rsplit('/').next().unwrap_or(image);
        match last_segment.rsplit_once(':') {
            Some((_, "latest")) | None => Self::Always,
            Some(_) => Self::IfNotPresent,
        }
    }
}

// =============================================================================
// ContainerProps
// =============================================================================

/// Container description used to add a container to a pod template
#[derive(Clone, Debug)]
pub struct ContainerProps {
    name: Option<String>,
    image: String,
    image_pull_policy: Option<ImagePullPolicy>,
    command: Option<Vec<String>>,
    args: Option<Vec<String>>,
    working_dir: Option<String>,
    env: Vec<EnvVar>,
    ports: Vec<ContainerPort>,
    resources: Option<ResourceRequirements>,
    security_context: Option<SecurityContext>,
    mounts: Vec<Mount>,
    liveness: Option<Probe>,
    readiness: Option<Probe>,
    startup: Option<Probe>,
}

impl ContainerProps {
    /// Container running `image`
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            name: None,
            image: image.into(),
            image_pull_policy: None,
            command: None,
            args: None,
            working_dir: None,
            env: Vec::new(),
            ports: Vec::new(),
            resources: None,
            security_context: None,
            mounts: Vec::new(),
            liveness: None,
            readiness: None,
            startup: None,
        }
    }

    /// Explicit container name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Entrypoint override
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = Some(command.into_iter().map(Into::into).collect());
        self
    }

    /// Arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Working directory
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Literal environment variable
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push(EnvVar::literal(name, value));
        self
    }

    /// Exposed port
    pub fn with_port(mut self, port: ContainerPort) -> Self {
        self.ports.push(port);
        self
    }

    /// Resource requests and limits
    pub fn with_resources(mut self, resources: ResourceRequirements) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Container security context
    pub fn with_security_context(mut self, security_context: SecurityContext) -> Self {
        self.security_context = Some(security_context);
        self
    }

    /// Image pull policy
    pub fn with_image_pull_policy(mut self, policy: ImagePullPolicy) -> Self {
        self.image_pull_policy = Some(policy);
        self
    }

    /// Mount `volume` at `path`; the volume is registered when the container
    /// is added to a template.
    pub fn with_mount(mut self, path: impl Into<String>, volume: &Volume, options: MountOptions) -> Self {
        self.mounts.push(Mount::new(path, volume, options));
        self
    }

    /// Liveness probe
    pub fn with_liveness(mut self, probe: Probe) -> Self {
        self.liveness = Some(probe);
        self
    }

    /// Readiness probe
    pub fn with_readiness(mut self, probe: Probe) -> Self {
        self.readiness = Some(probe);
        self
    }

    /// Startup probe
    pub fn with_startup(mut self, probe: Probe) -> Self {
        self.startup = Some(probe);
        self
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Probe slots that are filled
    fn probe_kinds(&self) -> impl Iterator<Item = ProbeKind> + '_ {
        [
            (ProbeKind::Liveness, self.liveness.is_some()),
            (ProbeKind::Readiness, self.readiness.is_some()),
            (ProbeKind::Startup, self.startup.is_some()),
        ]
        .into_iter()
        .filter_map(|(kind, set)| set.then_some(kind))
    }

    pub(crate) fn into_regular(self, name: String) -> Container {
        self.build(name, ContainerRole::Regular)
    }

    pub(crate) fn into_init(self, name: String) -> Result<Container, WorkloadError> {
        if let Some(kind) = self.probe_kinds().next() {
            return Err(WorkloadError::role_violation(name, kind));
        }
        Ok(self.build(name, ContainerRole::Init))
    }

    fn build(self, name: String, role: ContainerRole) -> Container {
        Container {
            name,
            role,
            image: self.image,
            image_pull_policy: self.image_pull_policy,
            command: self.command,
            args: self.args,
            working_dir: self.working_dir,
            env: self.env,
            ports: self.ports,
            resources: self.resources,
            security_context: self.security_context,
            mounts: self.mounts,
            liveness: self.liveness,
            readiness: self.readiness,
            startup: self.startup,
        }
    }
}

// =============================================================================
// Container
// =============================================================================

/// A container attached to a pod template
#[derive(Clone, Debug)]
pub struct Container {
    name: String,
    role: ContainerRole,
    image: String,
    image_pull_policy: Option<ImagePullPolicy>,
    command: Option<Vec<String>>,
    args: Option<Vec<String>>,
    working_dir: Option<String>,
    env: Vec<EnvVar>,
    ports: Vec<ContainerPort>,
    resources: Option<ResourceRequirements>,
    security_context: Option<SecurityContext>,
    mounts: Vec<Mount>,
    liveness: Option<Probe>,
    readiness: Option<Probe>,
    startup: Option<Probe>,
}

impl Container {
    /// Container name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Regular or init
    pub fn role(&self) -> ContainerRole {
        self.role
    }

    /// Image reference
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Mounts in the order they were added
    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    /// Probe in `kind`'s slot
    pub fn probe(&self, kind: ProbeKind) -> Option<&Probe> {
        match kind {
            ProbeKind::Liveness => self.liveness.as_ref(),
            ProbeKind::Readiness => self.readiness.as_ref(),
            ProbeKind::Startup => self.startup.as_ref(),
        }
    }

    /// Attach a probe.
    ///
    /// Init containers run to completion, so any probe on them is rejected.
    pub fn set_probe(&mut self, kind: ProbeKind, probe: Probe) -> Result<(), WorkloadError> {
        if self.role == ContainerRole::Init {
            return Err(WorkloadError::role_violation(&self.name, kind));
        }
        let slot = match kind {
            ProbeKind::Liveness => &mut self.liveness,
            ProbeKind::Readiness => &mut self.readiness,
            ProbeKind::Startup => &mut self.startup,
        };
        *slot = Some(probe);
        Ok(())
    }

    /// Attach a liveness probe
    pub fn set_liveness(&mut self, probe: Probe) -> Result<(), WorkloadError> {
        self.set_probe(ProbeKind::Liveness, probe)
    }

    /// Attach a readiness probe
    pub fn set_readiness(&mut self, probe: Probe) -> Result<(), WorkloadError> {
        self.set_probe(ProbeKind::Readiness, probe)
    }

    /// Attach a startup probe
    pub fn set_startup(&mut self, probe: Probe) -> Result<(), WorkloadError> {
        self.set_probe(ProbeKind::Startup, probe)
    }

    /// Add a literal environment variable
    pub fn add_env(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env.push(EnvVar::literal(name, value));
    }

    /// Add an exposed port
    pub fn add_port(&mut self, port: ContainerPort) {
        self.ports.push(port);
    }

    /// Replace the entrypoint
    pub fn set_command(&mut self, command: Vec<String>) {
        self.command = Some(command);
    }

    /// Replace the arguments
    pub fn set_args(&mut self, args: Vec<String>) {
        self.args = Some(args);
    }

    /// Set resource requests and limits
    pub fn set_resources(&mut self, resources: ResourceRequirements) {
        self.resources = Some(resources);
    }

    /// Set the container security context
    pub fn set_security_context(&mut self, security_context: SecurityContext) {
        self.security_context = Some(security_context);
    }

    /// Set the image pull policy
    pub fn set_image_pull_policy(&mut self, policy: ImagePullPolicy) {
        self.image_pull_policy = Some(policy);
    }

    pub(crate) fn to_spec(&self) -> k8s::Container {
        let pull_policy = self
            .image_pull_policy
            .unwrap_or_else(|| ImagePullPolicy::default_for(&self.image));
        k8s::Container {
            name: self.name.clone(),
            image: self.image.clone(),
            image_pull_policy: Some(pull_policy.as_str().to_string()),
            command: self.command.clone(),
            args: self.args.clone(),
            working_dir: self.working_dir.clone(),
            env: self.env.clone(),
            ports: self.ports.clone(),
            resources: self.resources.clone(),
            liveness_probe: self.liveness.as_ref().map(Probe::to_spec),
            readiness_probe: self.readiness.as_ref().map(Probe::to_spec),
            startup_probe: self.startup.as_ref().map(Probe::to_spec),
            volume_mounts: self.mounts.iter().map(Mount::to_spec).collect(),
            security_context: self.security_context.clone(),
        }
    }
}

// =============================================================================
// ContainerMut
// =============================================================================

/// Mutable access to a container attached to a pod template.
///
/// Dereferences to [`Container`]; [`ContainerMut::mount`] additionally
/// registers the volume on the owning template.
pub struct ContainerMut<'a> {
    container: &'a mut Container,
    volumes: &'a mut VolumeRegistry,
}

impl<'a> ContainerMut<'a> {
    pub(crate) fn new(container: &'a mut Container, volumes: &'a mut VolumeRegistry) -> Self {
        Self { container, volumes }
    }

    /// Mount `volume` at `path`.
    ///
    /// Registers the volume on the template when its name is not yet known.
    /// A different volume already registered under the same name is reported
    /// when the template is resolved.
    pub fn mount(&mut self, path: impl Into<String>, volume: &Volume, options: MountOptions) -> &mut Self {
        self.volumes.register_from_mount(volume);
        self.container.mounts.push(Mount::new(path, volume, options));
        self
    }
}

impl Deref for ContainerMut<'_> {
    type Target = Container;

    fn deref(&self) -> &Container {
        self.container
    }
}

impl DerefMut for ContainerMut<'_> {
    fn deref_mut(&mut self) -> &mut Container {
        self.container
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular(image: &str) -> Container {
        ContainerProps::new(image).into_regular("main".to_string())
    }

    fn init(image: &str) -> Container {
        ContainerProps::new(image)
            .into_init("init-0".to_string())
            .unwrap()
    }

    // =========================================================================
    // Story: Probes respect container role
    // =========================================================================

    #[test]
    fn regular_container_accepts_every_probe() {
        let mut c = regular("nginx:1.25");
        c.set_liveness(Probe::http_get("/healthz", 80)).unwrap();
        c.set_readiness(Probe::tcp_socket(80)).unwrap();
        c.set_startup(Probe::exec(["true"])).unwrap();

        let spec = c.to_spec();
        assert!(spec.liveness_probe.is_some());
        assert!(spec.readiness_probe.is_some());
        assert!(spec.startup_probe.is_some());
    }

    #[test]
    fn init_container_rejects_every_probe() {
        for kind in [ProbeKind::Liveness, ProbeKind::Readiness, ProbeKind::Startup] {
            let mut c = init("busybox:1.36");
            let err = c.set_probe(kind, Probe::tcp_socket(80)).unwrap_err();
            assert_eq!(err, WorkloadError::role_violation("init-0", kind));
            assert!(c.probe(kind).is_none());
        }
    }

    #[test]
    fn init_props_with_probe_fail_on_attach() {
        let err = ContainerProps::new("busybox")
            .with_readiness(Probe::tcp_socket(80))
            .into_init("init-0".to_string())
            .unwrap_err();
        assert!(matches!(
            err,
            WorkloadError::RoleViolation { probe: ProbeKind::Readiness, .. }
        ));
    }

    // =========================================================================
    // Story: Emitted container spec
    // =========================================================================

    #[test]
    fn spec_carries_builder_fields() {
        let vol = Volume::from_empty_dir("scratch");
        let c = ContainerProps::new("ghcr.io/acme/api:1.2.3")
            .with_command(["/api"])
            .with_args(["--port", "8080"])
            .with_working_dir("/srv")
            .with_env("RUST_LOG", "info")
            .with_port(ContainerPort::named("http", 8080))
            .with_mount("/tmp", &vol, MountOptions::default())
            .into_regular("api".to_string());

        let json = serde_json::to_value(c.to_spec()).unwrap();
        assert_eq!(json["name"], "api");
        assert_eq!(json["image"], "ghcr.io/acme/api:1.2.3");
        assert_eq!(json["imagePullPolicy"], "IfNotPresent");
        assert_eq!(json["command"][0], "/api");
        assert_eq!(json["args"][1], "8080");
        assert_eq!(json["workingDir"], "/srv");
        assert_eq!(json["env"][0]["name"], "RUST_LOG");
        assert_eq!(json["ports"][0]["containerPort"], 8080);
        assert_eq!(json["volumeMounts"][0]["name"], "scratch");
        assert!(json.get("livenessProbe").is_none());
    }

    #[test]
    fn mutators_after_attach_are_reflected() {
        let mut c = regular("nginx");
        c.add_env("A", "1");
        c.add_port(ContainerPort::new(80));
        c.set_image_pull_policy(ImagePullPolicy::Never);

        let spec = c.to_spec();
        assert_eq!(spec.env.len(), 1);
        assert_eq!(spec.ports[0].container_port, 80);
        assert_eq!(spec.image_pull_policy.as_deref(), Some("Never"));
    }

    #[test]
    fn default_pull_policy_follows_tag() {
        assert_eq!(ImagePullPolicy::default_for("nginx"), ImagePullPolicy::Always);
        assert_eq!(ImagePullPolicy::default_for("nginx:latest"), ImagePullPolicy::Always);
        assert_eq!(ImagePullPolicy::default_for("nginx:1.25"), ImagePullPolicy::IfNotPresent);
        assert_eq!(
            ImagePullPolicy::default_for("registry:5000/team/app"),
            ImagePullPolicy::Always
        );
        assert_eq!(
            ImagePullPolicy::default_for("app@sha256:abcd"),
            ImagePullPolicy::IfNotPresent
        );
    }

    // =========================================================================
    // Story: Mounting through the template registry
    // =========================================================================

    #[test]
    fn mount_registers_volume_once() {
        let mut c = regular("nginx");
        let mut registry = VolumeRegistry::new();
        let vol = Volume::from_config_map("settings");

        ContainerMut::new(&mut c, &mut registry)
            .mount("/etc/a", &vol, MountOptions::default())
            .mount("/etc/b", &vol, MountOptions::read_only());

        assert_eq!(registry.len(), 1);
        assert_eq!(c.mounts().len(), 2);
        assert_eq!(c.mounts()[1].path(), "/etc/b");
    }

    #[test]
    fn probe_kind_displays_lowercase() {
        assert_eq!(ProbeKind::Liveness.to_string(), "liveness");
        assert_eq!(ProbeKind::Startup.to_string(), "startup");
    }
}
