//! Capability shared by resources that own a pod template

use crate::container::{ContainerMut, ContainerProps};
use crate::error::WorkloadError;
use crate::k8s::HostAlias;
use crate::pod_template::{PodTemplate, RestartPolicy};
use crate::security::PodSecurityContext;
use crate::volume::Volume;

/// A resource whose runtime unit is a [`PodTemplate`].
///
/// Implementors only provide access to their template; the pod-building
/// operations forward to it.
pub trait Workload {
    /// The owned pod template
    fn pod_template(&self) -> &PodTemplate;

    /// The owned pod template, mutably
    fn pod_template_mut(&mut self) -> &mut PodTemplate;

    /// Add a regular container
    fn add_container(&mut self, props: ContainerProps) -> Result<ContainerMut<'_>, WorkloadError> {
        self.pod_template_mut().add_container(props)
    }

    /// Add an init container
    fn add_init_container(&mut self, props: ContainerProps) -> Result<ContainerMut<'_>, WorkloadError> {
        self.pod_template_mut().add_init_container(props)
    }

    /// Register a volume
    fn add_volume(&mut self, volume: &Volume) -> Result<(), WorkloadError> {
        self.pod_template_mut().add_volume(volume)
    }

    /// Add an `/etc/hosts` entry
    fn add_host_alias(&mut self, alias: HostAlias) {
        self.pod_template_mut().add_host_alias(alias);
    }

    /// Pod security context
    fn security_context_mut(&mut self) -> &mut PodSecurityContext {
        self.pod_template_mut().security_context_mut()
    }

    /// Set the restart policy
    fn set_restart_policy(&mut self, policy: RestartPolicy) {
        self.pod_template_mut().set_restart_policy(policy);
    }

    /// Set the service account
    fn set_service_account(&mut self, name: &str) {
        self.pod_template_mut().set_service_account(name);
    }
}
