//! Standalone Pod resource

use serde_json::Value;
use trellis_common::{ApiObject, BoxError, ObjectMeta};

use crate::error::WorkloadError;
use crate::pod_template::{PodTemplate, PodTemplateProps};
use crate::workload::Workload;

/// Pod construction props
#[derive(Clone, Debug, Default)]
pub struct PodProps {
    /// Pod metadata; the chart fills in what is left empty
    pub metadata: ObjectMeta,
    /// Initial pod template contents
    pub template: PodTemplateProps,
}

/// A single Pod
#[derive(Clone, Debug, Default)]
pub struct Pod {
    metadata: ObjectMeta,
    template: PodTemplate,
}

impl Pod {
    /// Create a pod
    pub fn new(props: PodProps) -> Result<Self, WorkloadError> {
        Ok(Self {
            metadata: props.metadata,
            template: PodTemplate::new(props.template)?,
        })
    }
}

impl Workload for Pod {
    fn pod_template(&self) -> &PodTemplate {
        &self.template
    }

    fn pod_template_mut(&mut self) -> &mut PodTemplate {
        &mut self.template
    }
}

impl ApiObject for Pod {
    const API_VERSION: &'static str = "v1";
    const KIND: &'static str = "Pod";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn to_spec(&self) -> Result<Value, BoxError> {
        Ok(serde_json::to_value(self.template.resolve()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerProps;
    use crate::k8s::HostAlias;
    use crate::mount::MountOptions;
    use crate::pod_template::RestartPolicy;
    use crate::volume::Volume;
    use trellis_common::{Chart, Error};

    #[test]
    fn pod_resolves_through_chart() {
        let mut chart = Chart::new("demo");
        let pod = chart.add("debug", Pod::default()).unwrap();
        {
            let mut pod = pod.borrow_mut();
            pod.add_container(ContainerProps::new("busybox:1.36").with_command(["sleep", "3600"]))
                .unwrap()
                .mount("/scratch", &Volume::from_empty_dir("scratch"), MountOptions::default());
            pod.add_host_alias(HostAlias::new("10.0.0.5", ["db"]));
            pod.set_restart_policy(RestartPolicy::Never);
        }

        let manifest = chart.synth().unwrap();
        let doc = &manifest.documents()[0];
        assert_eq!(doc["apiVersion"], "v1");
        assert_eq!(doc["kind"], "Pod");
        assert_eq!(doc["spec"]["containers"][0]["name"], "main");
        assert_eq!(doc["spec"]["volumes"][0]["name"], "scratch");
        assert_eq!(doc["spec"]["hostAliases"][0]["ip"], "10.0.0.5");
        assert_eq!(doc["spec"]["restartPolicy"], "Never");
    }

    #[test]
    fn empty_pod_fails_synth_with_node_path() {
        let mut chart = Chart::new("demo");
        chart.add("empty", Pod::default()).unwrap();

        let err = chart.synth().unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }));
        assert_eq!(err.node(), Some("demo/empty"));
        assert!(err.to_string().contains("no containers"));
    }
}
