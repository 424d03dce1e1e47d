//! Deployment resource

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use trellis_common::{ApiObject, BoxError, ObjectMeta, LABEL_NAME};
use trellis_workload::k8s::{LabelSelector, PodMeta, PodTemplateSpec};
use trellis_workload::{PodTemplate, PodTemplateProps, Workload};

use crate::error::DeploymentError;
use crate::strategy::{DeploymentStrategy, StrategySpec};

/// Deployment construction props
#[derive(Clone, Debug)]
pub struct DeploymentProps {
    /// Deployment metadata; the chart fills in what is left empty
    pub metadata: ObjectMeta,
    /// Initial pod template contents
    pub template: PodTemplateProps,
    /// Labels and annotations placed on the pods
    pub pod_metadata: PodMeta,
    /// Desired replicas (default 1)
    pub replicas: Option<i32>,
    /// Selector labels
    pub select_labels: BTreeMap<String, String>,
    /// Select on `app.kubernetes.io/name=<name>` when no selector label is set
    pub default_selector: bool,
    /// Rollout strategy (default rolling update 25%/25%)
    pub strategy: Option<DeploymentStrategy>,
    /// Seconds a new pod must be ready before it counts as available
    pub min_ready_seconds: Option<i32>,
    /// Seconds before a stalled rollout is reported as failed
    pub progress_deadline_seconds: Option<i32>,
}

impl Default for DeploymentProps {
    fn default() -> Self {
        Self {
            metadata: ObjectMeta::default(),
            template: PodTemplateProps::default(),
            pod_metadata: PodMeta::default(),
            replicas: None,
            select_labels: BTreeMap::new(),
            default_selector: true,
            strategy: None,
            min_ready_seconds: None,
            progress_deadline_seconds: None,
        }
    }
}

/// A Deployment owning one pod template
#[derive(Clone, Debug)]
pub struct Deployment {
    metadata: ObjectMeta,
    template: PodTemplate,
    pod_metadata: PodMeta,
    replicas: i32,
    select_labels: BTreeMap<String, String>,
    default_selector: bool,
    strategy: DeploymentStrategy,
    min_ready_seconds: Option<i32>,
    progress_deadline_seconds: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentSpec {
    replicas: i32,
    selector: LabelSelector,
    strategy: StrategySpec,
    template: PodTemplateSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_ready_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress_deadline_seconds: Option<i32>,
}

impl Deployment {
    /// Create a deployment
    pub fn new(props: DeploymentProps) -> Result<Self, DeploymentError> {
        Ok(Self {
            metadata: props.metadata,
            template: PodTemplate::new(props.template)?,
            pod_metadata: props.pod_metadata,
            replicas: props.replicas.unwrap_or(1),
            select_labels: props.select_labels,
            default_selector: props.default_selector,
            strategy: props.strategy.unwrap_or_default(),
            min_ready_seconds: props.min_ready_seconds,
            progress_deadline_seconds: props.progress_deadline_seconds,
        })
    }

    /// Add a selector label; it is also applied to the pods
    pub fn select_by_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.select_labels.insert(key.into(), value.into());
    }

    /// Desired replicas
    pub fn replicas(&self) -> i32 {
        self.replicas
    }

    /// Set desired replicas
    pub fn set_replicas(&mut self, replicas: i32) {
        self.replicas = replicas;
    }

    /// Rollout strategy
    pub fn strategy(&self) -> DeploymentStrategy {
        self.strategy
    }

    /// Set the rollout strategy
    pub fn set_strategy(&mut self, strategy: DeploymentStrategy) {
        self.strategy = strategy;
    }

    /// Pod labels and annotations
    pub fn pod_metadata_mut(&mut self) -> &mut PodMeta {
        &mut self.pod_metadata
    }

    /// Selector labels as they will be emitted
    pub fn match_labels(&self) -> BTreeMap<String, String> {
        if self.select_labels.is_empty() && self.default_selector && !self.metadata.name.is_empty() {
            let mut labels = BTreeMap::new();
            labels.insert(LABEL_NAME.to_string(), self.metadata.name.clone());
            return labels;
        }
        self.select_labels.clone()
    }

    fn resolve(&self) -> Result<DeploymentSpec, DeploymentError> {
        let match_labels = self.match_labels();
        if match_labels.is_empty() {
            return Err(DeploymentError::EmptySelector {
                name: self.metadata.name.clone(),
            });
        }

        let mut pod_metadata = self.pod_metadata.clone();
        pod_metadata.labels.extend(match_labels.clone());

        let template = self.template.resolve_template(pod_metadata)?;
        debug!(
            deployment = %self.metadata.name,
            replicas = self.replicas,
            "Resolved deployment"
        );

        Ok(DeploymentSpec {
            replicas: self.replicas,
            selector: LabelSelector { match_labels },
            strategy: self.strategy.to_spec(),
            template,
            min_ready_seconds: self.min_ready_seconds,
            progress_deadline_seconds: self.progress_deadline_seconds,
        })
    }
}

impl Workload for Deployment {
    fn pod_template(&self) -> &PodTemplate {
        &self.template
    }

    fn pod_template_mut(&mut self) -> &mut PodTemplate {
        &mut self.template
    }
}

impl ApiObject for Deployment {
    const API_VERSION: &'static str = "apps/v1";
    const KIND: &'static str = "Deployment";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn to_spec(&self) -> Result<Value, BoxError> {
        Ok(serde_json::to_value(self.resolve()?)?)
    }
}
