//! Job resource

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use trellis_common::{ApiObject, BoxError, ObjectMeta};
use trellis_workload::k8s::{PodMeta, PodTemplateSpec};
use trellis_workload::{PodTemplate, PodTemplateProps, RestartPolicy, Workload, WorkloadError};

/// Job construction props
#[derive(Clone, Debug, Default)]
pub struct JobProps {
    /// Job metadata; the chart fills in what is left empty
    pub metadata: ObjectMeta,
    /// Initial pod template contents; restart policy defaults to `Never`
    pub template: PodTemplateProps,
    /// Labels and annotations placed on the pods
    pub pod_metadata: PodMeta,
    /// Retries before the job is marked failed
    pub backoff_limit: Option<i32>,
    /// Maximum run time before the job is terminated
    pub active_deadline: Option<Duration>,
    /// How long a finished job is kept before deletion
    pub ttl_after_finished: Option<Duration>,
    /// Pods running concurrently
    pub parallelism: Option<i32>,
    /// Successful pods required to complete the job
    pub completions: Option<i32>,
}

/// A run-to-completion Job owning one pod template
#[derive(Clone, Debug)]
pub struct Job {
    metadata: ObjectMeta,
    template: PodTemplate,
    pod_metadata: PodMeta,
    backoff_limit: Option<i32>,
    active_deadline: Option<Duration>,
    ttl_after_finished: Option<Duration>,
    parallelism: Option<i32>,
    completions: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    backoff_limit: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_deadline_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl_seconds_after_finished: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parallelism: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completions: Option<i32>,
    template: PodTemplateSpec,
}

impl Job {
    /// Create a job
    pub fn new(props: JobProps) -> Result<Self, WorkloadError> {
        let mut template = PodTemplate::new(props.template)?;
        if template.restart_policy().is_none() {
            template.set_restart_policy(RestartPolicy::Never);
        }
        Ok(Self {
            metadata: props.metadata,
            template,
            pod_metadata: props.pod_metadata,
            backoff_limit: props.backoff_limit,
            active_deadline: props.active_deadline,
            ttl_after_finished: props.ttl_after_finished,
            parallelism: props.parallelism,
            completions: props.completions,
        })
    }

    /// Set the retry limit
    pub fn set_backoff_limit(&mut self, limit: i32) {
        self.backoff_limit = Some(limit);
    }

    /// Set the maximum run time
    pub fn set_active_deadline(&mut self, deadline: Duration) {
        self.active_deadline = Some(deadline);
    }

    /// Set how long a finished job is kept
    pub fn set_ttl_after_finished(&mut self, ttl: Duration) {
        self.ttl_after_finished = Some(ttl);
    }

    /// Pod labels and annotations
    pub fn pod_metadata_mut(&mut self) -> &mut PodMeta {
        &mut self.pod_metadata
    }

    fn resolve(&self) -> Result<JobSpec, WorkloadError> {
        let template = self.template.resolve_template(self.pod_metadata.clone())?;
        debug!(job = %self.metadata.name, "Resolved job");
        Ok(JobSpec {
            backoff_limit: self.backoff_limit,
            active_deadline_seconds: self
                .active_deadline
                .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX)),
            ttl_seconds_after_finished: self
                .ttl_after_finished
                .map(|d| i32::try_from(d.as_secs()).unwrap_or(i32::MAX)),
            parallelism: self.parallelism,
            completions: self.completions,
            template,
        })
    }
}

impl Workload for Job {
    fn pod_template(&self) -> &PodTemplate {
        &self.template
    }

    fn pod_template_mut(&mut self) -> &mut PodTemplate {
        &mut self.template
    }
}

impl ApiObject for Job {
    const API_VERSION: &'static str = "batch/v1";
    const KIND: &'static str = "Job";

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
