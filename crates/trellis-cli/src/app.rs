//! Builds a chart from an app file

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info};
use trellis_common::{ApiObject, Chart, ObjectMeta};
use trellis_deployment::{
    Deployment, DeploymentProps, DeploymentStrategy, PercentOrAbsolute, RollingUpdateOptions,
};
use trellis_job::{Job, JobProps};
use trellis_workload::k8s::{ContainerPort, EmptyDirVolumeSource, HostAlias, PodMeta};
use trellis_workload::{
    ContainerProps, FsGroupChangePolicy, ImagePullPolicy, MountOptions, Pod, Probe,
    ProjectionOptions, RestartPolicy, Volume, Workload,
};

use crate::config::{
    AppConfig, BoundConfig, ContainerConfig, DeploymentConfig, JobConfig, PodConfig, ProbeConfig,
    StrategyConfig, VolumeConfig, WorkloadConfig,
};
use crate::{Error, Result};

/// Build a chart holding every workload in the app file
pub fn build_chart(config: &AppConfig) -> Result<Chart> {
    let mut chart = Chart::new(&config.chart);
    if let Some(namespace) = &config.namespace {
        chart = chart.with_namespace(namespace);
    }
    for (key, value) in &config.labels {
        chart = chart.with_label(key, value);
    }

    for workload in &config.workloads {
        let id = workload.pod().id.as_str();
        match workload {
            WorkloadConfig::Pod(pod) => {
                let mut resource = Pod::default();
                populate(&mut resource, pod)?;
                chart.add(id, resource)?;
            }
            WorkloadConfig::Deployment(deployment) => {
                let mut resource = build_deployment(deployment)?;
                populate(&mut resource, &deployment.pod)?;
                chart.add(id, resource)?;
            }
            WorkloadConfig::Job(job) => {
                let mut resource = build_job(job)?;
                populate(&mut resource, &job.pod)?;
                chart.add(id, resource)?;
            }
        }
    }

    info!(chart = %config.chart, resources = chart.len(), "Built chart from app file");
    Ok(chart)
}

fn build_deployment(config: &DeploymentConfig) -> Result<Deployment> {
    let strategy = config.strategy.as_ref().map(strategy_from).transpose()?;
    let deployment = Deployment::new(DeploymentProps {
        replicas: config.replicas,
        select_labels: config.selector.clone(),
        pod_metadata: PodMeta {
            labels: config.pod_labels.clone(),
            ..Default::default()
        },
        strategy,
        min_ready_seconds: config.min_ready_seconds,
        progress_deadline_seconds: config.progress_deadline_seconds,
        ..Default::default()
    })?;
    Ok(deployment)
}

fn strategy_from(config: &StrategyConfig) -> Result<DeploymentStrategy> {
    match config {
        StrategyConfig::Recreate => Ok(DeploymentStrategy::recreate()),
        StrategyConfig::RollingUpdate {
            max_surge,
            max_unavailable,
        } => Ok(DeploymentStrategy::rolling_update(RollingUpdateOptions {
            max_surge: max_surge.as_ref().map(bound_from).transpose()?,
            max_unavailable: max_unavailable.as_ref().map(bound_from).transpose()?,
        })?),
    }
}

fn bound_from(config: &BoundConfig) -> Result<PercentOrAbsolute> {
    match config {
        BoundConfig::Count(n) => Ok(PercentOrAbsolute::Absolute(*n)),
        BoundConfig::Text(text) => Ok(text.parse()?),
    }
}

fn build_job(config: &JobConfig) -> Result<Job> {
    let job = Job::new(JobProps {
        pod_metadata: PodMeta {
            labels: config.pod_labels.clone(),
            ..Default::default()
        },
        backoff_limit: config.backoff_limit,
        active_deadline: config.active_deadline_seconds.map(Duration::from_secs),
        ttl_after_finished: config.ttl_seconds_after_finished.map(Duration::from_secs),
        parallelism: config.parallelism,
        completions: config.completions,
        ..Default::default()
    })?;
    Ok(job)
}

/// Apply metadata and pod template settings shared by every workload kind
fn populate<W: Workload + ApiObject>(workload: &mut W, config: &PodConfig) -> Result<()> {
    let meta = workload.metadata_mut();
    *meta = ObjectMeta {
        name: config.name.clone().unwrap_or_default(),
        namespace: meta.namespace.take(),
        labels: config.labels.clone(),
        annotations: config.annotations.clone(),
    };

    let mut volumes = HashMap::new();
    for volume_config in &config.volumes {
        let volume = volume_from(volume_config)?;
        workload.add_volume(&volume)?;
        volumes.insert(volume.name().to_string(), volume);
    }

    for container in &config.init_containers {
        let props = container_props(container, &volumes, &config.id)?;
        workload.add_init_container(props)?;
    }
    for container in &config.containers {
        let props = container_props(container, &volumes, &config.id)?;
        workload.add_container(props)?;
    }

    for alias in &config.host_aliases {
        workload.add_host_alias(HostAlias::new(&alias.ip, alias.hostnames.iter()));
    }

    if let Some(sc) = &config.security_context {
        let policy = match sc.fs_group_change_policy.as_deref() {
            None | Some("Always") => FsGroupChangePolicy::Always,
            Some("OnRootMismatch") => FsGroupChangePolicy::OnRootMismatch,
            Some(other) => {
                return Err(Error::config(format!(
                    "{}: unknown fsGroupChangePolicy '{}'",
                    config.id, other
                )))
            }
        };
        let ctx = workload.security_context_mut();
        ctx.run_as_non_root = sc.run_as_non_root;
        ctx.run_as_user = sc.run_as_user;
        ctx.run_as_group = sc.run_as_group;
        ctx.fs_group = sc.fs_group;
        ctx.fs_group_change_policy = policy;
        for (name, value) in &sc.sysctls {
            ctx.add_sysctl(name, value);
        }
    }

    if let Some(policy) = &config.restart_policy {
        workload.set_restart_policy(restart_policy_from(policy, &config.id)?);
    }
    if let Some(sa) = &config.service_account_name {
        workload.set_service_account(sa);
    }
    let template = workload.pod_template_mut();
    if let Some(automount) = config.automount_service_account_token {
        template.set_automount_service_account_token(automount);
    }
    for secret in &config.image_pull_secrets {
        template.add_image_pull_secret(secret);
    }

    debug!(
        workload = %config.id,
        containers = config.containers.len(),
        init_containers = config.init_containers.len(),
        volumes = volumes.len(),
        "Populated workload"
    );
    Ok(())
}

fn volume_from(config: &VolumeConfig) -> Result<Volume> {
    let sources = [
        config.config_map.is_some(),
        config.secret.is_some(),
        config.empty_dir.is_some(),
        config.persistent_volume_claim.is_some(),
        config.host_path.is_some(),
    ];
    if sources.iter().filter(|set| **set).count() != 1 {
        return Err(Error::config(format!(
            "volume {} must declare exactly one source",
            config.name.as_deref().unwrap_or("<unnamed>")
        )));
    }

    let volume = if let Some(cm) = &config.config_map {
        Volume::from_config_map_with(
            &cm.name,
            ProjectionOptions {
                name: config.name.clone(),
                items: cm.items.clone(),
                default_mode: cm.default_mode,
                optional: cm.optional,
            },
        )
    } else if let Some(secret) = &config.secret {
        Volume::from_secret_with(
            &secret.name,
            ProjectionOptions {
                name: config.name.clone(),
                items: secret.items.clone(),
                default_mode: secret.default_mode,
                optional: secret.optional,
            },
        )
    } else if let Some(empty_dir) = &config.empty_dir {
        let name = config
            .name
            .clone()
            .ok_or_else(|| Error::config("emptyDir volumes need an explicit name"))?;
        return Ok(Volume::from_empty_dir_with(
            name,
            EmptyDirVolumeSource {
                medium: empty_dir.medium.clone(),
                size_limit: empty_dir.size_limit.clone(),
            },
        ));
    } else if let Some(pvc) = &config.persistent_volume_claim {
        rename(Volume::from_pvc_with(&pvc.claim_name, pvc.read_only), config)
    } else if let Some(host_path) = &config.host_path {
        rename(Volume::from_host_path(&host_path.path, host_path.type_.clone()), config)
    } else {
        return Err(Error::config("volume must declare a source"));
    };
    Ok(volume)
}

fn rename(volume: Volume, config: &VolumeConfig) -> Volume {
    match &config.name {
        Some(name) => volume.with_name(name),
        None => volume,
    }
}

fn container_props(
    config: &ContainerConfig,
    volumes: &HashMap<String, Volume>,
    workload: &str,
) -> Result<ContainerProps> {
    let mut props = ContainerProps::new(&config.image);
    if let Some(name) = &config.name {
        props = props.with_name(name);
    }
    if let Some(policy) = &config.image_pull_policy {
        props = props.with_image_pull_policy(match policy.as_str() {
            "Always" => ImagePullPolicy::Always,
            "IfNotPresent" => ImagePullPolicy::IfNotPresent,
            "Never" => ImagePullPolicy::Never,
            other => {
                return Err(Error::config(format!(
                    "{}: unknown imagePullPolicy '{}'",
                    workload, other
                )))
            }
        });
    }
    if let Some(command) = &config.command {
        props = props.with_command(command.iter());
    }
    if let Some(args) = &config.args {
        props = props.with_args(args.iter());
    }
    if let Some(dir) = &config.working_dir {
        props = props.with_working_dir(dir);
    }
    for (name, value) in &config.env {
        props = props.with_env(name, value);
    }
    for port in &config.ports {
        props = props.with_port(ContainerPort {
            name: port.name.clone(),
            container_port: port.container_port,
            protocol: None,
        });
    }
    if let Some(resources) = &config.resources {
        props = props.with_resources(resources.clone());
    }
    if let Some(sc) = &config.security_context {
        props = props.with_security_context(sc.clone());
    }

    for mount in &config.mounts {
        let volume = volumes.get(&mount.volume).ok_or_else(|| {
            Error::config(format!(
                "{}: mount at {} references unknown volume '{}'",
                workload, mount.path, mount.volume
            ))
        })?;
        let options = MountOptions {
            sub_path: mount.sub_path.clone(),
            read_only: mount.read_only,
        };
        props = props.with_mount(&mount.path, volume, options);
    }

    if let Some(probe) = &config.liveness_probe {
        props = props.with_liveness(probe_from(probe, workload)?);
    }
    if let Some(probe) = &config.readiness_probe {
        props = props.with_readiness(probe_from(probe, workload)?);
    }
    if let Some(probe) = &config.startup_probe {
        props = props.with_startup(probe_from(probe, workload)?);
    }
    Ok(props)
}

fn probe_from(config: &ProbeConfig, workload: &str) -> Result<Probe> {
    let mut probe = match (&config.http_get, &config.exec, &config.tcp_socket) {
        (Some(http), None, None) => {
            let mut probe = Probe::http_get(&http.path, http.port);
            if let Some(scheme) = &http.scheme {
                probe = probe.with_scheme(scheme);
            }
            for (name, value) in &http.headers {
                probe = probe.with_header(name, value);
            }
            probe
        }
        (None, Some(exec), None) => Probe::exec(exec.command.iter()),
        (None, None, Some(tcp)) => Probe::tcp_socket(tcp.port),
        _ => {
            return Err(Error::config(format!(
                "{}: a probe must declare exactly one of httpGet, exec or tcpSocket",
                workload
            )))
        }
    };

    if let Some(secs) = config.initial_delay_seconds {
        probe = probe.with_initial_delay(Duration::from_secs(secs));
    }
    if let Some(secs) = config.period_seconds {
        probe = probe.with_period(Duration::from_secs(secs));
    }
    if let Some(secs) = config.timeout_seconds {
        probe = probe.with_timeout(Duration::from_secs(secs));
    }
    if let Some(n) = config.failure_threshold {
        probe = probe.with_failure_threshold(n);
    }
    if let Some(n) = config.success_threshold {
        probe = probe.with_success_threshold(n);
    }
    Ok(probe)
}

fn restart_policy_from(policy: &str, workload: &str) -> Result<RestartPolicy> {
    match policy {
        "Always" => Ok(RestartPolicy::Always),
        "OnFailure" => Ok(RestartPolicy::OnFailure),
        "Never" => Ok(RestartPolicy::Never),
        other => Err(Error::config(format!(
            "{}: unknown restartPolicy '{}'",
            workload, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_workload::WorkloadError;

    fn synth(yaml: &str) -> Result<trellis_common::Manifest> {
        let config = AppConfig::from_yaml(yaml)?;
        Ok(build_chart(&config)?.synth()?)
    }

    // =========================================================================
    // Story: App file to manifest
    // =========================================================================

    #[test]
    fn deployment_with_shared_config_volume() {
        let manifest = synth(
            r#"
chart: shop
namespace: prod
labels: { team: payments }
workloads:
  - id: web
    kind: Deployment
    name: web
    replicas: 2
    volumes:
      - configMap: { name: web-config }
    containers:
      - image: nginx:1.25
        ports: [{ name: http, containerPort: 80 }]
        readinessProbe:
          httpGet: { path: /, port: 80 }
          periodSeconds: 5
        mounts:
          - { volume: configmap-web-config, path: /etc/nginx/conf.d, readOnly: true }
      - name: reloader
        image: reloader:0.3
        mounts:
          - { volume: configmap-web-config, path: /watch }
"#,
        )
        .unwrap();

        let doc = manifest.find("Deployment", "web").unwrap();
        assert_eq!(doc["metadata"]["namespace"], "prod");
        assert_eq!(doc["metadata"]["labels"]["team"], "payments");
        assert_eq!(doc["spec"]["replicas"], 2);
        let pod = &doc["spec"]["template"]["spec"];
        assert_eq!(pod["volumes"].as_array().unwrap().len(), 1);
        assert_eq!(pod["containers"][0]["name"], "main");
        assert_eq!(pod["containers"][0]["readinessProbe"]["periodSeconds"], 5);
        assert_eq!(pod["containers"][1]["volumeMounts"][0]["mountPath"], "/watch");
    }

    #[test]
    fn job_defaults_restart_policy_never() {
        let manifest = synth(
            r#"
chart: ops
workloads:
  - id: migrate
    kind: Job
    name: migrate
    backoffLimit: 2
    ttlSecondsAfterFinished: 300
    containers:
      - image: migrate:1
        args: [up]
"#,
        )
        .unwrap();

        let doc = manifest.find("Job", "migrate").unwrap();
        assert_eq!(doc["spec"]["backoffLimit"], 2);
        assert_eq!(doc["spec"]["ttlSecondsAfterFinished"], 300);
        assert_eq!(doc["spec"]["template"]["spec"]["restartPolicy"], "Never");
    }

    // =========================================================================
    // Story: Invalid app files
    // =========================================================================

    #[test]
    fn unknown_volume_reference_is_a_config_error() {
        let err = synth(
            r#"
chart: shop
workloads:
  - id: web
    kind: Pod
    containers:
      - image: nginx
        mounts: [{ volume: missing, path: /x }]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config { ref message } if message.contains("missing")));
    }

    #[test]
    fn duplicate_volume_names_conflict() {
        let err = synth(
            r#"
chart: shop
workloads:
  - id: web
    kind: Pod
    volumes:
      - { name: data, emptyDir: {} }
      - { name: data, persistentVolumeClaim: { claimName: data } }
    containers:
      - image: nginx
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Workload(WorkloadError::NameConflict { .. })));
    }

    #[test]
    fn init_container_probe_is_a_role_violation() {
        let err = synth(
            r#"
chart: shop
workloads:
  - id: web
    kind: Pod
    initContainers:
      - image: busybox
        livenessProbe: { tcpSocket: { port: 80 } }
    containers:
      - image: nginx
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Workload(WorkloadError::RoleViolation { .. })));
    }

    #[test]
    fn zero_rolling_update_bounds_are_rejected() {
        let err = synth(
            r#"
chart: shop
workloads:
  - id: web
    kind: Deployment
    strategy: { type: RollingUpdate, maxSurge: "0%", maxUnavailable: 0 }
    containers:
      - image: nginx
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Deployment(_)));
    }

    #[test]
    fn workload_without_containers_fails_at_synth() {
        let err = synth("chart: shop\nworkloads:\n  - id: empty\n    kind: Pod\n").unwrap_err();
        match err {
            Error::Chart(e) => assert_eq!(e.node(), Some("shop/empty")),
            other => panic!("expected chart error, got {other:?}"),
        }
    }

    #[test]
    fn probe_needs_exactly_one_handler() {
        let err = probe_from(&ProbeConfig::default(), "web").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
