//! End-to-end scenarios: builders through chart synthesis to YAML

use std::time::Duration;

use trellis::common::Error;
use trellis::prelude::*;
use trellis::workload::k8s::HostAlias;

fn collision_source(err: &Error) -> Option<&WorkloadError> {
    match err {
        Error::Resolution { source, .. } => source.downcast_ref::<WorkloadError>(),
        _ => None,
    }
}

// =============================================================================
// Story: Pod template invariants surface through synthesis
// =============================================================================

#[test]
fn pod_without_containers_fails_synth() {
    let mut chart = Chart::new("scenarios");
    chart.add("empty", Pod::default()).unwrap();

    let err = chart.synth().unwrap_err();
    assert_eq!(collision_source(&err), Some(&WorkloadError::EmptyContainerSet));
}

#[test]
fn distinct_volumes_sharing_a_name_fail_synth() {
    let mut chart = Chart::new("scenarios");
    let pod = chart.add("pod", Pod::default()).unwrap();
    {
        let mut pod = pod.borrow_mut();
        pod.add_container(ContainerProps::new("a:1"))
            .unwrap()
            .mount("/a", &Volume::from_empty_dir("v"), MountOptions::default());
        pod.add_container(ContainerProps::new("b:1"))
            .unwrap()
            .mount("/b", &Volume::from_empty_dir("v"), MountOptions::default());
    }

    let err = chart.synth().unwrap_err();
    match collision_source(&err) {
        Some(WorkloadError::VolumeNameCollision { name, .. }) => assert_eq!(name, "v"),
        other => panic!("expected VolumeNameCollision, got {other:?}"),
    }
}

#[test]
fn one_volume_mounted_at_two_paths_is_emitted_once() {
    let mut chart = Chart::new("scenarios");
    let pod = chart.add("pod", Pod::default()).unwrap();
    let v = Volume::from_empty_dir("v");
    pod.borrow_mut()
        .add_container(ContainerProps::new("a:1"))
        .unwrap()
        .mount("/a", &v, MountOptions::default())
        .mount("/b", &v, MountOptions::read_only());

    let manifest = chart.synth().unwrap();
    let volumes = manifest.documents()[0]["spec"]["volumes"].as_array().unwrap();
    assert_eq!(volumes.len(), 1);
    assert_eq!(volumes[0]["name"], "v");
}

#[test]
fn auto_named_container_cannot_reuse_an_explicit_name() {
    let mut deployment = Deployment::new(DeploymentProps::default()).unwrap();
    deployment
        .add_container(ContainerProps::new("a:1").with_name("main-1"))
        .unwrap();
    let err = deployment.add_container(ContainerProps::new("b:1")).err().unwrap();
    assert!(matches!(err, WorkloadError::DuplicateContainerName { ref name, .. } if name == "main-1"));

    let spec = deployment.pod_template().resolve().unwrap();
    assert_eq!(spec.containers.len(), 1);
    assert_eq!(spec.containers[0].name, "main-1");
}

#[test]
fn zero_rolling_update_bounds_fail_construction() {
    let err = DeploymentStrategy::rolling_update(RollingUpdateOptions {
        max_surge: Some(PercentOrAbsolute::Percent(0)),
        max_unavailable: Some(PercentOrAbsolute::Absolute(0)),
    })
    .unwrap_err();
    assert!(matches!(err, DeploymentError::StrategyConfiguration { .. }));
}

// =============================================================================
// Story: A small application chart
// =============================================================================

#[test]
fn application_chart_synthesizes_to_yaml() {
    let mut chart = Chart::new("shop").with_namespace("prod");
    let config = Volume::from_config_map("web-config");

    let web = chart
        .add("web", Deployment::new(DeploymentProps::default()).unwrap())
        .unwrap();
    let migrate = chart.add("migrate", Job::new(JobProps::default()).unwrap()).unwrap();

    // Mutations after add are picked up at synth time.
    {
        let mut web = web.borrow_mut();
        web.set_replicas(3);
        web.add_container(
            ContainerProps::new("nginx:1.25")
                .with_readiness(Probe::http_get("/healthz", 80).with_period(Duration::from_secs(5))),
        )
        .unwrap()
        .mount("/etc/nginx/conf.d", &config, MountOptions::read_only());
        web.add_init_container(ContainerProps::new("busybox:1.36").with_command(["true"]))
            .unwrap()
            .mount("/config", &config, MountOptions::default());
        web.add_host_alias(HostAlias::new("10.0.0.10", ["db.internal"]));
    }
    {
        let mut migrate = migrate.borrow_mut();
        migrate.add_container(ContainerProps::new("migrate:4").with_args(["up"])).unwrap();
        migrate.set_backoff_limit(2);
    }

    let manifest = chart.synth().unwrap();
    assert_eq!(manifest, chart.synth().unwrap());

    let deployments: Vec<_> = manifest.of_kind("Deployment").collect();
    assert_eq!(deployments.len(), 1);
    let deployment = deployments[0];
    assert_eq!(deployment["metadata"]["namespace"], "prod");
    assert_eq!(deployment["spec"]["replicas"], 3);
    let pod = &deployment["spec"]["template"]["spec"];
    assert_eq!(pod["initContainers"][0]["name"], "init-0");
    assert_eq!(pod["containers"][0]["name"], "main");
    assert_eq!(pod["volumes"].as_array().unwrap().len(), 1);
    assert_eq!(pod["hostAliases"][0]["hostnames"][0], "db.internal");
    assert_eq!(pod["securityContext"]["runAsNonRoot"], false);

    let job = manifest.of_kind("Job").next().unwrap();
    assert_eq!(job["spec"]["template"]["spec"]["restartPolicy"], "Never");

    let yaml = manifest.to_yaml().unwrap();
    let docs: Vec<serde_yaml::Value> = yaml
        .split("---\n")
        .map(|doc| serde_yaml::from_str(doc).unwrap())
        .collect();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1]["kind"], serde_yaml::Value::from("Job"));
    assert_eq!(
        serde_json::to_value(&docs[0]).unwrap()["spec"]["replicas"],
        serde_json::json!(3)
    );
}
