// ABOUTME: End-to-end pipeline tests over the scripted fake runner.
// ABOUTME: Covers the happy path, build fallback, warning degradation, and aborts.

mod support;

use support::{FakeRunner, Outcome, Rule};

use caravel::config::Config;
use caravel::pipeline::{Pipeline, RunStatus};
use caravel::runner::NullSink;
use caravel::stages::{AppKind, BuildPath, deploy_service};
use caravel::types::ImageRef;
use std::time::Duration;

const BASE_CONFIG: &str = r#"
project: my-app
registry:
  region: us-east-1
"#;

fn config(yaml: &str) -> Config {
    Config::from_yaml(yaml).unwrap()
}

fn local_image() -> ImageRef {
    ImageRef::parse("my-app:latest").unwrap()
}

fn identity_rules() -> Vec<Rule> {
    vec![
        Rule::new("aws", Outcome::ok_stdout("123456789012\n")).with_args("get-caller-identity"),
        Rule::new("aws", Outcome::ok_stdout("registry-password\n")).with_args("get-login-password"),
    ]
}

#[tokio::test]
async fn full_pipeline_succeeds_via_buildpack() {
    let runner = FakeRunner::new(identity_rules());
    let source = tempfile::tempdir().unwrap();

    let pipeline = Pipeline::new(config(BASE_CONFIG), local_image());
    let pipeline = pipeline
        .build(&runner, &NullSink, source.path())
        .await
        .map_err(|(_, e)| e)
        .expect("build");
    let pipeline = pipeline
        .push(&runner, &NullSink)
        .await
        .map_err(|(_, e)| e)
        .expect("push");
    let pipeline = pipeline
        .deploy(&runner, &NullSink)
        .await
        .map_err(|(_, e)| e)
        .expect("deploy");
    let pipeline = pipeline.attach_resources(&runner, &NullSink).await;
    let run = pipeline.report(None).await.finish();

    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(run.build_path, Some(BuildPath::Buildpack));
    assert!(run.warnings.is_empty());
    assert!(run.finished_at.is_some());
    assert_eq!(
        run.image.unwrap().to_string(),
        "123456789012.dkr.ecr.us-east-1.amazonaws.com/my-app:latest"
    );

    // The service descriptor landed in the cluster with a warm instance pinned.
    let cluster = runner.cluster();
    let manifest = cluster.get("Service/my-app").expect("service applied");
    let doc: serde_yaml::Value = serde_yaml::from_str(manifest).unwrap();
    assert_eq!(
        doc["spec"]["template"]["metadata"]["annotations"]["autoscaling.knative.dev/minScale"],
        "1"
    );
}

#[tokio::test]
async fn push_steps_run_in_order() {
    let runner = FakeRunner::new(identity_rules());
    let source = tempfile::tempdir().unwrap();

    let pipeline = Pipeline::new(config(BASE_CONFIG), local_image());
    let pipeline = pipeline
        .build(&runner, &NullSink, source.path())
        .await
        .map_err(|(_, e)| e)
        .expect("build");
    pipeline
        .push(&runner, &NullSink)
        .await
        .map_err(|(_, e)| e)
        .expect("push");

    let calls = runner.calls();
    let position = |needle: &str| {
        calls
            .iter()
            .position(|c| c.contains(needle))
            .unwrap_or_else(|| panic!("missing call: {needle}"))
    };

    assert!(position("docker tag") < position("get-login-password"));
    assert!(position("get-login-password") < position("docker login"));
    assert!(position("docker login") < position("describe-repositories"));
    assert!(position("describe-repositories") < position("docker push"));
}

#[tokio::test]
async fn missing_pack_falls_back_to_generated_dockerfile() {
    let mut rules = identity_rules();
    rules.push(Rule::new("pack", Outcome::Missing));
    let runner = FakeRunner::new(rules);

    let source = tempfile::tempdir().unwrap();
    std::fs::write(source.path().join("package.json"), "{}").unwrap();

    let pipeline = Pipeline::new(config(BASE_CONFIG), local_image());
    let pipeline = pipeline
        .build(&runner, &NullSink, source.path())
        .await
        .map_err(|(_, e)| e)
        .expect("build");

    assert_eq!(
        pipeline.record().build_path,
        Some(BuildPath::Dockerfile(AppKind::Node))
    );
    assert_eq!(runner.call_count("docker build --platform linux/amd64"), 1);
}

#[tokio::test]
async fn both_build_paths_failing_aborts_the_run() {
    let runner = FakeRunner::new(vec![
        Rule::new("pack", Outcome::fails(1, &["ERROR: failed to build: exit status 51"])),
        Rule::new("docker", Outcome::fails(1, &["failed to fetch base layers"]))
            .with_args("build"),
    ]);
    let source = tempfile::tempdir().unwrap();

    let pipeline = Pipeline::new(config(BASE_CONFIG), local_image());
    let (failed, error) = pipeline
        .build(&runner, &NullSink, source.path())
        .await
        .err()
        .expect("build must fail");

    let run = failed.abort(&error);
    assert_eq!(run.status, RunStatus::Failed);
    let message = run.error.unwrap();
    assert!(message.contains("failed to fetch base layers"), "{message}");
}

#[tokio::test]
async fn missing_repository_is_created_before_push() {
    let mut rules = identity_rules();
    rules.push(
        Rule::new("aws", Outcome::fails(1, &["RepositoryNotFoundException"]))
            .with_args("describe-repositories"),
    );
    let runner = FakeRunner::new(rules);
    let source = tempfile::tempdir().unwrap();

    let pipeline = Pipeline::new(config(BASE_CONFIG), local_image());
    let pipeline = pipeline
        .build(&runner, &NullSink, source.path())
        .await
        .map_err(|(_, e)| e)
        .expect("build");
    pipeline
        .push(&runner, &NullSink)
        .await
        .map_err(|(_, e)| e)
        .expect("push");

    assert_eq!(runner.call_count("create-repository"), 1);
}

#[tokio::test]
async fn database_attach_failure_degrades_to_warning() {
    let mut rules = identity_rules();
    rules.push(
        Rule::new("kubectl", Outcome::fails(1, &["secret \"my-app-db\" is forbidden"]))
            .with_stdin("my-app-db"),
    );
    let runner = FakeRunner::new(rules);
    let source = tempfile::tempdir().unwrap();

    let with_db = format!(
        "{BASE_CONFIG}
database:
  host: db.internal
  name: appdb
"
    );

    let pipeline = Pipeline::new(config(&with_db), local_image());
    let pipeline = pipeline
        .build(&runner, &NullSink, source.path())
        .await
        .map_err(|(_, e)| e)
        .expect("build");
    let pipeline = pipeline
        .push(&runner, &NullSink)
        .await
        .map_err(|(_, e)| e)
        .expect("push");
    let pipeline = pipeline
        .deploy(&runner, &NullSink)
        .await
        .map_err(|(_, e)| e)
        .expect("deploy");
    let pipeline = pipeline.attach_resources(&runner, &NullSink).await;
    let run = pipeline.report(None).await.finish();

    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(run.warnings.len(), 1);
    assert!(run.warnings[0].contains("forbidden"));
    // The credential object never landed, but the service did.
    assert!(runner.cluster().contains_key("Service/my-app"));
    assert!(!runner.cluster().contains_key("Secret/my-app-db"));
}

#[tokio::test]
async fn reapplying_the_service_is_idempotent() {
    let runner = FakeRunner::new(Vec::new());
    let cfg = config(BASE_CONFIG);
    let image = ImageRef::parse("registry.example.com/my-app:latest").unwrap();
    let env = std::collections::HashMap::new();

    for _ in 0..2 {
        deploy_service(
            &runner,
            &NullSink,
            &cfg.project,
            &image,
            &cfg.namespace,
            cfg.port,
            &cfg.resources,
            &env,
            Duration::from_secs(5),
        )
        .await
        .expect("apply");
    }

    let services: Vec<_> = runner
        .cluster()
        .into_keys()
        .filter(|k| k.starts_with("Service/"))
        .collect();
    assert_eq!(services, vec!["Service/my-app"]);
}
