// ABOUTME: Log monitor integration tests: sink wiring, buffering, and fix surfacing.
// ABOUTME: Streams scripted command output through the monitor like the CLI does.

mod support;

use support::{FakeRunner, Outcome, Rule};

use caravel::agent::{AgentPhase, Category, Classifier, FixSelector, LogMonitor};
use caravel::runner::{CommandRunner, CommandSpec};
use std::time::Duration;

#[tokio::test]
async fn monitor_detects_failures_streamed_by_the_runner() {
    let runner = FakeRunner::new(vec![Rule::new(
        "pack",
        Outcome::fails(1, &[
            "Pulling builder image",
            "ERROR: failed to build: exit status 51",
        ]),
    )]);
    let monitor = LogMonitor::default();

    let spec = CommandSpec::new("pack")
        .args(["build", "my-app:latest"])
        .timeout(Duration::from_secs(5));
    let output = runner.run(&spec, &monitor).await.unwrap();

    assert_eq!(output.exit_code, 1);
    assert_eq!(monitor.status().phase, AgentPhase::ErrorDetected);
    assert_eq!(monitor.status().captured_lines, 2);

    let error = monitor.last_error().unwrap();
    assert_eq!(error.pattern.category, Category::BuildpackFailure);

    let fix = monitor.select_fix_local().unwrap();
    assert_eq!(fix.name, "dockerfile_fallback");
    assert_eq!(monitor.status().phase, AgentPhase::FixSelected);
}

#[tokio::test]
async fn buffer_stays_bounded_under_long_output() {
    let monitor = LogMonitor::new(3, Classifier::default(), FixSelector::default());
    for i in 0..50 {
        monitor.observe_line(&format!("layer {i} pushed"));
    }

    assert_eq!(monitor.status().captured_lines, 3);
    assert_eq!(
        monitor.recent_lines(10),
        vec!["layer 47 pushed", "layer 48 pushed", "layer 49 pushed"]
    );
}

#[tokio::test]
async fn watch_drains_a_log_stream() {
    let monitor = LogMonitor::default();
    let log = "\
Deploying service
Warning: ImagePullBackOff on pod my-app-00001
Deploy completed without errors
";
    let detections = monitor.watch(log.as_bytes()).await.unwrap();

    assert_eq!(detections, 1);
    assert_eq!(
        monitor.last_error().unwrap().pattern.category,
        Category::ImagePullBackoff
    );
    // Benign lines after the error still land in the buffer.
    assert_eq!(monitor.status().captured_lines, 3);
}

#[tokio::test]
async fn registry_credentials_never_reach_the_monitor() {
    let runner = FakeRunner::new(vec![
        Rule::new("aws", Outcome::ok_stdout("123456789012\n")).with_args("get-caller-identity"),
        Rule::new(
            "aws",
            Outcome::Exit {
                code: 0,
                stdout: "registry-password\n",
                lines: &["registry-password"],
            },
        )
        .with_args("get-login-password"),
    ]);
    let monitor = LogMonitor::default();
    let image = caravel::types::ImageRef::parse("my-app:latest").unwrap();

    caravel::stages::push_image(&runner, &monitor, &image, "us-east-1", Duration::from_secs(5))
        .await
        .expect("push");

    assert!(
        monitor
            .recent_lines(500)
            .iter()
            .all(|line| !line.contains("registry-password")),
        "credential leaked into the monitor buffer"
    );
}

#[tokio::test]
async fn escalation_context_is_the_buffer_snapshot() {
    // Without an analyzer, select_fix still resolves from the local table.
    let monitor = LogMonitor::default();
    monitor.observe_line("context line one");
    monitor.observe_line("no such host: registry.example.com");

    let fix = monitor.select_fix().await.unwrap();
    assert_eq!(fix.name, "check_cluster_dns");
}

#[test]
fn reset_allows_reuse_between_runs() {
    let monitor = LogMonitor::default();
    monitor.observe_line("permission denied while connecting");
    assert_eq!(monitor.status().phase, AgentPhase::ErrorDetected);

    monitor.reset();
    assert_eq!(monitor.status().phase, AgentPhase::Idle);
    assert!(monitor.select_fix_local().is_none());
}
