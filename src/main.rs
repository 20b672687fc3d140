// ABOUTME: Entry point for the caravel CLI application.
// ABOUTME: Parses arguments and dispatches to the pipeline and standalone stages.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use caravel::agent::{
    Classifier, DEFAULT_BUFFER_CAPACITY, FixSelector, FixStrategy, HttpAnalyzer, LogMonitor,
};
use caravel::config::{self, Config};
use caravel::error::{Error, Result};
use caravel::output::{Output, OutputMode};
use caravel::pipeline::Pipeline;
use caravel::report::RunReporter;
use caravel::runner::{CommandRunner, LogSink, ProcessRunner};
use caravel::stages::{StageError, build_image, generate_image_ref, push_image};
use caravel::types::{ImageRef, ProjectName};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);

    if let Err(e) = run(cli, &mut output).await {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &mut Output) -> Result<()> {
    let echo = cli.verbose;
    match cli.command {
        Commands::Init {
            project,
            image,
            force,
        } => {
            let cwd = env::current_dir()?;
            // Without an explicit name, derive one from the directory.
            let derived = cwd
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| ProjectName::from_directory(n).ok())
                .map(|p| p.to_string());
            let project = project.or(derived);
            config::init_config(&cwd, project.as_deref(), image.as_deref(), force)?;
            output.success("Created caravel.yml");
            Ok(())
        }
        Commands::Build { path, image } => {
            let config = Config::discover(&path)?;
            build(config, &path, image.as_deref(), echo, output).await
        }
        Commands::Push { image } => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            push(config, image.as_deref(), echo, output).await
        }
        Commands::Deploy { path } => {
            let config = Config::discover(&path)?;
            deploy(config, &path, echo, output).await
        }
        Commands::Status => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            output.progress(&format!("Project:   {}", config.project));
            output.progress(&format!("Namespace: {}", config.namespace));
            output.progress(&format!("Port:      {}", config.port));
            match &config.image {
                Some(image) => output.progress(&format!("Image:     {image}")),
                None => output.progress("Image:     derived at deploy time"),
            }
            Ok(())
        }
    }
}

/// Sink that feeds the monitor and optionally echoes lines to the terminal.
struct PipelineSink {
    monitor: LogMonitor,
    echo: bool,
}

impl LogSink for PipelineSink {
    fn record_line(&self, line: &str) {
        self.monitor.observe_line(line);
        if self.echo {
            println!("    {line}");
        }
    }
}

/// Build the log monitor, wiring in the external analyzer when configured.
fn build_monitor(config: &Config) -> LogMonitor {
    let selector = match &config.analysis {
        Some(analysis) => match HttpAnalyzer::new(&analysis.endpoint, analysis.timeout) {
            Ok(analyzer) => FixSelector::new(analysis.threshold, Some(Arc::new(analyzer))),
            Err(e) => {
                tracing::warn!("analysis endpoint unavailable, selecting fixes locally: {e}");
                FixSelector::new(analysis.threshold, None)
            }
        },
        None => FixSelector::default(),
    };
    LogMonitor::new(DEFAULT_BUFFER_CAPACITY, Classifier::default(), selector)
}

/// Resolve the target image: explicit override, configured reference, or one
/// derived from the project name and registry identity.
async fn resolve_image<R: CommandRunner + ?Sized>(
    config: &Config,
    override_ref: Option<&str>,
    runner: &R,
    sink: &dyn LogSink,
) -> Result<ImageRef> {
    if let Some(s) = override_ref {
        return ImageRef::parse(s).map_err(|e| Error::InvalidConfig(e.to_string()));
    }
    if let Some(image) = &config.image {
        return Ok(image.clone());
    }
    let region = config.registry.resolve_region();
    Ok(generate_image_ref(
        runner,
        sink,
        &config.project,
        &region,
        config.command_timeout,
    )
    .await)
}

/// Close out a failed pipeline and surface the suggested fix.
async fn abort_run<S>(
    pipeline: Pipeline<S>,
    error: StageError,
    monitor: &LogMonitor,
    output: &Output,
) -> Result<()> {
    let run = pipeline.abort(&error);
    tracing::debug!(run = %run.id, "pipeline aborted");
    fail_with_suggestion(error, monitor, output).await
}

/// Surface the monitor's suggested fix for a failed stage, then fail.
async fn fail_with_suggestion(
    error: StageError,
    monitor: &LogMonitor,
    output: &Output,
) -> Result<()> {
    monitor.observe_line(&error.to_string());
    if let Some(fix) = monitor.select_fix().await {
        print_suggestion(&fix, output);
    }
    Err(Error::Pipeline(error.to_string()))
}

fn print_suggestion(fix: &FixStrategy, output: &Output) {
    output.progress(&format!(
        "Suggested fix ({:.0}% confidence): {}",
        fix.confidence * 100.0,
        fix.description
    ));
    for command in &fix.commands {
        output.progress(&format!("  $ {command}"));
    }
}

async fn build(
    config: Config,
    source: &Path,
    image_override: Option<&str>,
    echo: bool,
    output: &mut Output,
) -> Result<()> {
    output.start_timer();
    let runner = ProcessRunner::new();
    let monitor = build_monitor(&config);
    let sink = PipelineSink {
        monitor: monitor.clone(),
        echo,
    };

    let image = resolve_image(&config, image_override, &runner, &sink).await?;
    output.progress(&format!("Building {image}..."));

    let build_env = config::resolve_env_map(&config.env)
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;

    match build_image(
        &runner,
        &sink,
        source,
        &image,
        &build_env,
        config.command_timeout,
    )
    .await
    {
        Ok(path) => {
            output.success(&format!("✓ Built {image} via {path}"));
            Ok(())
        }
        Err(e) => fail_with_suggestion(e, &monitor, output).await,
    }
}

async fn push(
    config: Config,
    image_override: Option<&str>,
    echo: bool,
    output: &mut Output,
) -> Result<()> {
    output.start_timer();
    let runner = ProcessRunner::new();
    let monitor = build_monitor(&config);
    let sink = PipelineSink {
        monitor: monitor.clone(),
        echo,
    };

    let image = resolve_image(&config, image_override, &runner, &sink).await?;
    let region = config.registry.resolve_region();
    output.progress(&format!("Pushing {image}..."));

    match push_image(&runner, &sink, &image, &region, config.command_timeout).await {
        Ok(remote) => {
            output.success(&format!("✓ Pushed {remote}"));
            Ok(())
        }
        Err(e) => fail_with_suggestion(e, &monitor, output).await,
    }
}

/// Run the full pipeline state machine.
async fn deploy(config: Config, source: &Path, echo: bool, output: &mut Output) -> Result<()> {
    output.start_timer();
    let runner = ProcessRunner::new();
    let monitor = build_monitor(&config);
    let sink = PipelineSink {
        monitor: monitor.clone(),
        echo,
    };

    let reporter = match &config.report_url {
        Some(url) => Some(RunReporter::new(url).map_err(|e| Error::Pipeline(e.to_string()))?),
        None => None,
    };

    let image = resolve_image(&config, None, &runner, &sink).await?;
    output.progress(&format!(
        "Deploying {} ({}) to namespace {}",
        config.project, image, config.namespace
    ));

    let pipeline = Pipeline::new(config, image);

    output.progress("  → Building image...");
    let pipeline = match pipeline.build(&runner, &sink, source).await {
        Ok(p) => p,
        Err((failed, e)) => return abort_run(failed, e, &monitor, output).await,
    };

    output.progress("  → Pushing image...");
    let pipeline = match pipeline.push(&runner, &sink).await {
        Ok(p) => p,
        Err((failed, e)) => return abort_run(failed, e, &monitor, output).await,
    };

    output.progress("  → Applying service...");
    let pipeline = match pipeline.deploy(&runner, &sink).await {
        Ok(p) => p,
        Err((failed, e)) => return abort_run(failed, e, &monitor, output).await,
    };

    output.progress("  → Attaching resources...");
    let pipeline = pipeline.attach_resources(&runner, &sink).await;
    for warning in &pipeline.record().warnings {
        output.warning(warning);
    }

    let pipeline = pipeline.report(reporter.as_ref()).await;
    let run = pipeline.finish();

    let deployed = run
        .image
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| run.project.to_string());
    output.success(&format!("✓ Deployed {deployed}"));
    Ok(())
}
