// ABOUTME: State transitions for the deployment pipeline using the type state pattern.
// ABOUTME: Each transition consumes the pipeline and returns the next state or the error pair.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::Path;

use crate::config::{Config, resolve_env_map};
use crate::diagnostics::{Diagnostics, Warning};
use crate::report::RunReporter;
use crate::runner::{CommandRunner, LogSink};
use crate::stages::{
    StageError, attach_cache, attach_database, attach_secrets, build_image, deploy_service,
    push_image,
};
use crate::types::ImageRef;

use super::run::{PipelineRun, RunStatus};
use super::state::{
    Completed, ImageBuilt, ImagePushed, Initialized, ResourcesAttached, ServiceDeployed,
};

/// Result of a state transition: the next state on success, or the pipeline in
/// its current state paired with the stage error so callers can still extract
/// the run record.
pub type TransitionResult<T, S> = Result<Pipeline<T>, (Pipeline<S>, StageError)>;

/// A deployment pipeline parameterized by its current state.
///
/// Stages run strictly forward: build, push, deploy, attach, report. A failed
/// transition hands the pipeline back unchanged; `abort` turns it into a
/// failed run record.
pub struct Pipeline<S> {
    config: Config,
    run: PipelineRun,
    image: ImageRef,
    diagnostics: Diagnostics,
    _state: PhantomData<S>,
}

impl Pipeline<Initialized> {
    pub fn new(config: Config, image: ImageRef) -> Self {
        let run = PipelineRun::new(config.project.clone(), config.namespace.clone());
        Pipeline {
            config,
            run,
            image,
            diagnostics: Diagnostics::default(),
            _state: PhantomData,
        }
    }

    /// Build a locally tagged image from the source tree.
    pub async fn build<R: CommandRunner + ?Sized>(
        mut self,
        runner: &R,
        sink: &dyn LogSink,
        source: &Path,
    ) -> TransitionResult<ImageBuilt, Initialized> {
        self.run.set_status(RunStatus::Building);

        let build_env = match resolve_env_map(&self.config.env) {
            Ok(env) => env,
            Err(e) => {
                let error = StageError::Config(e.to_string());
                return Err((self, error));
            }
        };

        match build_image(
            runner,
            sink,
            source,
            &self.image,
            &build_env,
            self.config.command_timeout,
        )
        .await
        {
            Ok(path) => {
                self.run.build_path = Some(path);
                Ok(self.transition())
            }
            Err(e) => Err((self, e)),
        }
    }
}

impl Pipeline<ImageBuilt> {
    /// Push the image, retagging a local-only reference against the resolved
    /// registry first.
    pub async fn push<R: CommandRunner + ?Sized>(
        mut self,
        runner: &R,
        sink: &dyn LogSink,
    ) -> TransitionResult<ImagePushed, ImageBuilt> {
        self.run.set_status(RunStatus::Pushing);
        let region = self.config.registry.resolve_region();

        match push_image(runner, sink, &self.image, &region, self.config.command_timeout).await {
            Ok(remote) => {
                self.run.image = Some(remote.clone());
                self.image = remote;
                Ok(self.transition())
            }
            Err(e) => Err((self, e)),
        }
    }
}

impl Pipeline<ImagePushed> {
    /// Apply the service descriptor pointing at the pushed image.
    pub async fn deploy<R: CommandRunner + ?Sized>(
        mut self,
        runner: &R,
        sink: &dyn LogSink,
    ) -> TransitionResult<ServiceDeployed, ImagePushed> {
        self.run.set_status(RunStatus::Deploying);

        let runtime_env = match resolve_env_map(&self.config.env) {
            Ok(env) => env,
            Err(e) => {
                let error = StageError::Config(e.to_string());
                return Err((self, error));
            }
        };

        let result = deploy_service(
            runner,
            sink,
            &self.config.project,
            &self.image,
            &self.config.namespace,
            self.config.port,
            &self.config.resources,
            &runtime_env,
            self.config.command_timeout,
        )
        .await;

        match result {
            Ok(()) => Ok(self.transition()),
            Err(e) => Err((self, e)),
        }
    }
}

impl Pipeline<ServiceDeployed> {
    /// Attach database, cache, and secret credentials.
    ///
    /// The service is already serving at this point, so attachment failures
    /// degrade to warnings instead of failing the run.
    pub async fn attach_resources<R: CommandRunner + ?Sized>(
        mut self,
        runner: &R,
        sink: &dyn LogSink,
    ) -> Pipeline<ResourcesAttached> {
        self.run.set_status(RunStatus::Attaching);
        let timeout = self.config.command_timeout;

        if let Some(db) = &self.config.database {
            if let Err(e) = attach_database(
                runner,
                sink,
                &self.config.project,
                &self.config.namespace,
                db,
                timeout,
            )
            .await
            {
                self.diagnostics.warn(Warning::database_attach(e.to_string()));
            }
        }

        if let Some(cache) = &self.config.cache {
            if let Err(e) = attach_cache(
                runner,
                sink,
                &self.config.project,
                &self.config.namespace,
                cache,
                timeout,
            )
            .await
            {
                self.diagnostics.warn(Warning::cache_attach(e.to_string()));
            }
        }

        if !self.config.secrets.is_empty() {
            if let Err(e) = attach_secrets(
                runner,
                sink,
                &self.config.project,
                &self.config.namespace,
                &self.config.secrets,
                timeout,
            )
            .await
            {
                self.diagnostics.warn(Warning::secrets_attach(e.to_string()));
            }
        }

        self.run.warnings = self.diagnostics.messages();
        self.transition()
    }
}

impl Pipeline<ResourcesAttached> {
    /// Mark the run as succeeded and post the summary to the tracking
    /// endpoint, when one is configured. Reporting failures degrade to a
    /// warning.
    pub async fn report(mut self, reporter: Option<&RunReporter>) -> Pipeline<Completed> {
        self.run.finish_success();

        if let Some(reporter) = reporter {
            if let Err(e) = reporter.post(&self.run).await {
                self.diagnostics.warn(Warning::report(e.to_string()));
                self.run.warnings = self.diagnostics.messages();
            }
        }

        self.transition()
    }
}

impl Pipeline<Completed> {
    /// Consume the pipeline and yield the final run record.
    pub fn finish(self) -> PipelineRun {
        self.run
    }
}

impl<S> Pipeline<S> {
    pub fn record(&self) -> &PipelineRun {
        &self.run
    }

    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Terminate the run with a stage error, yielding the failed run record.
    pub fn abort(mut self, error: &StageError) -> PipelineRun {
        self.run.finish_failure(error.to_string());
        self.run.warnings = self.diagnostics.messages();
        self.run
    }

    fn transition<T>(self) -> Pipeline<T> {
        Pipeline {
            config: self.config,
            run: self.run,
            image: self.image,
            diagnostics: self.diagnostics,
            _state: PhantomData,
        }
    }
}
