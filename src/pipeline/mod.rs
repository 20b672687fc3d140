// ABOUTME: Pipeline orchestration using the type state pattern.
// ABOUTME: Exports state markers, the Pipeline struct, and the run record.

mod run;
mod state;
mod transitions;

pub use run::{PipelineRun, RunReport, RunStatus};
pub use state::{
    Completed, ImageBuilt, ImagePushed, Initialized, ResourcesAttached, ServiceDeployed,
};
pub use transitions::{Pipeline, TransitionResult};
