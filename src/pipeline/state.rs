// ABOUTME: Pipeline state marker types for the type state pattern.
// ABOUTME: Zero-sized types enforce the strictly forward stage order at compile time.

/// Initial state: configuration resolved, ready to build.
/// Available actions: `build()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialized;

/// Image built: a locally tagged image exists (buildpack or fallback path).
/// Available actions: `push()`
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageBuilt;

/// Image pushed: the image is available in the remote registry.
/// Available actions: `deploy()`
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePushed;

/// Service deployed: the primary workload descriptor was applied.
/// Available actions: `attach_resources()`
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceDeployed;

/// Resources attached: auxiliary credential objects processed (failures
/// degraded to warnings).
/// Available actions: `report()`
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourcesAttached;

/// Completed: terminal state, run record available.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Completed;
