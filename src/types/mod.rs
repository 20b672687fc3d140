// ABOUTME: Type-safe domain types for caravel.
// ABOUTME: Validated project names, image references, and phantom-typed IDs.

mod id;
mod image_ref;
mod project_name;

pub use id::{Id, RunId, RunMarker};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use project_name::{ProjectName, ProjectNameError};
