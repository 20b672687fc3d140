// ABOUTME: Pipeline stage implementations: build, push, deploy/attach.
// ABOUTME: Each stage shells out through the CommandRunner abstraction.

pub mod build;
pub mod deploy;
mod error;
pub mod push;

pub use build::{AppKind, BuildPath, build_image};
pub use deploy::{attach_cache, attach_database, attach_secrets, deploy_service};
pub use error::StageError;
pub use push::{generate_image_ref, push_image, registry_host, resolve_account};
