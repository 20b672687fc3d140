// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "caravel")]
#[command(about = "Build, push, and deploy containerized apps with log-driven diagnostics")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output for CI (only final result)
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// JSON lines output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new caravel.yml configuration file
    Init {
        /// Project name (defaults to a template placeholder)
        #[arg(short, long)]
        project: Option<String>,

        /// Target image reference
        #[arg(short, long)]
        image: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Build a local image from the source tree
    Build {
        /// Source directory
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Image to tag (defaults to the configured or derived reference)
        #[arg(short, long)]
        image: Option<String>,
    },

    /// Push an image to the registry, creating the repository if needed
    Push {
        /// Image to push (defaults to the configured or derived reference)
        #[arg(short, long)]
        image: Option<String>,
    },

    /// Run the full pipeline: build, push, deploy, attach resources
    Deploy {
        /// Source directory
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },

    /// Show the configured project and target
    Status,
}
