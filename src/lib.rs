//! # Dunner
//!
//! A task runner that executes user-defined, multi-step build and CI tasks
//! inside ephemeral Docker containers. Tasks are declared in a
//! `.dunner.yaml` file; each step names an image, the commands to run in
//! it, environment variables, bind mounts, and optionally chains to
//! another task.
//!
//! ## Modules
//!
//! - `config` - task file model, loader, validation, scope merge, mounts
//! - `docker` - container backend trait, docker CLI backend, step execution
//! - `dunner` - task executor/scheduler and argument substitution
//! - `env` - environment variable lookup and placeholder resolution
//! - `error` - crate-wide error type
//! - `process` - subprocess abstraction layer for testing
//! - `settings` - immutable per-invocation settings

pub mod config;
pub mod docker;
pub mod dunner;
pub mod env;
pub mod error;
pub mod process;
pub mod settings;
