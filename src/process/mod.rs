//! Subprocess abstraction layer.
//!
//! The docker CLI backend talks to the system through the [`ProcessRunner`]
//! trait so tests can script command results without spawning anything.

pub mod mock;
pub mod runner;

pub use mock::MockProcessRunner;
pub use runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner, TokioProcessRunner};
