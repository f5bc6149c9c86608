//! Environment variable lookup and placeholder resolution.
//!
//! Task files reference host environment variables with backtick
//! placeholders of the form `` `$NAME` `` inside mount paths, directory
//! paths, user fields and env values. Lookups go through the [`EnvSource`]
//! trait so tests can substitute an in-memory map for the process
//! environment.

pub mod mock;
pub mod real;
pub mod resolver;

pub use mock::MockEnv;
pub use real::HostEnv;
pub use resolver::resolve;

/// Source of environment variable values.
pub trait EnvSource: Send + Sync {
    /// Look up a variable. `None` means unset; an empty value is treated
    /// as unset by the resolver.
    fn lookup(&self, name: &str) -> Option<String>;
}
