//! appforge build targets
//!
//! Drives the external tools that build, test, lint and package the
//! application:
//! - Build metadata collected once per run (git commit, tag, timestamp)
//! - Go build tag and linker flag construction
//! - Unit / end-to-end package partitioning
//! - Named targets and their sequential composition
//! - A swappable runner so targets can be recorded instead of executed
//! - An in-process pipe for streaming archives into a container build

pub mod builder;
pub mod error;
pub mod flags;
pub mod info;
pub mod packages;
pub mod pipe;
pub mod runner;
pub mod targets;
pub mod tools;

// Re-export main types
pub use builder::{exe_suffix, Builder, RunSummary};
pub use error::{BuildError, BuildResult};
pub use flags::{ldflags, tags};
pub use info::{BuildInfo, Experimental};
pub use packages::{partition_packages, PackageSets};
pub use pipe::{pipe, PipeReader, PipeWriter};
pub use runner::{CommandRunner, DryRunner, Invocation, Recorded, SystemRunner};
pub use targets::Target;
pub use tools::Tool;

// Re-export appforge-config types for convenience
pub use appforge_config::Config;
