//! Fetches the artifacts a task needs, verifies them, keeps them in a shared
//! cache and unpacks them.
//!
//! Byte transfer and decompression are delegated to external commands that
//! run under a [`ProcessSupervisor`], which allows a different thread to stop
//! the command at any time.

mod cache;
pub mod command;
mod descriptor;
mod error;
mod extract;
mod fetch;
mod manager;
pub mod runner;
mod supervisor;
pub mod verify;

pub use cache::ArtifactCache;
pub use command::CommandLine;
pub use descriptor::{ArtifactDescriptor, filename_for};
pub use error::{ArtifactError, IntegrityCheck};
pub use extract::Extractor;
pub use fetch::ArtifactFetcher;
pub use manager::ArtifactManager;
pub use runner::{CommandRunner, RunningCommand, SystemRunner};
pub use supervisor::ProcessSupervisor;
