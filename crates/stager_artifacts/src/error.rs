use std::{fmt, path::PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::command::CommandLine;

/// Errors that can occur while fetching, verifying or unpacking an artifact.
#[derive(Debug, Error, Diagnostic)]
pub enum ArtifactError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{check} ({})", path.display())]
    IntegrityMismatch { path: PathBuf, check: IntegrityCheck },

    #[error("got {} while running command {command}", describe_exit(*code))]
    CommandFailed {
        command: CommandLine,
        code: Option<i32>,
    },

    #[error("failed to start command {command}")]
    ProcessStart {
        command: CommandLine,
        #[source]
        source: std::io::Error,
    },

    #[error("interrupted while registering command {command}")]
    #[diagnostic(help("the task was asked to stop before the command could be tracked"))]
    Interrupted { command: CommandLine },

    #[error("cannot derive a cache file name from `{url}`")]
    NoFilename { url: String },
}

/// The integrity check that rejected a file, with the values that disagreed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityCheck {
    Size { expected: u64, actual: u64 },
    Checksum { expected: String, actual: String },
}

impl fmt::Display for IntegrityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityCheck::Size { expected, actual } => {
                write!(f, "file size {actual} does not match expected ({expected})")
            }
            IntegrityCheck::Checksum { expected, actual } => {
                write!(f, "checksum {actual} does not match expected ({expected})")
            }
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_string(),
    }
}

impl ArtifactError {
    /// Returns the failing integrity check if this is an integrity mismatch.
    pub fn integrity_check(&self) -> Option<&IntegrityCheck> {
        match self {
            ArtifactError::IntegrityMismatch { check, .. } => Some(check),
            _ => None,
        }
    }

    /// True when the error stems from the task being asked to stop.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, ArtifactError::Interrupted { .. })
    }
}
