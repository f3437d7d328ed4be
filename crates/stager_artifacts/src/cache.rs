use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{command::full_path, descriptor::ArtifactDescriptor, error::ArtifactError, verify};

/// A flat directory of artifacts keyed by the file name derived from their
/// URL.
///
/// No metadata is stored next to an entry: whether a file is usable is
/// decided on every lookup by checking it against the descriptor.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The location an artifact with this file name is cached at.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// The absolute cache location of the artifact described by `descriptor`.
    ///
    /// Names that would resolve to the cache root or its parent are rejected.
    pub fn candidate(&self, descriptor: &ArtifactDescriptor) -> Result<PathBuf, ArtifactError> {
        let filename = descriptor.filename();
        if matches!(filename, "" | "." | "..") {
            return Err(ArtifactError::NoFilename {
                url: descriptor.url.clone(),
            });
        }
        Ok(full_path(&self.path_for(filename))?)
    }

    /// Returns the cached path if it holds a copy that satisfies `descriptor`.
    ///
    /// A missing or mismatching file is a miss. Failing to read an existing
    /// file is an error.
    pub fn lookup(&self, descriptor: &ArtifactDescriptor) -> Result<Option<PathBuf>, ArtifactError> {
        let candidate = self.candidate(descriptor)?;

        if !candidate.try_exists()? {
            debug!("Cached {} did not exist", candidate.display());
            return Ok(None);
        }

        if let Some(check) = verify::find_mismatch(descriptor, &candidate)? {
            debug!("Cached {} is unusable: {check}", candidate.display());
            return Ok(None);
        }

        Ok(Some(candidate))
    }
}
