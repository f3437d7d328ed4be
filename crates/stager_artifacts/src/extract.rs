use std::{path::Path, sync::Arc};

use stager_config::ArchiverConfig;
use tracing::{info, instrument};

use crate::{
    command::{extract_command, full_path},
    error::ArtifactError,
    supervisor::ProcessSupervisor,
};

/// Unpacks archives with an external archiver.
///
/// Whether the extraction worked is decided solely by the archiver's exit
/// code, the extracted files are not inspected.
pub struct Extractor {
    archiver: ArchiverConfig,
    supervisor: Arc<ProcessSupervisor>,
}

impl Extractor {
    pub fn new(archiver: ArchiverConfig, supervisor: Arc<ProcessSupervisor>) -> Self {
        Self {
            archiver,
            supervisor,
        }
    }

    /// Unpacks `source` into the existing directory `destination`.
    #[instrument(skip(self))]
    pub fn extract(&self, source: &Path, destination: &Path) -> Result<(), ArtifactError> {
        let source = full_path(source)?;
        let destination = full_path(destination)?;
        info!("Extracting {} to {}", source.display(), destination.display());
        self.supervisor
            .run(&extract_command(&self.archiver, &source, &destination))
    }
}
