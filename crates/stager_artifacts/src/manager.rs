use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use stager_config::Config;
use tokio_util::sync::CancellationToken;

use crate::{
    cache::ArtifactCache,
    descriptor::ArtifactDescriptor,
    error::ArtifactError,
    extract::Extractor,
    fetch::ArtifactFetcher,
    runner::{CommandRunner, SystemRunner},
    supervisor::ProcessSupervisor,
};

/// Everything a single task needs to stage its artifacts.
///
/// The fetcher and extractor share one [`ProcessSupervisor`], so at most one
/// command runs on behalf of the task and
/// [`ArtifactManager::destroy_process_if_active`] stops whichever it is.
pub struct ArtifactManager {
    task_id: String,
    supervisor: Arc<ProcessSupervisor>,
    fetcher: ArtifactFetcher,
    extractor: Extractor,
}

impl ArtifactManager {
    /// Builds a manager for `task_id` that starts commands through `runner`.
    pub fn new(
        config: &Config,
        task_id: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
    ) -> miette::Result<Self> {
        let task_id = task_id.into();
        let supervisor = Arc::new(ProcessSupervisor::new(
            runner,
            config.executor_bash_log_path(&task_id)?,
        ));
        let fetcher = ArtifactFetcher::new(
            ArtifactCache::new(config.cache_directory()?),
            config.temp_directory(),
            config.downloader.clone(),
            supervisor.clone(),
        );
        let extractor = Extractor::new(config.archiver.clone(), supervisor.clone());

        Ok(Self {
            task_id,
            supervisor,
            fetcher,
            extractor,
        })
    }

    /// Builds a manager that runs commands as child processes.
    pub fn system(config: &Config, task_id: impl Into<String>) -> miette::Result<Self> {
        Self::new(config, task_id, Arc::new(SystemRunner))
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn cache(&self) -> &ArtifactCache {
        self.fetcher.cache()
    }

    /// The file supervised commands write their output to.
    pub fn executor_log(&self) -> &Path {
        self.supervisor.output()
    }

    pub fn fetch(&self, descriptor: &ArtifactDescriptor) -> Result<PathBuf, ArtifactError> {
        self.fetcher.fetch(descriptor)
    }

    pub fn download_and_check(
        &self,
        descriptor: &ArtifactDescriptor,
        target: &Path,
    ) -> Result<(), ArtifactError> {
        self.fetcher.download_and_check(descriptor, target)
    }

    pub fn extract(&self, source: &Path, destination: &Path) -> Result<(), ArtifactError> {
        self.extractor.extract(source, destination)
    }

    /// Stops the command currently running for this task, if any. Safe to call
    /// from any thread.
    pub fn destroy_process_if_active(&self) {
        self.supervisor.destroy();
    }

    /// Cancelling this token makes the task refuse to start further commands.
    pub fn interrupt_token(&self) -> CancellationToken {
        self.supervisor.interrupt_token()
    }

    pub fn supervisor(&self) -> &Arc<ProcessSupervisor> {
        &self.supervisor
    }
}
