use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use stager_config::DownloaderConfig;
use tracing::{info, instrument};

use crate::{
    cache::ArtifactCache,
    command::{download_command, full_path},
    descriptor::ArtifactDescriptor,
    error::ArtifactError,
    supervisor::ProcessSupervisor,
    verify,
};

/// Downloads artifacts into the cache through a [`ProcessSupervisor`].
///
/// Downloads are staged in a temporary directory outside the cache, verified
/// there and then renamed into place, so the cache path only ever holds a
/// complete, verified file or whatever it held before.
///
/// Two fetchers racing on the same missing artifact both download it and the
/// last rename wins. Both files are verified, so readers never see a partial
/// one.
pub struct ArtifactFetcher {
    cache: ArtifactCache,
    temp_dir: PathBuf,
    downloader: DownloaderConfig,
    supervisor: Arc<ProcessSupervisor>,
}

impl ArtifactFetcher {
    pub fn new(
        cache: ArtifactCache,
        temp_dir: impl Into<PathBuf>,
        downloader: DownloaderConfig,
        supervisor: Arc<ProcessSupervisor>,
    ) -> Self {
        Self {
            cache,
            temp_dir: temp_dir.into(),
            downloader,
            supervisor,
        }
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Returns the cache path of a verified copy of the artifact, downloading
    /// it first if the cache holds no usable copy.
    #[instrument(skip(self), fields(url = %descriptor.url))]
    pub fn fetch(&self, descriptor: &ArtifactDescriptor) -> Result<PathBuf, ArtifactError> {
        let cached_path = self.cache.candidate(descriptor)?;

        match self.cache.lookup(descriptor)? {
            Some(path) => info!("Using cached file {}", full_path(&path)?.display()),
            None => self.download_and_cache(descriptor, &cached_path)?,
        }

        Ok(cached_path)
    }

    /// Downloads the artifact straight to `target` and verifies it there,
    /// without involving the cache.
    pub fn download_and_check(
        &self,
        descriptor: &ArtifactDescriptor,
        target: &Path,
    ) -> Result<(), ArtifactError> {
        self.download(&descriptor.url, target)?;
        verify::verify(descriptor, target)
    }

    fn download_and_cache(
        &self,
        descriptor: &ArtifactDescriptor,
        cached_path: &Path,
    ) -> Result<(), ArtifactError> {
        let temp_path = self.create_temp_path(descriptor.filename())?;

        // A download that fails verification is left in the temporary
        // directory and the cache is not touched.
        self.download_and_check(descriptor, &temp_path)?;

        if let Some(parent) = cached_path.parent() {
            fs_err::create_dir_all(parent)?;
        }
        fs_err::rename(&temp_path, cached_path)?;

        Ok(())
    }

    /// Creates an empty staging file named after the artifact.
    fn create_temp_path(&self, filename: &str) -> Result<PathBuf, ArtifactError> {
        fs_err::create_dir_all(&self.temp_dir)?;
        let temp_path = tempfile::Builder::new()
            .prefix(filename)
            .suffix(".tmp")
            .tempfile_in(&self.temp_dir)?
            .into_temp_path()
            .keep()
            .map_err(|err| err.error)?;
        Ok(temp_path)
    }

    fn download(&self, url: &str, path: &Path) -> Result<(), ArtifactError> {
        let path = full_path(path)?;
        info!("Downloading {url} to {}", path.display());
        self.supervisor
            .run(&download_command(&self.downloader, url, &path))
    }
}
