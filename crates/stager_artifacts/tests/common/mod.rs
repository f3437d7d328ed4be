use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use stager_artifacts::{
    ArtifactCache, ArtifactFetcher, CommandLine, CommandRunner, Extractor, ProcessSupervisor,
    RunningCommand,
};
use stager_config::{ArchiverConfig, DownloaderConfig};
use tempfile::TempDir;

/// Pretends to be a downloader: writes the configured body for a URL to the
/// `-O` target and exits with 0, or exits with 8 for unknown URLs.
#[derive(Default)]
pub struct FakeRunner {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    commands: Mutex<Vec<CommandLine>>,
}

impl FakeRunner {
    pub fn serve(&self, url: &str, body: &[u8]) {
        self.bodies.lock().insert(url.to_string(), body.to_vec());
    }

    pub fn commands(&self) -> Vec<CommandLine> {
        self.commands.lock().clone()
    }

    pub fn downloads(&self) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|command| command.program() == "wget")
            .count()
    }
}

struct Exited(Option<i32>);

impl RunningCommand for Exited {
    fn wait(&self) -> std::io::Result<Option<i32>> {
        Ok(self.0)
    }

    fn kill(&self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CommandRunner for FakeRunner {
    fn spawn(
        &self,
        command: &CommandLine,
        _output: &Path,
    ) -> std::io::Result<Box<dyn RunningCommand>> {
        self.commands.lock().push(command.clone());

        let args = command.args();
        let code = match (args.first(), args.iter().position(|arg| arg == "-O")) {
            (Some(url), Some(idx)) => match self.bodies.lock().get(url.as_str()) {
                Some(body) => {
                    fs_err::write(&args[idx + 1], body)?;
                    0
                }
                None => 8,
            },
            _ => 0,
        };

        Ok(Box::new(Exited(Some(code))))
    }
}

/// A fetcher and extractor wired to a [`FakeRunner`] inside a scratch directory.
pub struct Harness {
    pub dir: TempDir,
    pub runner: Arc<FakeRunner>,
    pub supervisor: Arc<ProcessSupervisor>,
    pub fetcher: ArtifactFetcher,
    pub extractor: Extractor,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs_err::create_dir_all(dir.path().join("cache")).unwrap();

        let runner = Arc::new(FakeRunner::default());
        let supervisor = Arc::new(ProcessSupervisor::new(
            runner.clone(),
            dir.path().join("executor.bash.log"),
        ));
        let fetcher = ArtifactFetcher::new(
            ArtifactCache::new(dir.path().join("cache")),
            dir.path().join("tmp"),
            DownloaderConfig::default(),
            supervisor.clone(),
        );
        let extractor = Extractor::new(ArchiverConfig::default(), supervisor.clone());

        Self {
            dir,
            runner,
            supervisor,
            fetcher,
            extractor,
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.dir.path().join("tmp")
    }

    /// Files left behind in the staging directory.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        match fs_err::read_dir(self.temp_dir()) {
            Ok(entries) => entries.map(|entry| entry.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}
