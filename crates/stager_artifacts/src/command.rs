use std::{
    fmt,
    path::{Path, PathBuf},
};

use stager_config::{ArchiverConfig, DownloaderConfig};

/// The full argument vector of a supervised command, program first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine(Vec<String>);

impl CommandLine {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(args.into_iter().map(Into::into).collect())
    }

    /// The program to execute. Also used as the label of a running operation.
    pub fn program(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    /// The arguments passed to the program.
    pub fn args(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match shlex::try_join(self.0.iter().map(String::as_str)) {
            Ok(joined) => f.write_str(&joined),
            Err(_) => f.write_str(&self.0.join(" ")),
        }
    }
}

/// Absolute form of `path`, without touching the file system.
pub(crate) fn full_path(path: &Path) -> std::io::Result<PathBuf> {
    std::path::absolute(path)
}

/// `<program> <url> -O <output> <quiet-flag> <insecure-flag>`
///
/// Flags configured as empty strings are left out.
pub fn download_command(downloader: &DownloaderConfig, url: &str, output: &Path) -> CommandLine {
    let output = output.display().to_string();
    let mut args = vec![downloader.program.as_str(), url, "-O", output.as_str()];
    args.extend(
        [
            downloader.quiet_flag.as_str(),
            downloader.insecure_flag.as_str(),
        ]
        .into_iter()
        .filter(|flag| !flag.is_empty()),
    );
    CommandLine::new(args)
}

/// `<program> <extract-flags> <source> -C <destination>`
pub fn extract_command(archiver: &ArchiverConfig, source: &Path, destination: &Path) -> CommandLine {
    let source = source.display().to_string();
    let destination = destination.display().to_string();
    let mut args = vec![archiver.program.as_str()];
    if !archiver.extract_flags.is_empty() {
        args.push(archiver.extract_flags.as_str());
    }
    args.extend([source.as_str(), "-C", destination.as_str()]);
    CommandLine::new(args)
}
