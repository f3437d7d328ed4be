use std::{
    collections::BTreeSet as Set,
    path::{Path, PathBuf},
    str::FromStr,
};

use itertools::Itertools;
use miette::{IntoDiagnostic, miette};
use serde::{Deserialize, Serialize};

/// Name of the directory used below the user cache and config directories.
pub const STAGER_DIR: &str = "stager";

/// Name of the configuration file inside the user config directory.
pub const CONFIG_FILE: &str = "config.toml";

/// File that receives the combined output of supervised commands.
pub const DEFAULT_BASH_LOG_FILENAME: &str = "executor.bash.log";

const LOGS_DIR: &str = "logs";

/// Returns the default cache directory.
///
/// The `STAGER_CACHE_DIR` environment variable takes precedence, otherwise
/// `<user cache dir>/stager` is used.
pub fn get_cache_dir() -> miette::Result<PathBuf> {
    std::env::var_os("STAGER_CACHE_DIR")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::cache_dir().map(|dir| dir.join(STAGER_DIR)))
        .ok_or_else(|| miette!("could not determine default cache directory"))
}

/// Location of the per-user configuration file, if the platform has one.
pub fn config_path_user() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(STAGER_DIR).join(CONFIG_FILE))
}

/// The binary and flags used to download an artifact.
///
/// Downloads are invoked as `<program> <url> -O <output> <quiet-flag> <insecure-flag>`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct DownloaderConfig {
    pub program: String,
    pub quiet_flag: String,
    pub insecure_flag: String,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            program: "wget".to_string(),
            quiet_flag: "-nv".to_string(),
            insecure_flag: "--no-check-certificate".to_string(),
        }
    }
}

/// The binary and flags used to unpack an archive.
///
/// Extractions are invoked as `<program> <extract-flags> <source> -C <destination>`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct ArchiverConfig {
    pub program: String,
    pub extract_flags: String,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            program: "tar".to_string(),
            extract_flags: "-oxzf".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Directory shared by all tasks on this host that holds fetched artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_directory: Option<PathBuf>,

    /// Directory used to stage downloads before they are moved into the cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_directory: Option<PathBuf>,

    /// Directory holding one sub-directory of logs per task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_directory: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bash_log_filename: Option<String>,

    #[serde(default)]
    pub downloader: DownloaderConfig,

    #[serde(default)]
    pub archiver: ArchiverConfig,

    #[serde(skip)]
    pub loaded_from: Vec<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("no file was found at {0}")]
    FileNotFound(PathBuf),
    #[error("failed to read config from '{0}'")]
    ReadError(std::io::Error),
    #[error("failed to parse config of {1}: {0}")]
    ParseError(miette::Report, PathBuf),
    #[error("validation error of {1}: {0}")]
    ValidationError(miette::Report, PathBuf),
}

impl Config {
    /// Parse the given toml string and return a Config instance.
    ///
    /// # Returns
    ///
    /// The parsed config, and the unused keys
    pub fn from_toml(toml: &str) -> miette::Result<(Config, Set<String>)> {
        let de = toml_edit::de::Deserializer::from_str(toml).into_diagnostic()?;

        let mut unused_keys = Set::new();
        let config: Config = serde_ignored::deserialize(de, |path| {
            unused_keys.insert(path.to_string());
        })
        .into_diagnostic()?;

        Ok((config, unused_keys))
    }

    /// Load the config from the given path.
    ///
    /// # Errors
    ///
    /// I/O errors, parsing errors or validation errors
    pub fn from_path(path: &Path) -> Result<Config, ConfigError> {
        tracing::debug!("Loading config from {}", path.display());
        let s = match fs_err::read_to_string(path) {
            Ok(content) => content,
            Err(e)
                if e.kind() == std::io::ErrorKind::NotFound
                    || e.kind() == std::io::ErrorKind::NotADirectory =>
            {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::ReadError(e)),
        };

        let (mut config, unused_keys) =
            Config::from_toml(&s).map_err(|e| ConfigError::ParseError(e, path.to_path_buf()))?;

        if !unused_keys.is_empty() {
            tracing::warn!(
                "Ignoring '{}' in at {}",
                console::style(unused_keys.iter().join(", ")).yellow(),
                path.display()
            );
        }

        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e, path.to_path_buf()))?;

        config.loaded_from.push(path.to_path_buf());
        tracing::debug!("Loaded config from: {}", path.display());

        Ok(config)
    }

    /// Load the configuration that applies to this invocation.
    ///
    /// An explicit path must exist. Without one, `STAGER_CONFIG` is consulted
    /// and then the user config file; a missing user config file yields the
    /// defaults.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        if let Some(path) = path {
            return Self::from_path(path);
        }

        if let Some(path) = std::env::var_os("STAGER_CONFIG").filter(|value| !value.is_empty()) {
            return Self::from_path(Path::new(&path));
        }

        match config_path_user() {
            Some(path) => match Self::from_path(&path) {
                Err(ConfigError::FileNotFound(_)) => Ok(Self::default()),
                result => result,
            },
            None => Ok(Self::default()),
        }
    }

    /// Validate the config.
    pub fn validate(&self) -> miette::Result<()> {
        if self.downloader.program.trim().is_empty() {
            return Err(miette!("`downloader.program` must not be empty"));
        }
        if self.archiver.program.trim().is_empty() {
            return Err(miette!("`archiver.program` must not be empty"));
        }
        if let Some(filename) = &self.bash_log_filename {
            if filename.is_empty() || filename.contains(['/', '\\']) {
                return Err(miette!(
                    "`bash-log-filename` must be a plain file name: {filename}"
                ));
            }
        }
        Ok(())
    }

    /// The shared artifact cache directory.
    pub fn cache_directory(&self) -> miette::Result<PathBuf> {
        match &self.cache_directory {
            Some(dir) => Ok(dir.clone()),
            None => get_cache_dir(),
        }
    }

    /// The directory in which downloads are staged, defaults to the system
    /// temporary directory.
    pub fn temp_directory(&self) -> PathBuf {
        self.temp_directory
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// The root of the per-task log directories.
    pub fn log_directory(&self) -> miette::Result<PathBuf> {
        match &self.log_directory {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.cache_directory()?.join(LOGS_DIR)),
        }
    }

    pub fn bash_log_filename(&self) -> &str {
        self.bash_log_filename
            .as_deref()
            .unwrap_or(DEFAULT_BASH_LOG_FILENAME)
    }

    /// The file that receives the output of commands run on behalf of a task.
    pub fn executor_bash_log_path(&self, task_id: &str) -> miette::Result<PathBuf> {
        Ok(self
            .log_directory()?
            .join(task_id)
            .join(self.bash_log_filename()))
    }
}
