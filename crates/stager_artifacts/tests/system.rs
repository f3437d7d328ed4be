//! End-to-end tests that run real child processes.
#![cfg(unix)]

use std::{
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use assert_matches::assert_matches;
use stager_artifacts::{ArtifactDescriptor, ArtifactError, ArtifactManager, verify};
use stager_config::{Config, DownloaderConfig};
use tempfile::TempDir;

/// A stand-in for wget that copies `file://` URLs: `<url> -O <output> ...`.
const COPY_DOWNLOADER: &str = r#"#!/bin/sh
echo "fetching $1"
cp "${1#file://}" "$3"
"#;

/// A downloader that never finishes on its own.
const HANGING_DOWNLOADER: &str = "#!/bin/sh\nexec sleep 30\n";

fn write_script(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs_err::write(&path, contents).unwrap();
    fs_err::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn config(dir: &TempDir, downloader: &Path) -> Config {
    Config {
        cache_directory: Some(dir.path().join("cache")),
        temp_directory: Some(dir.path().join("tmp")),
        log_directory: Some(dir.path().join("logs")),
        downloader: DownloaderConfig {
            program: downloader.display().to_string(),
            ..DownloaderConfig::default()
        },
        ..Config::default()
    }
}

fn manager(config: &Config, task_id: &str) -> ArtifactManager {
    let manager = ArtifactManager::system(config, task_id).unwrap();
    fs_err::create_dir_all(manager.executor_log().parent().unwrap()).unwrap();
    manager
}

/// Packs `files` into a gzipped tarball with the system tar.
fn make_tarball(dir: &Path, files: &[(&str, &str)]) -> PathBuf {
    let src = dir.join("src");
    fs_err::create_dir_all(&src).unwrap();
    for (name, contents) in files {
        fs_err::write(src.join(name), contents).unwrap();
    }
    let archive = dir.join("bundle.tar.gz");
    let status = std::process::Command::new("tar")
        .arg("-czf")
        .arg(&archive)
        .arg("-C")
        .arg(&src)
        .arg(".")
        .status()
        .unwrap();
    assert!(status.success());
    archive
}

#[test]
fn fetch_and_extract_with_real_commands() {
    let dir = tempfile::tempdir().unwrap();
    let downloader = write_script(dir.path(), "fake-wget", COPY_DOWNLOADER);
    let archive = make_tarball(dir.path(), &[("run.sh", "echo hi\n")]);
    let config = config(&dir, &downloader);
    let manager = manager(&config, "task-1");

    let checksum = verify::file_checksum(&archive, verify::ChecksumAlgorithm::Md5).unwrap();
    let size = fs_err::metadata(&archive).unwrap().len() as i64;
    let descriptor = ArtifactDescriptor::new(format!("file://{}", archive.display()))
        .with_size(size)
        .with_checksum(checksum);

    let cached = manager.fetch(&descriptor).unwrap();
    assert_eq!(cached, dir.path().join("cache").join("bundle.tar.gz"));

    let app = dir.path().join("app");
    fs_err::create_dir_all(&app).unwrap();
    manager.extract(&cached, &app).unwrap();
    assert_eq!(
        fs_err::read_to_string(app.join("run.sh")).unwrap(),
        "echo hi\n"
    );

    // The downloader output ended up in the task's log.
    let log = fs_err::read_to_string(manager.executor_log()).unwrap();
    assert!(log.contains("fetching file://"));

    // Served from the cache even though the source is gone now.
    fs_err::remove_file(&archive).unwrap();
    assert_eq!(manager.fetch(&descriptor).unwrap(), cached);
}

#[test]
fn extract_failure_is_a_command_failure() {
    let dir = tempfile::tempdir().unwrap();
    let downloader = write_script(dir.path(), "fake-wget", COPY_DOWNLOADER);
    let config = config(&dir, &downloader);
    let manager = manager(&config, "task-2");

    let not_an_archive = dir.path().join("plain.tgz");
    fs_err::write(&not_an_archive, "plain text").unwrap();
    let app = dir.path().join("app");
    fs_err::create_dir_all(&app).unwrap();

    let err = manager.extract(&not_an_archive, &app).unwrap_err();
    assert_matches!(err, ArtifactError::CommandFailed { ref command, code: Some(code) }
        if command.program() == "tar" && code != 0);
    assert!(!manager.supervisor().is_running());
}

#[test]
fn destroy_stops_a_hanging_download() {
    let dir = tempfile::tempdir().unwrap();
    let downloader = write_script(dir.path(), "hanging-wget", HANGING_DOWNLOADER);
    let config = config(&dir, &downloader);
    let manager = Arc::new(manager(&config, "task-3"));

    let handle = std::thread::spawn({
        let manager = manager.clone();
        move || manager.fetch(&ArtifactDescriptor::new("http://example/slow.tgz"))
    });

    while !manager.supervisor().is_running() {
        std::thread::sleep(Duration::from_millis(5));
    }
    manager.destroy_process_if_active();

    let result = handle.join().unwrap();
    assert_matches!(result, Err(ArtifactError::CommandFailed { code: None, .. }));
    assert!(!dir.path().join("cache").join("slow.tgz").exists());

    // Nothing is tracked anymore, so this is a no-op.
    manager.destroy_process_if_active();
    assert!(!manager.supervisor().is_running());
}

#[test]
fn missing_downloader_is_a_start_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir, &dir.path().join("does-not-exist"));
    let manager = manager(&config, "task-4");

    let err = manager
        .fetch(&ArtifactDescriptor::new("http://example/a.tgz"))
        .unwrap_err();
    assert_matches!(err, ArtifactError::ProcessStart { .. });
}
