//! The seam between orchestration and the operating system.
//!
//! [`CommandRunner`] starts a command with its output redirected to a file and
//! hands back a [`RunningCommand`]. Waiting and killing both take `&self` so
//! one thread can block on the command while another one stops it.
use std::{
    path::Path,
    process::{Child, Stdio},
    time::Duration,
};

use parking_lot::Mutex;

use crate::command::CommandLine;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

pub trait CommandRunner: Send + Sync {
    /// Starts `command`, appending its stdout and stderr to `output`.
    fn spawn(&self, command: &CommandLine, output: &Path) -> std::io::Result<Box<dyn RunningCommand>>;
}

pub trait RunningCommand: Send + Sync {
    /// Blocks until the command exits and returns its exit code, `None` if it
    /// was terminated by a signal.
    fn wait(&self) -> std::io::Result<Option<i32>>;

    /// Forcibly terminates the command. Killing a command that already exited
    /// is not an error.
    fn kill(&self) -> std::io::Result<()>;
}

/// Runs commands as child processes of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn spawn(&self, command: &CommandLine, output: &Path) -> std::io::Result<Box<dyn RunningCommand>> {
        let stdout = fs_err::OpenOptions::new()
            .create(true)
            .append(true)
            .open(output)?
            .into_parts()
            .0;
        let stderr = stdout.try_clone()?;

        let child = std::process::Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()?;

        Ok(Box::new(SystemProcess {
            child: Mutex::new(child),
        }))
    }
}

/// A child process shared between the thread waiting on it and whoever wants
/// to kill it.
#[derive(Debug)]
struct SystemProcess {
    child: Mutex<Child>,
}

impl RunningCommand for SystemProcess {
    fn wait(&self) -> std::io::Result<Option<i32>> {
        loop {
            // The lock is only held for the non-blocking poll so `kill` is never
            // stuck behind a waiting thread.
            if let Some(status) = self.child.lock().try_wait()? {
                return Ok(status.code());
            }
            std::thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    fn kill(&self) -> std::io::Result<()> {
        let mut child = self.child.lock();
        if child.try_wait()?.is_some() {
            return Ok(());
        }
        match child.kill() {
            Err(err) if err.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            result => result,
        }
    }
}
