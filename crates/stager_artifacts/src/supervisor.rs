use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    command::CommandLine,
    error::ArtifactError,
    runner::{CommandRunner, RunningCommand},
};

/// How long a registration waits for the lock before it checks for an
/// interrupt again.
const REGISTRATION_POLL: Duration = Duration::from_millis(10);

/// The command currently tracked by a [`ProcessSupervisor`].
struct CurrentOperation {
    label: String,
    process: Arc<dyn RunningCommand>,
}

/// Runs one external command at a time and lets another thread stop it.
///
/// The supervisor is either idle or tracks exactly one running command.
/// [`ProcessSupervisor::run`] blocks the calling thread until the command
/// exits; [`ProcessSupervisor::destroy`] may be called from any thread at any
/// time and kills the tracked command.
///
/// Each supervisor owns an interrupt token. Once it is cancelled no new
/// command is started or registered.
pub struct ProcessSupervisor {
    runner: Arc<dyn CommandRunner>,
    output: PathBuf,
    current: Mutex<Option<CurrentOperation>>,
    interrupt: CancellationToken,
}

impl ProcessSupervisor {
    /// Creates an idle supervisor whose commands write to `output`.
    pub fn new(runner: Arc<dyn CommandRunner>, output: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            output: output.into(),
            current: Mutex::new(None),
            interrupt: CancellationToken::new(),
        }
    }

    /// Use an interrupt token shared with the caller.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: CancellationToken) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// The token that interrupts command registration when cancelled.
    pub fn interrupt_token(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    /// The file that receives the output of supervised commands.
    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn is_running(&self) -> bool {
        self.current.lock().is_some()
    }

    /// The label of the tracked command, if any.
    pub fn current_command(&self) -> Option<String> {
        self.current.lock().as_ref().map(|op| op.label.clone())
    }

    /// Runs `command` to completion.
    ///
    /// The tracked operation is cleared on every exit path, including a
    /// non-zero exit code.
    pub fn run(&self, command: &CommandLine) -> Result<(), ArtifactError> {
        if self.interrupt.is_cancelled() {
            return Err(ArtifactError::Interrupted {
                command: command.clone(),
            });
        }

        debug!("Running {command}");
        let process: Arc<dyn RunningCommand> = self
            .runner
            .spawn(command, &self.output)
            .map_err(|source| ArtifactError::ProcessStart {
                command: command.clone(),
                source,
            })?
            .into();

        if let Err(err) = self.register(command, process.clone()) {
            // Nobody else knows about this process, stop it before bailing out.
            if let Err(kill_err) = process.kill() {
                warn!("Failed to kill unregistered command {command}: {kill_err}");
            }
            if let Err(wait_err) = process.wait() {
                warn!("Failed to reap unregistered command {command}: {wait_err}");
            }
            return Err(err);
        }

        let exit = process.wait();
        self.clear(&process);

        match exit? {
            Some(0) => Ok(()),
            code => Err(ArtifactError::CommandFailed {
                command: command.clone(),
                code,
            }),
        }
    }

    /// Kills the tracked command, if any, and returns to idle.
    pub fn destroy(&self) {
        let mut current = self.current.lock();
        if let Some(op) = current.take() {
            info!("Destroying a process {}", op.label);
            if let Err(err) = op.process.kill() {
                warn!("Failed to destroy {}: {err}", op.label);
            }
        }
    }

    /// Tracks `process` as the current operation.
    ///
    /// Unlike the other lock acquisitions this one gives up as soon as the
    /// interrupt token is cancelled.
    fn register(
        &self,
        command: &CommandLine,
        process: Arc<dyn RunningCommand>,
    ) -> Result<(), ArtifactError> {
        loop {
            if self.interrupt.is_cancelled() {
                return Err(ArtifactError::Interrupted {
                    command: command.clone(),
                });
            }
            if let Some(mut current) = self.current.try_lock_for(REGISTRATION_POLL) {
                // A cancel that arrived while waiting was followed by a
                // `destroy` that found nothing to kill.
                if self.interrupt.is_cancelled() {
                    return Err(ArtifactError::Interrupted {
                        command: command.clone(),
                    });
                }
                *current = Some(CurrentOperation {
                    label: command.program().to_string(),
                    process,
                });
                return Ok(());
            }
        }
    }

    /// Returns to idle unless `destroy` already did.
    fn clear(&self, process: &Arc<dyn RunningCommand>) {
        let mut current = self.current.lock();
        if current
            .as_ref()
            .is_some_and(|op| Arc::ptr_eq(&op.process, process))
        {
            *current = None;
        }
    }
}
