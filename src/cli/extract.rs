use std::path::PathBuf;

use clap::Parser;

use super::{DEFAULT_TASK_ID, GlobalOptions, interruptible_manager};

/// Unpack an archive into an existing directory with the configured archiver.
#[derive(Debug, Parser)]
pub struct Args {
    /// The archive to unpack
    pub archive: PathBuf,

    /// The directory to unpack into
    pub destination: PathBuf,

    /// Task on whose behalf the archive is unpacked, selects the log directory
    #[clap(long, default_value = DEFAULT_TASK_ID)]
    pub task_id: String,
}

pub fn execute(args: Args, global_options: &GlobalOptions) -> miette::Result<()> {
    let config = global_options.config()?;
    let manager = interruptible_manager(&config, &args.task_id)?;
    manager.extract(&args.archive, &args.destination)?;
    Ok(())
}
