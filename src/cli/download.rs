use std::path::PathBuf;

use clap::Parser;

use super::{DEFAULT_TASK_ID, GlobalOptions, IntegrityArgs, interruptible_manager, print_path};

/// Download an artifact straight to a path and verify it, bypassing the cache.
#[derive(Debug, Parser)]
pub struct Args {
    /// URL of the artifact
    pub url: String,

    /// Where to write the artifact
    #[clap(long, short)]
    pub output: PathBuf,

    #[clap(flatten)]
    pub integrity: IntegrityArgs,

    /// Task on whose behalf the artifact is downloaded, selects the log directory
    #[clap(long, default_value = DEFAULT_TASK_ID)]
    pub task_id: String,
}

pub fn execute(args: Args, global_options: &GlobalOptions) -> miette::Result<()> {
    let config = global_options.config()?;
    let manager = interruptible_manager(&config, &args.task_id)?;

    let descriptor = args.integrity.descriptor(args.url);
    manager.download_and_check(&descriptor, &args.output)?;

    print_path(&args.output);
    Ok(())
}
