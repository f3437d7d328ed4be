use std::path::PathBuf;

use clap::Parser;
use miette::IntoDiagnostic;

use super::{DEFAULT_TASK_ID, GlobalOptions, IntegrityArgs, interruptible_manager, print_path};

/// Fetch an artifact through the shared cache and print its cached path.
///
/// The cached copy is reused when it satisfies the expected size and
/// checksum, otherwise the artifact is downloaded, verified and installed.
#[derive(Debug, Parser)]
pub struct Args {
    /// URL of the artifact
    pub url: String,

    #[clap(flatten)]
    pub integrity: IntegrityArgs,

    /// Task on whose behalf the artifact is fetched, selects the log directory
    #[clap(long, default_value = DEFAULT_TASK_ID)]
    pub task_id: String,

    /// Unpack the fetched archive into this directory
    #[clap(long)]
    pub extract_to: Option<PathBuf>,
}

pub fn execute(args: Args, global_options: &GlobalOptions) -> miette::Result<()> {
    let config = global_options.config()?;
    let manager = interruptible_manager(&config, &args.task_id)?;

    let descriptor = args.integrity.descriptor(args.url);
    let path = manager.fetch(&descriptor)?;

    if let Some(destination) = &args.extract_to {
        fs_err::create_dir_all(destination).into_diagnostic()?;
        manager.extract(&path, destination)?;
    }

    print_path(&path);
    Ok(())
}
