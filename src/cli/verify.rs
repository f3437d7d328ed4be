use std::path::PathBuf;

use clap::Parser;
use stager_artifacts::verify;

use super::IntegrityArgs;

/// Check a local file against an expected size and checksum.
///
/// Exits with an error describing the first mismatch.
#[derive(Debug, Parser)]
pub struct Args {
    /// The file to check
    pub path: PathBuf,

    #[clap(flatten)]
    pub integrity: IntegrityArgs,
}

pub fn execute(args: Args) -> miette::Result<()> {
    let descriptor = args.integrity.descriptor(args.path.display().to_string());
    verify::verify(&descriptor, &args.path)?;

    eprintln!(
        "{}{} matches",
        console::style(console::Emoji("✔ ", "")).green(),
        args.path.display()
    );
    Ok(())
}
