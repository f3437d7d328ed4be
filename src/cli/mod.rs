//! # Stager CLI
//!
//! - The [`Command`] enum defines the available commands.
//! - [`execute_command`] dispatches a parsed [`Command`] to its module.
#![deny(clippy::dbg_macro, clippy::unwrap_used)]

use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::Parser;
use clap::builder::styling::{AnsiColor, Color, Style};
use miette::IntoDiagnostic;
use stager_artifacts::{ArtifactDescriptor, ArtifactManager};
use stager_config::Config;
use tracing::level_filters::LevelFilter;

pub mod download;
pub mod extract;
pub mod fetch;
pub mod verify;

const CLAP_GLOBAL_OPTIONS: &str = "Global Options";

/// Task id used for the log directory when none is given.
pub const DEFAULT_TASK_ID: &str = "cli";

/// Stager - fetch, verify, cache and unpack task artifacts.
#[derive(Parser, Debug)]
#[command(name = "stager", version)]
#[clap(arg_required_else_help = true, styles = get_styles())]
pub struct Args {
    #[command(subcommand)]
    command: Command,

    #[clap(flatten)]
    global_options: GlobalOptions,
}

#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Increase logging verbosity (-v for warnings, -vv for info, -vvv for debug, -vvvv for trace)
    #[clap(short, long, action = clap::ArgAction::Count, global = true, help_heading = CLAP_GLOBAL_OPTIONS)]
    verbose: u8,

    /// Decrease logging verbosity (quiet mode)
    #[clap(short, long, action = clap::ArgAction::Count, global = true, help_heading = CLAP_GLOBAL_OPTIONS)]
    quiet: u8,

    /// Use this configuration file instead of the default one
    #[clap(long, global = true, env = "STAGER_CONFIG", help_heading = CLAP_GLOBAL_OPTIONS)]
    config: Option<PathBuf>,
}

impl GlobalOptions {
    /// Loads the configuration this invocation runs with.
    pub fn config(&self) -> miette::Result<Config> {
        Config::load(self.config.as_deref()).into_diagnostic()
    }
}

impl Args {
    /// Determine the log level filter based on verbose and quiet counts.
    fn log_level_filter(&self) -> LevelFilter {
        match (self.global_options.quiet, self.global_options.verbose) {
            // Quiet mode overrides verbose
            (q, _) if q > 0 => LevelFilter::OFF,
            (_, 0) => LevelFilter::ERROR, // Default
            (_, 1) => LevelFilter::WARN,  // -v
            (_, 2) => LevelFilter::INFO,  // -vv
            (_, 3) => LevelFilter::DEBUG, // -vvv
            (_, _) => LevelFilter::TRACE, // -vvvv+
        }
    }
}

#[derive(Parser, Debug)]
pub enum Command {
    /// Fetch an artifact through the shared cache
    #[clap(visible_alias = "f")]
    Fetch(fetch::Args),
    /// Download an artifact to a path without using the cache
    Download(download::Args),
    /// Unpack an archive into a directory
    #[clap(visible_alias = "x")]
    Extract(extract::Args),
    /// Check a local file against an expected size and checksum
    Verify(verify::Args),
}

/// The expected properties of an artifact.
#[derive(Debug, Default, Parser)]
pub struct IntegrityArgs {
    /// Expected size in bytes, values below 1 are not checked
    #[clap(long, default_value_t = 0, allow_negative_numbers = true)]
    pub size: i64,

    /// Expected hex digest, 64 characters for SHA-256 otherwise MD5
    #[clap(long)]
    pub checksum: Option<String>,
}

impl IntegrityArgs {
    pub fn descriptor(&self, url: impl Into<String>) -> ArtifactDescriptor {
        let descriptor = ArtifactDescriptor::new(url).with_size(self.size);
        match &self.checksum {
            Some(checksum) => descriptor.with_checksum(checksum),
            None => descriptor,
        }
    }
}

pub fn execute() -> miette::Result<()> {
    let args = Args::parse();

    let use_colors = console::colors_enabled_stderr();
    let in_ci = matches!(env::var("CI").as_deref(), Ok("1" | "true"));
    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::default()
                .color(use_colors)
                // Don't wrap lines in CI to avoid breaking logs.
                .wrap_lines(!in_ci)
                .build(),
        )
    }))?;

    setup_logging(&args, use_colors)?;

    execute_command(args.command, &args.global_options)
}

fn setup_logging(args: &Args, use_colors: bool) -> miette::Result<()> {
    use tracing_subscriber::{
        EnvFilter, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
    };

    let (level_filter, stager_level) = match args.log_level_filter() {
        LevelFilter::OFF => (LevelFilter::OFF, LevelFilter::OFF),
        LevelFilter::ERROR => (LevelFilter::ERROR, LevelFilter::WARN),
        LevelFilter::WARN => (LevelFilter::WARN, LevelFilter::INFO),
        LevelFilter::INFO => (LevelFilter::INFO, LevelFilter::DEBUG),
        LevelFilter::DEBUG => (LevelFilter::DEBUG, LevelFilter::TRACE),
        LevelFilter::TRACE => (LevelFilter::TRACE, LevelFilter::TRACE),
    };

    let directives = format!(
        "stager={stager_level},stager_artifacts={stager_level},stager_config={stager_level}"
    );

    // Explicit -v/-q flags win over RUST_LOG.
    let cli_verbosity_set = args.global_options.verbose > 0 || args.global_options.quiet > 0;
    let directives = match env::var("RUST_LOG") {
        Ok(env_directives) if !cli_verbosity_set && !env_directives.is_empty() => {
            format!("{directives},{env_directives}")
        }
        _ => directives,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .parse(&directives)
        .into_diagnostic()?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(use_colors)
        .with_target(stager_level >= LevelFilter::DEBUG)
        .with_writer(std::io::stderr)
        .without_time();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
    Ok(())
}

/// Maps command enum variants to their actual function handlers.
pub fn execute_command(command: Command, global_options: &GlobalOptions) -> miette::Result<()> {
    match command {
        Command::Fetch(cmd) => fetch::execute(cmd, global_options),
        Command::Download(cmd) => download::execute(cmd, global_options),
        Command::Extract(cmd) => extract::execute(cmd, global_options),
        Command::Verify(cmd) => verify::execute(cmd),
    }
}

/// Builds the manager for `task_id` and makes Ctrl-C stop whatever command
/// it is running.
fn interruptible_manager(config: &Config, task_id: &str) -> miette::Result<Arc<ArtifactManager>> {
    let manager = Arc::new(ArtifactManager::system(config, task_id)?);
    if let Some(parent) = manager.executor_log().parent() {
        fs_err::create_dir_all(parent).into_diagnostic()?;
    }

    let handler_manager = manager.clone();
    ctrlc::set_handler(move || {
        handler_manager.interrupt_token().cancel();
        handler_manager.destroy_process_if_active();
    })
    .into_diagnostic()?;

    Ok(manager)
}

fn print_path(path: &Path) {
    println!("{}", path.display());
}

/// Help output colors: headings in yellow, flags and values in blue.
pub fn get_styles() -> clap::builder::Styles {
    let heading = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Yellow)));
    let failure = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Red)));

    clap::builder::Styles::styled()
        .header(heading)
        .usage(heading)
        .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue))))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlue))))
        .error(failure)
        .invalid(failure)
}
