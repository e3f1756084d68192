use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::{LevelFilter, error};
use minipack::{config::Config, orchestrator::BundleOrchestrator};

#[derive(Parser, Debug)]
#[command(
    name = "minipack",
    version,
    about = "Bundle a JavaScript entry module and its imports into one script"
)]
struct Cli {
    /// Entry module
    #[arg(short, long)]
    entry: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// HTML page to inject the live-reload client into
    #[arg(long)]
    html: Option<PathBuf>,

    /// Configuration file (defaults to ./minipack.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the bundle to stdout instead of writing the output directory
    #[arg(long)]
    stdout: bool,

    /// Abort when the module graph grows past this many modules
    #[arg(long)]
    max_modules: Option<usize>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(entry) = cli.entry {
        config.entry = entry;
    }
    if let Some(output) = cli.output {
        config.out = output;
    }
    if cli.html.is_some() {
        config.html = cli.html;
    }
    if cli.max_modules.is_some() {
        config.max_modules = cli.max_modules;
    }

    let mut orchestrator = BundleOrchestrator::new(config);

    if cli.stdout {
        let bundle = orchestrator.bundle()?;
        io::stdout()
            .lock()
            .write_all(bundle.as_bytes())
            .context("Failed to write bundle to stdout")?;
        return Ok(());
    }

    orchestrator.write_bundle()?;
    orchestrator.write_html()?;
    Ok(())
}
