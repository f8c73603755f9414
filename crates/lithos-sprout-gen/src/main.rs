// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lithos_sprout_gen::{run, Command, GenerateOptions, ScaffoldOptions};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sprout-gen")]
#[command(about = "Generates must/safe wrappers and registry skeletons for sprout registries")]
#[command(version)]
struct Cli {
    #[arg(help = "Command to run: generate (default) or scaffold")]
    command: Option<String>,

    #[arg(long, help = "Go source file to scan for registry methods")]
    source: Option<PathBuf>,

    #[arg(long, help = "Registry descriptor (YAML) for scaffold")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = Command::from_arg(cli.command.as_deref());
    let generate_options = cli
        .source
        .map(GenerateOptions::from_source)
        .unwrap_or_default();
    let scaffold_options = cli
        .config
        .map(|config| ScaffoldOptions { config })
        .unwrap_or_default();

    match run(command, &generate_options, &scaffold_options) {
        Ok(path) => {
            info!(%command, path = %path.display(), "done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%command, error = %err, "{command} failed");
            ExitCode::FAILURE
        }
    }
}
