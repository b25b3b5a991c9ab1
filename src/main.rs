use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tilewatch::config::Config;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file. Overrides the individual parameter flags.
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a game script through the full engine.
    Simulate(cmd::simulate::SimulateArgs),
    /// Replay a script and verify the history invariants.
    Validate(cmd::validate::ValidateArgs),
}

fn resolve_config(file: &Option<PathBuf>, from_args: &Config) -> Config {
    match file {
        Some(path) => Config::load_from_file(path).unwrap_or_else(|err| {
            eprintln!("❌ could not read config {}: {err}", path.display());
            process::exit(2);
        }),
        None => from_args.clone(),
    }
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "tilewatch=debug"
    } else {
        "tilewatch=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match &cli.command {
        Commands::Simulate(args) => {
            let config = resolve_config(&cli.config, &args.config);
            if let Err(err) = cmd::simulate::run(args, config) {
                eprintln!("❌ simulation failed: {err}");
                process::exit(1);
            }
        }
        Commands::Validate(args) => {
            let config = resolve_config(&cli.config, &args.config);
            match cmd::validate::run(args, config) {
                Ok(true) => {}
                Ok(false) => process::exit(1),
                Err(err) => {
                    eprintln!("❌ validation failed: {err}");
                    process::exit(2);
                }
            }
        }
    }
}
