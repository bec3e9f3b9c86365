use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info};

use qnet::experiments::{bell_correlation, hadamard_statistics};
use qnet::network::run_teleportation;
use qnet::{QnetResult, SimulationConfig};

#[derive(Parser, Debug)]
#[command(name = "qnet", version, about = "Entanglement-aware quantum network simulation")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seed for measurement randomness
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Teleport a prepared qubit from alice to bob
    Teleport,
    /// Measure both halves of transmitted Bell pairs
    Bell {
        #[arg(short, long)]
        trials: Option<usize>,
    },
    /// Measure H|0> repeatedly and report the outcome balance
    Stats {
        #[arg(short, long)]
        trials: Option<usize>,
    },
}

fn load_config(cli: &Cli) -> QnetResult<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> QnetResult<()> {
    let config = load_config(&cli)?;
    info!("Starting qnet: {:?}", config);

    match cli.command {
        Command::Teleport => {
            let report = run_teleportation(&config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Bell { trials } => {
            let stats = bell_correlation(trials.unwrap_or(config.trials), config.seed)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Stats { trials } => {
            let counts = hadamard_statistics(trials.unwrap_or(config.trials), config.seed)?;
            info!("deviation from balance: {:.2} sigma", counts.deviation_sigmas());
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
    }
    Ok(())
}

fn main() {
    // Init logging
    let env = Env::default().filter_or("RUST_LOG", "info");
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .try_init();

    if let Err(e) = run(Cli::parse()) {
        error!("qnet failed: {}", e);
        process::exit(1);
    }
}
