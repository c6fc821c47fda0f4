use std::path::PathBuf;

use clap::Parser;
use ring_dh::{GroupSource, Simulation, SimulationConfig};

#[derive(Parser, Debug)]
#[command(
    about = "Simulated ring Diffie-Hellman group key agreement",
    author,
    version
)]
struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of participants
    #[arg(long = "participants")]
    participants: Option<usize>,

    /// Built-in MODP group (1, 2, 5 or 14)
    #[arg(long = "group", conflicts_with = "groups_file")]
    group: Option<u16>,

    /// Parameter table in primes.json layout
    #[arg(long = "groups-file", value_name = "FILE")]
    groups_file: Option<PathBuf>,

    /// Entry of the parameter table to use (default 0)
    #[arg(long = "group-index")]
    group_index: Option<usize>,

    /// Bit length of private exponents
    #[arg(long = "exponent-bits")]
    exponent_bits: Option<u64>,

    /// Seed for a reproducible run
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Watchdog bound on scheduler passes per phase
    #[arg(long = "max-passes")]
    max_passes: Option<u64>,

    /// Index of the participant that starts the key exchange
    #[arg(long = "initiator")]
    initiator: Option<usize>,
}

impl Cli {
    fn into_config(self) -> Result<SimulationConfig, ring_dh::DhError> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_json_file(path)?,
            None => SimulationConfig::default(),
        };

        if let Some(participants) = self.participants {
            config.participants = participants;
        }
        if let Some(id) = self.group {
            config.group = GroupSource::Modp { id };
        }
        if let Some(path) = self.groups_file {
            config.group = GroupSource::File {
                path,
                index: self.group_index.unwrap_or(0),
            };
        }
        if let Some(bits) = self.exponent_bits {
            config.exponent_bits = bits;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(max_passes) = self.max_passes {
            config.max_passes = max_passes;
        }
        if let Some(initiator) = self.initiator {
            config.initiator = initiator;
        }
        Ok(config)
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Simulation failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), ring_dh::DhError> {
    let config = cli.into_config()?;
    let mut sim = Simulation::new(config)?;
    let report = sim.run()?;

    println!(
        "{} participants, {} passes, {} frames",
        sim.participants().len(),
        report.passes,
        report.frames
    );
    for line in sim.summary() {
        println!("  {line}");
    }
    match sim.agreed_key() {
        Some(_) => println!("all participants hold the same session key"),
        None => println!("participants do not share a single session key"),
    }
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .try_init();
    });
}
