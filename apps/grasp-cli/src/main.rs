mod scenario;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use grasp_manip::StrategyRegistry;
use grasp_tools::SceneInspector;
use tracing_subscriber::EnvFilter;

use crate::scenario::{Scenario, Session};

#[derive(Parser)]
#[command(name = "grasp-cli", about = "Wand manipulation scenarios from the command line")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the registered strategies
    Info,
    /// Build the controller described by a scenario and report errors
    Validate {
        /// Scenario YAML file
        path: PathBuf,
    },
    /// Replay a scenario's frames and print what moved
    Run {
        /// Scenario YAML file
        path: PathBuf,
        /// Print each moved batch as a JSON line
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let registry = StrategyRegistry::with_builtins();

    match cli.command {
        Commands::Info => {
            println!("grasp-cli v{}", env!("CARGO_PKG_VERSION"));
            for s in registry.strategies() {
                println!(
                    "{:<13} {:<18} api={} element={}",
                    s.kind.to_string(),
                    s.name,
                    s.version,
                    s.element_type
                );
            }
        }
        Commands::Validate { path } => {
            let scenario = Scenario::load(&path)?;
            let session = Session::new(&scenario, &registry)?;
            println!("{}: ok", path.display());
            println!("{}", SceneInspector::controller(&session.controller));
            println!("{}", SceneInspector::summary(&session.scene));
        }
        Commands::Run { path, json } => {
            let scenario = Scenario::load(&path)?;
            let mut session = Session::new(&scenario, &registry)?;
            tracing::info!(frames = scenario.frames.len(), "replaying scenario");

            for frame in &scenario.frames {
                for _ in 0..frame.repeat {
                    let Some(batch) = session.step(frame)? else {
                        continue;
                    };
                    if json {
                        println!("{}", serde_json::to_string(&batch)?);
                        continue;
                    }
                    println!("frame {}: {} moved", batch.frame, batch.moves.len());
                    for (id, _) in &batch.moves {
                        if let Some(info) = SceneInspector::inspect_object(&session.scene, *id) {
                            println!("  {info}");
                        }
                    }
                }
            }

            if !json {
                println!("{}", SceneInspector::controller(&session.controller));
                println!("{}", SceneInspector::summary(&session.scene));
                for info in SceneInspector::list_objects(&session.scene) {
                    println!("{info}");
                }
            }
        }
    }

    Ok(())
}
