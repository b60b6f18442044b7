use acrl_api::{config::AppConfig, logging::init_tracing, run_test, run_training};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "acrl")]
#[command(about = "Train and evaluate actor-critic agents", long_about = None)]
struct Cli {
    /// Log filter in RUST_LOG syntax
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train an agent
    Train {
        /// TOML configuration; defaults are used when the file does not exist
        #[arg(short, long, default_value = "acrl.toml")]
        config: PathBuf,
    },
    /// Run evaluation episodes with saved actor weights
    Test {
        #[arg(short, long, default_value = "acrl.toml")]
        config: PathBuf,

        /// Actor checkpoint, e.g. save_model/999th_model_a.safetensors
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Act randomly instead of using the actor
        #[arg(long)]
        random: bool,
    },
    /// Print the default configuration
    PrintConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Train { config } => {
            let config = AppConfig::load_or_default(&config)?;
            let report = run_training(&config)?;
            info!(checkpoints = report.checkpoints.len(), "done");
        }
        Commands::Test {
            config,
            model,
            random,
        } => {
            let config = AppConfig::load_or_default(&config)?;
            let scores = run_test(&config, model.as_deref(), random)?;
            for (episode, score) in scores.iter().enumerate() {
                println!("episode {episode:<3} score {score:.2}");
            }
        }
        Commands::PrintConfig => {
            print!("{}", AppConfig::default_toml()?);
        }
    }
    Ok(())
}
