mod chat_commands;
mod demo_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    parley_config::{ParleyConfig, StorageStrategy},
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "parley", about = "Parley, a profile bot with per-conversation state")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (toml, yaml or json). Discovered when omitted.
    #[arg(long, global = true, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the bot on stdin.
    Chat {
        /// Where the dialog keeps its working profile.
        #[arg(long)]
        strategy: Option<StorageStrategy>,
        /// Channel the messages appear to come from.
        #[arg(long, default_value = parley_common::channels::CONSOLE)]
        channel: String,
    },
    /// Run the scripted single-user and two-user conversations.
    Demo {
        /// Only run this strategy. All strategies when omitted.
        #[arg(long)]
        strategy: Option<StorageStrategy>,
    },
    /// Print the effective configuration.
    Config,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ParleyConfig> {
    match &cli.config {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            parley_config::load_config(path)
        },
        None => Ok(parley_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "parley starting");
    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Chat { strategy, channel } => {
            if let Some(strategy) = strategy {
                config.dialog.strategy = strategy;
            }
            chat_commands::run_chat(&config, &channel).await
        },
        Commands::Demo { strategy } => {
            let strategies = match strategy {
                Some(strategy) => vec![strategy],
                None => StorageStrategy::ALL.to_vec(),
            };
            demo_commands::run_demo(&config, &strategies).await
        },
        Commands::Config => {
            print!("{}", parley_config::to_toml(&config)?);
            Ok(())
        },
    }
}
