//! ChainLive CLI: follow a Cardano node through Ogmios and stream every new
//! block to connected viewers.
//!
//! # Commands
//! ```text
//! chainlive run    [--config chainlive.yaml] [--ogmios-host ..] [--network ..] [--port ..]
//! chainlive info   [same flags as run]
//! chainlive ada    <lovelace>
//! chainlive epoch  <slot> [--network ..] [--epoch-length ..]
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use chainlive_core::units::{to_display_unit, EpochSchedule, Network};

mod cmd_run;
mod logging;
mod settings;

use settings::{ConfigArgs, Settings};

#[derive(Parser)]
#[command(
    name = "chainlive",
    about = "ChainLive CLI: live Cardano block explorer backend",
    long_about = "
ChainLive CLI: follow a Cardano node through Ogmios (chain-sync from the tip),
keep the most recent blocks and transactions in memory, and push every new
block to viewers over WebSocket.

ENVIRONMENT VARIABLES:
  CHAINLIVE_CONFIG         YAML configuration file
  CHAINLIVE_OGMIOS_HOST    Ogmios host (default: localhost)
  CHAINLIVE_OGMIOS_PORT    Ogmios port (default: 1337)
  CHAINLIVE_NETWORK        mainnet | preprod | preview (default: preprod)
  CHAINLIVE_EPOCH_LENGTH   Epoch length in slots (overrides the network)
  CHAINLIVE_BIND           Viewer server bind address (default: 0.0.0.0)
  CHAINLIVE_PORT           Viewer server port (default: 5000)
  RUST_LOG                 Log filter (overrides --log-level)
",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the chain and serve viewers until Ctrl-C
    Run(ConfigArgs),

    /// Print the effective configuration
    Info(ConfigArgs),

    /// Convert a lovelace amount to ADA
    Ada {
        /// Amount in lovelace (decimal integer)
        lovelace: String,
    },

    /// Compute the epoch of a slot
    Epoch {
        /// Absolute slot number
        slot: u64,
        /// Network preset for the epoch length
        #[arg(long, default_value = "preprod")]
        network: Network,
        /// Explicit epoch length in slots (overrides --network)
        #[arg(long)]
        epoch_length: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let settings = Settings::load(&args)?;
            logging::init_tracing(&settings.log);
            cmd_run::run(settings).await
        }

        Commands::Info(args) => cmd_info(&args),

        Commands::Ada { lovelace } => {
            println!("{} ADA", to_display_unit(Some(&lovelace)));
            Ok(())
        }

        Commands::Epoch {
            slot,
            network,
            epoch_length,
        } => cmd_epoch(slot, network, epoch_length),
    }
}

// ─── Command implementations ─────────────────────────────────────────────────

fn cmd_info(args: &ConfigArgs) -> Result<()> {
    let settings = Settings::load(args)?;
    println!("ChainLive v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Upstream:        {}", settings.pipeline.upstream.url());
    println!(
        "Network:         {} (epoch length {} slots)",
        settings.pipeline.network,
        settings.pipeline.epoch_length()
    );
    println!("Recent buffers:  {} blocks / transactions", settings.pipeline.recent_capacity);
    println!(
        "Viewer server:   http://{}  (ws: /ws, CORS {})",
        settings.server.socket_addr()?,
        if settings.server.cors { "on" } else { "off" }
    );
    println!();
    println!("Effective configuration:");
    print!(
        "{}",
        serde_yaml::to_string(&settings).context("failed to render configuration")?
    );
    Ok(())
}

fn cmd_epoch(slot: u64, network: Network, epoch_length: Option<u64>) -> Result<()> {
    let length = epoch_length.unwrap_or_else(|| network.epoch_length());
    if length == 0 {
        anyhow::bail!("epoch length must be positive");
    }
    let schedule = EpochSchedule::new(length);
    println!("Slot {slot} is in epoch {} ({length} slots per epoch)", schedule.epoch_of(slot));
    Ok(())
}
