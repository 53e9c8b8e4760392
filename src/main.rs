use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use btleplug::api::Manager as _;
use btleplug::platform::Manager;
use clap::{Parser, Subcommand};
use log::info;
use tokio::sync::mpsc;

mod config;
mod dispatcher;
mod freshness;
mod lookup;
mod manager;
mod messages;
mod registry;
mod selector;
mod tracker;

#[derive(Parser, Debug)]
#[command(version, about = "Locate the nearest BLE beacon and look up its zone")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Track the strongest beacon and look up its zone on every change
    Run,
    /// List matching beacons seen during a short scan
    Discover {
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,
    },
    /// Look up the zone of a single beacon address
    Lookup { address: String },
}

fn load_config(path: &Path) -> anyhow::Result<config::AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::de::from_str(&contents).with_context(|| format!("Invalid config file {}", path.display()))
}

async fn first_adapter() -> anyhow::Result<btleplug::platform::Adapter> {
    let bt_manager = Manager::new().await?;
    bt_manager
        .adapters()
        .await?
        .into_iter()
        .next()
        .context("No bluetooth adapter found")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        pretty_env_logger::formatted_builder()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        pretty_env_logger::init();
    }

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let client = lookup::LookupClient::new(&config.lookup)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let core = manager::Manager::new(first_adapter().await?, config.scan());
            let (tx, rx) = mpsc::unbounded_channel();

            let lookups = tokio::spawn(dispatcher::LookupDispatcher::new(client, rx).run());
            let result = core.run_loop(tx).await;

            let fired = lookups.await?;
            info!("Fired {} beacon lookups", fired);
            result?;
        }
        Command::Discover { seconds } => {
            let core = manager::Manager::new(first_adapter().await?, config.scan());
            let beacons = core.discover(Duration::from_secs(seconds)).await?;
            println!("Found {} beacons", beacons.len());
            for beacon in beacons {
                println!(
                    "{}\t{} dBm\tfirst seen at {} ms",
                    beacon.address, beacon.rssi, beacon.first_seen_millis
                );
            }
        }
        Command::Lookup { address } => match client.lookup(&address).await {
            Some(location) => println!(
                "{}\t{}\t{}",
                location.zone_name, location.location_x, location.location_y
            ),
            None => println!("No location for {}", address),
        },
    }

    Ok(())
}
