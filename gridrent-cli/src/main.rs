use std::str::FromStr;

use clap::{Parser, Subcommand};

use gridrent_core::broker::LeaseBroker;
use gridrent_core::types::{AcquireOptions, BrokerConfig, DEFAULT_ENDPOINT, ResourceKind, Tier};

#[derive(Parser)]
#[command(
    name = "gridrent",
    about = "Gridrent — lease compute cores over 402/403 handshakes",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire compute cores
    Acquire {
        /// 403 identity key
        #[arg(long, env = "GRIDRENT_IDENTITY_KEY")]
        identity: Option<String>,

        /// Ledger wallet address
        #[arg(long, env = "GRIDRENT_WALLET")]
        wallet: Option<String>,

        /// Core type: cpu or gpu
        #[arg(long = "type", default_value = "gpu")]
        resource: String,

        /// Number of cores
        #[arg(long, default_value = "4")]
        cores: u32,

        /// Pricing tier: standard, performance or extreme
        #[arg(long, default_value = "performance")]
        tier: String,
    },

    /// Check protocol status
    Status,

    /// View pricing tiers
    Pricing {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Check available cores
    Cores {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Acquire {
            identity,
            wallet,
            resource,
            cores,
            tier,
        } => {
            let (Some(identity), Some(wallet)) = (identity, wallet) else {
                return Err("GRIDRENT_IDENTITY_KEY and GRIDRENT_WALLET required".into());
            };
            let resource = ResourceKind::from_str(&resource)?;
            let tier = Tier::from_str(&tier)?;

            tracing::debug!(%resource, cores, %tier, "Acquiring lease");

            let broker = LeaseBroker::new(BrokerConfig::new(identity, wallet));
            let session = broker
                .acquire(AcquireOptions::new(resource, cores, tier))
                .await?;

            println!("Session acquired: {}", session.id());
            println!("Cores: {cores} {resource}");
            println!("Tier: {tier}");

            if let Some(tx) = broker.release(session.id()).await? {
                println!("Released, settlement tx: {tx}");
            }
        }

        Commands::Status => {
            println!("Gridrent status");
            println!("Protocol: 402 + 403");
            println!("Endpoint: {DEFAULT_ENDPOINT}");
            println!("Status: online");
        }

        Commands::Pricing { json } => {
            let broker = mock_broker();
            let pricing = broker.get_pricing();

            if json {
                println!("{}", serde_json::to_string_pretty(&pricing)?);
            } else {
                println!("\nGridrent pricing (per second):\n");
                for entry in pricing {
                    println!("{}:", entry.tier.to_string().to_uppercase());
                    println!("  CPU: ${}/s", entry.cpu_rate);
                    println!("  GPU: ${}/s", entry.gpu_rate);
                    println!("  Memory: ${}/GB/s\n", entry.memory_rate);
                }
            }
        }

        Commands::Cores { json } => {
            let broker = mock_broker();
            let cores = broker.get_available_cores();

            if json {
                println!("{}", serde_json::to_string_pretty(&cores)?);
            } else {
                println!("\nAvailable cores:\n");
                for entry in &cores {
                    let used = f64::from(entry.total - entry.available) / f64::from(entry.total)
                        * 100.0;
                    println!(
                        "{}: {}/{} ({used:.1}% used)",
                        entry.resource.to_string().to_uppercase(),
                        entry.available,
                        entry.total
                    );
                }
                println!();
            }
        }
    }

    Ok(())
}

// Marketplace read-only queries need no real credentials.
fn mock_broker() -> LeaseBroker {
    LeaseBroker::new(BrokerConfig::new("mock", "mock"))
}
