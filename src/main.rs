use clap::{Parser, Subcommand};
use shardgate::{
    DistributionValue, MemoryDriver, PoolingShardConnection, ShardManager, ShardingConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "shardgate")]
#[command(about = "Shardgate - inspect shard configuration and routing", long_about = None)]
struct Args {
    /// Directory containing shardgate.toml
    #[arg(short, long, default_value = ".")]
    config: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "shardgate=info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the configured shards
    Shards,
    /// Resolve distribution values to shard ids
    Route {
        /// Distribution values (integers or strings)
        #[arg(required = true)]
        values: Vec<String>,
    },
}

fn parse_value(raw: &str) -> DistributionValue {
    match raw.parse::<i64>() {
        Ok(v) => DistributionValue::Int(v),
        Err(_) => DistributionValue::Text(raw.to_string()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ShardingConfig::load(&args.config)?;
    tracing::info!("Loaded {} shards", config.shards.len());

    // Routing only: sessions come from the in-memory driver, nothing is executed
    let conn = PoolingShardConnection::new(
        Arc::new(MemoryDriver::new()),
        config.global_shard(),
        config.params(),
    );
    let manager = ShardManager::new(conn);

    match args.command {
        Command::Shards => {
            for shard in manager.shards().await {
                println!("{}", serde_json::to_string(&shard)?);
            }
        }
        Command::Route { values } => {
            for raw in values {
                let value = parse_value(&raw);
                match manager.select_shard(value.clone()).await {
                    Ok(()) => {
                        let shard_id = manager.connection().await.active_shard_id();
                        match shard_id {
                            Some(id) => println!("{} -> {}", value, id),
                            None => println!("{} -> (none)", value),
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Routing {} failed: {}", value, e);
                        println!("{} -> error: {}", value, e);
                    }
                }
            }
        }
    }

    Ok(())
}
