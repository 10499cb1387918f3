use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use worknest::client::{ProfileService, WorknestClient};
use worknest::config;

#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Staff ID to inspect; lists every profile when omitted
    #[arg(long)]
    staff_id: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let client = WorknestClient::from_config(&cfg)?;

    let profiles = match args.staff_id {
        Some(id) => vec![client.profile(id).await?],
        None => client.profiles().await?,
    };
    for p in profiles {
        println!("Staff ID: {}", p.staff_id);
        println!("  name: {}", p.full_name());
        println!("  position: {}", p.position);
        println!("  department: {}", p.department);
        println!("  country: {}", p.country);
        if let Some(loc) = p.location {
            println!("  location: {}", loc);
        }
        if let Some(manager) = p.reporting_manager_id {
            println!("  reporting manager: {}", manager);
        }
    }
    Ok(())
}
