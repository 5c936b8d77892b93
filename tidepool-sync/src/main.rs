use anyhow::Result;
use clap::Parser;
use tidepool_sync::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // .env may hold TIDEPOOL_* and NIGHTSCOUT_API_SECRET
    dotenv::dotenv().ok();

    tracing_subscriber::fmt::init();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "tidepool-sync starting"
    );

    let cli = Cli::parse();
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("tidepool-sync finished"),
        Err(e) => tracing::error!(error = %e, "tidepool-sync failed"),
    }
    result
}
