use anyhow::Result;
use clap::Parser;

use foreman::cli::{run, Cli};
use foreman::config::ForemanConfig;
use foreman::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    ForemanConfig::load_env_file()?;
    let config = ForemanConfig::load()?;
    init_telemetry(&config.observability)?;

    let cli = Cli::parse();
    run(cli, &config).await
}
