use clap::arg;
use clap::command;
use clap::Parser;
use upstream_facade::facade::builder::build_facade;
use upstream_facade::server;
use upstream_facade::utils::config_loader;
use upstream_facade::utils::logging;
use anyhow::Result;
use upstream_facade::utils::logging::LogLevel;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "upstream-facade.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL" , value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level.to_owned()).await?;

    // -------------------------------
    // 2. Build token manager, dispatcher and metadata cache
    // -------------------------------

    let facade = build_facade(&service_config)?;

    // -------------------------------
    // 3. Serve facade routes and metrics
    // -------------------------------

    info!("Service starting...");
    server::server::start(&service_config.settings, facade).await
}
