use anyhow::Result;
use clap::Parser;
use strongbox_cli::{execute, Args};
use strongbox_core::logging::init_logging_with_config;
use strongbox_core::metrics::init_metrics;
use strongbox_core::StrongboxConfig;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = StrongboxConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.vault.data_dir = dir;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    config.validate()?;

    init_logging_with_config(config.logging.to_log_config())?;
    init_metrics();
    info!(data_dir = %config.vault.data_dir.display(), "Strongbox started");

    let mut stdout = std::io::stdout();
    execute(&config, args.command, &mut stdout).await?;

    debug!("Strongbox finished");
    Ok(())
}
