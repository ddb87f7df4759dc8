use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notedesk::{cli, config};

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| "notedesk=info,tower_http=info".into());
  tracing_subscriber::registry()
    .with(env_filter)
    .with(tracing_subscriber::fmt::layer())
    .init();

  let args = cli::Args::parse();
  let config = config::Config::load(args.config.as_deref())?;

  cli::run(args, config).await
}
