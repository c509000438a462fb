use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use folio_cli::cli::Cli;
use folio_cli::commands::{self, Context};
use folio_config::{ConfigLoader, FolioConfig};
use folio_core::ContentStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let mut config = loader.load().context("failed to load configuration")?;
    if let Some(repo) = &cli.repo {
        config.store.repo_root = repo.clone();
    }

    init_logging(&cli, &config);
    debug!(root = %config.store.content_root().display(), "Opening content store");

    let store = ContentStore::open(&config)
        .await
        .with_context(|| format!("failed to open store at {}", config.store.repo_root.display()))?;
    let ctx = Context::new(store, cli.format, config.history.limit)?;

    let output = commands::execute(&ctx, cli.command).await?;
    println!("{output}");
    Ok(())
}

/// `--verbose` beats `--log-level`, which beats `FOLIO_LOG`/the config file
fn init_logging(cli: &Cli, config: &FolioConfig) {
    let filter = if cli.verbose {
        EnvFilter::default().add_directive(LevelFilter::DEBUG.into())
    } else if let Some(level) = cli.log_level {
        EnvFilter::default().add_directive(LevelFilter::from(level).into())
    } else {
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
