use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use signdoc::cmd::{Cli, CliContext, Commands};
use signdoc::db::create_pool;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let database_url = match cli.database_url {
        Some(url) => url,
        None => std::env::var("DATABASE_URL")?,
    };

    info!("Connecting to database");

    let pool = Arc::new(create_pool(&database_url).await?);
    let ctx = CliContext::new(pool);

    match cli.command {
        Commands::Limits(cmd) => cmd.execute(&ctx).await?,
        Commands::Admin(cmd) => cmd.execute(&ctx).await?,
    }

    Ok(())
}
