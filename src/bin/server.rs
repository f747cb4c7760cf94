use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use signdoc::{
    backend::{AppState, router::build_router},
    db::{create_pool, repository::Repository, run_migrations},
    jobs::{types::Job, worker::JobWorker},
    limits::LimitsResolver,
    mail::Mailer,
    utils::config::AppConfig,
};
use tokio::{signal, sync::mpsc};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,signdoc=debug".into()),
        )
        .init();

    info!("Starting signdoc entitlement server");

    let config = AppConfig::load()?;

    let pool = create_pool(&config.database_url).await?;

    run_migrations(&pool).await?;

    let pool = Arc::new(pool);
    let repo = Arc::new(Repository::new(pool.clone()));
    let resolver = Arc::new(LimitsResolver::new(Repository::new(pool.clone())));

    let (tx, rx) = mpsc::channel::<Job>(config.job_queue_depth);

    let mailer = Mailer::new(
        config.mail_api_url.clone(),
        config.mail_api_key.clone(),
        config.mail_from.clone(),
    )?;
    let worker = JobWorker::new(
        Repository::new(pool),
        mailer,
        config.mail_notify_address.clone(),
        rx,
    );
    let worker_handle = tokio::spawn(async move {
        if let Err(e) = worker.run().await {
            tracing::error!("Job worker failed: {}", e);
        }
    });

    let state = AppState {
        repo,
        resolver,
        jobs: tx,
        api_key: Arc::new(config.api_key.clone()),
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("Server failed: {}", e);
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = server_handle => {
            match result {
                Ok(_) => info!("Server task completed"),
                Err(e) => tracing::error!("Server task panicked: {}", e),
            }
        }
        result = worker_handle => {
            match result {
                Ok(_) => info!("Worker task completed"),
                Err(e) => tracing::error!("Worker task panicked: {}", e),
            }
        }
    }

    info!("Shutting down gracefully...");

    Ok(())
}
