pub mod admin;
pub mod limits;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlx::PgPool;

use crate::cmd::{admin::AdminCommands, limits::LimitsCommands};
use crate::db::repository::Repository;
use crate::limits::LimitsResolver;

/// Shared handles for CLI commands. Both the repository and the resolver
/// sit on the same connection pool.
pub struct CliContext {
    pub repo: Arc<Repository>,
    pub resolver: LimitsResolver<Repository>,
}

impl CliContext {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            repo: Arc::new(Repository::new(pool.clone())),
            resolver: LimitsResolver::new(Repository::new(pool)),
        }
    }
}

#[derive(Parser)]
#[command(name = "signdoc")]
#[command(about = "Account and subscription administration", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Database URL; falls back to DATABASE_URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Quota and entitlement lookups
    #[command(subcommand)]
    Limits(LimitsCommands),

    /// Mutations the admin panel performs
    #[command(subcommand)]
    Admin(AdminCommands),
}
