use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use tracing::info;

use crate::cmd::CliContext;
use crate::db::models::{Role, SubscriptionStatus, SubscriptionType};
use crate::jobs::types::{Job, JobPayload};
use crate::jobs::worker::JobWorker;
use crate::mail::Mailer;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Active,
    Inactive,
    PastDue,
}

impl From<StatusArg> for SubscriptionStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Active => SubscriptionStatus::Active,
            StatusArg::Inactive => SubscriptionStatus::Inactive,
            StatusArg::PastDue => SubscriptionStatus::PastDue,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PlanArg {
    Free,
    Basic,
    Professional,
    Enterprise,
    Team,
}

impl From<PlanArg> for SubscriptionType {
    fn from(arg: PlanArg) -> Self {
        match arg {
            PlanArg::Free => SubscriptionType::Free,
            PlanArg::Basic => SubscriptionType::Basic,
            PlanArg::Professional => SubscriptionType::Professional,
            PlanArg::Enterprise => SubscriptionType::Enterprise,
            PlanArg::Team => SubscriptionType::Team,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    User,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::User => Role::User,
            RoleArg::Admin => Role::Admin,
        }
    }
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Change a subscription's status and/or plan
    UpdateSubscription {
        #[arg(long)]
        id: i64,

        #[arg(long)]
        status: Option<StatusArg>,

        #[arg(long)]
        plan: Option<PlanArg>,
    },

    /// Update a user's profile fields and roles
    UpdateUser {
        #[arg(long)]
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Replaces the full role set when given
        #[arg(long, value_delimiter = ',')]
        roles: Option<Vec<RoleArg>>,
    },

    /// Send the account-upgrade notification for a user
    SendUpgradeEmail {
        #[arg(long)]
        user_id: i64,
    },
}

impl AdminCommands {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            AdminCommands::UpdateSubscription { id, status, plan } => {
                let subscription = ctx
                    .repo
                    .update_subscription(*id, status.map(Into::into), plan.map(Into::into))
                    .await?;

                println!("{}", serde_json::to_string_pretty(&subscription)?);
            }

            AdminCommands::UpdateUser {
                id,
                name,
                email,
                roles,
            } => {
                let roles = roles
                    .as_ref()
                    .map(|r| r.iter().map(|role| (*role).into()).collect());

                let user = ctx
                    .repo
                    .update_user_profile(*id, name.clone(), email.clone(), roles)
                    .await?;

                println!("{}", serde_json::to_string_pretty(&user)?);
            }

            AdminCommands::SendUpgradeEmail { user_id } => {
                let mail_api_url = std::env::var("MAIL_API_URL")?;
                let mail_api_key = std::env::var("MAIL_API_KEY")?;
                let mail_from = std::env::var("MAIL_FROM")
                    .unwrap_or_else(|_| "Team <info@signdoc.com>".to_string());
                let notify_address = std::env::var("MAIL_NOTIFY_ADDRESS")
                    .unwrap_or_else(|_| "info@signdoc.com".to_string());

                let mailer = Mailer::new(mail_api_url, mail_api_key, mail_from)?;

                // One-shot worker: enqueue the single job, close the channel
                // and let run() drain it.
                let (tx, rx) = tokio::sync::mpsc::channel(1);
                let worker =
                    JobWorker::new(ctx.repo.as_ref().clone(), mailer, notify_address, rx);

                tx.send(Job::new(JobPayload::SendAccountUpgradeEmail {
                    user_id: *user_id,
                }))
                .await?;
                drop(tx);

                worker.run().await?;
                info!(user_id, "Upgrade email job completed");
            }
        }

        Ok(())
    }
}
