use anyhow::Result;
use tokio::sync::mpsc::Receiver;
use tracing::{error, info};

use crate::db::repository::Repository;
use crate::jobs::types::{Job, JobPayload};
use crate::mail::Mailer;

pub struct JobWorker {
    repo: Repository,
    mailer: Mailer,
    /// Where upgrade notifications go, usually the sales team inbox.
    notify_address: String,
    rx: Receiver<Job>,
}

impl JobWorker {
    pub fn new(repo: Repository, mailer: Mailer, notify_address: String, rx: Receiver<Job>) -> Self {
        Self {
            repo,
            mailer,
            notify_address,
            rx,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        info!("Job worker started");
        while let Some(job) = self.rx.recv().await {
            if let Err(e) = self.handle_job(&job).await {
                error!(job_id = %job.id, "Failed to handle job: {}", e);
            }
        }
        info!("Job worker stopped");
        Ok(())
    }

    async fn handle_job(&self, job: &Job) -> Result<()> {
        match &job.payload {
            JobPayload::SendAccountUpgradeEmail { user_id } => {
                self.send_account_upgrade_email(job, *user_id).await
            }
        }
    }

    async fn send_account_upgrade_email(&self, job: &Job, user_id: i64) -> Result<()> {
        let user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User {} not found", user_id))?;

        let live_subscriptions = self.repo.find_subscriptions_not_inactive(user_id).await?;

        if !live_subscriptions.is_empty() {
            info!(
                job_id = %job.id,
                user_id,
                "User already has a live subscription, skipping upgrade email"
            );
            return Ok(());
        }

        let subject = format!("Upgrade account {}", user.email);
        let text = format!(
            "User {} (id {}) has no live subscription and may be ready for an upgrade.",
            user.email, user.id
        );

        self.mailer
            .send_mail(&self.notify_address, &subject, &text)
            .await?;

        info!(
            job_id = %job.id,
            user_id,
            "Account upgrade email sent"
        );

        Ok(())
    }
}
