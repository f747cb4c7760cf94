use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{error, warn};

#[derive(Debug, Serialize)]
struct SendMailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Thin client for the transactional-mail HTTP API. Rendering of rich email
/// templates lives with the mail provider; this only posts subject + text.
pub struct Mailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl Mailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Result<Self, MailerError> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(10))
            .use_rustls_tls()
            .build()
            .map_err(|e| MailerError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            api_key,
            from,
        })
    }

    pub async fn send_mail(
        &self,
        to: &str,
        subject: &str,
        text: &str,
    ) -> Result<(), MailerError> {
        let url = format!("{}/messages", self.api_url);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&SendMailRequest {
                from: &self.from,
                to,
                subject,
                text,
            })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Mail API unreachable");
                MailerError::Unreachable(e.to_string())
            })?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "Mail API returned non-2xx");
            return Err(MailerError::ApiError(resp.status().as_u16()));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("Failed to build mail HTTP client: {0}")]
    ClientBuild(String),
    #[error("Mail API unreachable: {0}")]
    Unreachable(String),
    #[error("Mail API error: HTTP {0}")]
    ApiError(u16),
}

impl MailerError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MailerError::Unreachable(_) | MailerError::ApiError(500..=599)
        )
    }
}
