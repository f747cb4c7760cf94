use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Port the API server listens on (default 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    pub database_url: String,

    /// Bearer key admin callers must present
    pub api_key: String,

    /// Transactional-mail HTTP API
    pub mail_api_url: String,
    pub mail_api_key: String,

    /// From address on outgoing mail
    #[serde(default = "default_mail_from")]
    pub mail_from: String,

    /// Inbox that receives account-upgrade notifications
    #[serde(default = "default_mail_notify_address")]
    pub mail_notify_address: String,

    /// Depth of the in-process job channel
    #[serde(default = "default_job_queue_depth")]
    pub job_queue_depth: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let cfg: AppConfig = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()?;

        if cfg.api_key.is_empty() {
            anyhow::bail!("api_key must be set");
        }

        Ok(cfg)
    }
}

fn default_port() -> u16 {
    8080
}

fn default_mail_from() -> String {
    "Team <info@signdoc.com>".to_string()
}

fn default_mail_notify_address() -> String {
    "info@signdoc.com".to_string()
}

fn default_job_queue_depth() -> usize {
    256
}
