use anyhow::Result;
use clap::Subcommand;

use crate::cmd::CliContext;
use crate::limits::LimitsRequest;

#[derive(Subcommand)]
pub enum LimitsCommands {
    /// Resolve quota and remaining allowance for a user or team
    Resolve {
        /// Email of the account to resolve
        #[arg(long)]
        email: String,

        /// Resolve a team's limits instead; the email must be a member
        #[arg(long)]
        team_id: Option<i64>,
    },

    /// Check whether the user can create another document this month
    CanSend {
        #[arg(long)]
        email: String,
    },
}

impl LimitsCommands {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            LimitsCommands::Resolve { email, team_id } => {
                let resolved = ctx
                    .resolver
                    .resolve(&LimitsRequest {
                        email: Some(email.clone()),
                        team_id: *team_id,
                    })
                    .await?;

                println!("{}", serde_json::to_string_pretty(&resolved)?);
            }

            LimitsCommands::CanSend { email } => {
                let allowed = ctx.resolver.can_send_document(email).await?;
                println!("{}", serde_json::json!({ "allowed": allowed }));
            }
        }

        Ok(())
    }
}
