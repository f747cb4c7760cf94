use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Work items handed to the background worker over the job channel. The
/// queue itself is in-process; producers only enqueue, the worker executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobPayload {
    /// Notify the sales team that an account is a candidate for a paid
    /// upgrade. Skipped when the user already holds a live subscription.
    SendAccountUpgradeEmail { user_id: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub payload: JobPayload,
}

impl Job {
    pub fn new(payload: JobPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
        }
    }
}
