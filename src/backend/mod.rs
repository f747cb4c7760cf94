pub mod handlers;
pub mod middleware;
pub mod router;

use std::sync::Arc;

use tokio::sync::mpsc::Sender;

use crate::db::repository::Repository;
use crate::jobs::types::Job;
use crate::limits::LimitsResolver;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub resolver: Arc<LimitsResolver<Repository>>,
    pub jobs: Sender<Job>,
    pub api_key: Arc<String>,
}
