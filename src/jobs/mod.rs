pub mod types;
pub mod worker;

pub use types::JobPayload;
pub use worker::JobWorker;
