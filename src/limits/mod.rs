pub mod constants;
pub mod error;
pub mod resolver;

pub use constants::{Quota, QuotaLimit};
pub use error::LimitsError;
pub use resolver::{EntitlementStore, LimitsRequest, LimitsResolver, LimitsResponse};
