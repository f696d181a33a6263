pub mod email;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::reconciliation::models::{Discrepancy, Report};

pub use email::EmailNotifier;

/// Delivers a report summary to people who act on it
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Credentials and at least one recipient are present
    fn is_configured(&self) -> bool;

    /// `top` is the head of the report's discrepancy list
    async fn notify(&self, report: &Report, top: &[Discrepancy]) -> AppResult<()>;
}
