use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::inventory::{NormalizedInventory, SourceId};

/// Outcome of a lightweight connectivity probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
}

impl ConnectionStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Turn a probe failure into an operator-facing message
    pub fn from_error(error: &FetchError) -> Self {
        if error.is_auth_failure() {
            Self::failed(format!(
                "Authentication failed - check credentials and permissions ({})",
                error
            ))
        } else {
            Self::failed(format!("Connection failed: {}", error))
        }
    }
}

/// A remote system that can report stock levels keyed by SKU
#[async_trait]
pub trait InventorySource: Send + Sync {
    fn id(&self) -> SourceId;

    /// All credentials needed to call the remote are present
    fn is_configured(&self) -> bool;

    /// Issue one cheap request; never touches report state
    async fn test_connection(&self) -> ConnectionStatus;

    /// Pull the full inventory and normalize it by SKU
    async fn fetch_inventory(&self) -> Result<NormalizedInventory, FetchError>;
}
