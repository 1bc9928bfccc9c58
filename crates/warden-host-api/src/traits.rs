//! Host collaborator traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use warden_api::{BlockRule, ViewRef};
use warden_util::ViewId;

/// Errors from host collaborator operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Rule enforcement failed: {0}")]
    EnforcementFailed(String),

    #[error("View enumeration failed: {0}")]
    EnumerationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Timer failed: {0}")]
    TimerFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Installs and removes navigation-blocking rules.
///
/// The engine owns the full rule set: it always removes everything it finds
/// and reinstalls from scratch, so implementations need no diffing logic.
#[async_trait]
pub trait RuleEnforcer: Send + Sync {
    /// All rules currently installed by this engine
    async fn installed_rules(&self) -> HostResult<Vec<BlockRule>>;

    /// Remove the rules with the given ids
    async fn remove_rules(&self, ids: Vec<u32>) -> HostResult<()>;

    /// Install freshly constructed rules
    async fn install_rules(&self, rules: Vec<BlockRule>) -> HostResult<()>;
}

/// Enumerates open browsing views and navigates them
#[async_trait]
pub trait ViewHost: Send + Sync {
    /// Best-effort list of currently open views
    async fn list_views(&self) -> HostResult<Vec<ViewRef>>;

    /// Navigate a single view to the given URL
    async fn navigate(&self, view: ViewId, url: &str) -> HostResult<()>;
}

/// The single system-wide expiry timer slot.
///
/// Arming always supersedes any previously armed instant; there is never more
/// than one live timer. Cancelling an empty slot is a no-op.
#[async_trait]
pub trait ExpiryTimer: Send + Sync {
    /// Arm the slot to fire at the given instant, replacing any prior arming
    async fn arm(&self, at: DateTime<Utc>) -> HostResult<()>;

    /// Clear the slot entirely
    async fn cancel(&self) -> HostResult<()>;
}
