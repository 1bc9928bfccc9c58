//! Store trait definitions

use warden_api::{BlockedDomain, SessionRecord};

use crate::StoreResult;

/// Persistence for session records and the blocked-domain pick list.
///
/// Both collections use read-all/write-all semantics, mirroring the
/// key-value store the data originally lives in. There is no transaction
/// discipline across read-then-write; callers tolerate interleaving because
/// every reconciliation recomputes from whatever is persisted.
pub trait SessionStore: Send + Sync {
    /// Load all session records, oldest first. A missing collection is an
    /// empty list, not an error.
    fn load_sessions(&self) -> StoreResult<Vec<SessionRecord>>;

    /// Replace the whole session collection
    fn save_sessions(&self, sessions: &[SessionRecord]) -> StoreResult<()>;

    /// Load the blocked-domain pick list
    fn load_blocked_domains(&self) -> StoreResult<Vec<BlockedDomain>>;

    /// Replace the whole pick list
    fn save_blocked_domains(&self, domains: &[BlockedDomain]) -> StoreResult<()>;

    /// Check if the store is healthy
    fn is_healthy(&self) -> bool;
}
