//! Shared types for the wardend API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use warden_util::{SessionId, ViewId, host_matches};

/// Base offset for enforcement rule ids; each rule gets `base + position`
pub const RULE_BASE_ID: u32 = 1001;

/// A persisted blocking session.
///
/// Sessions are append-only history: the engine never deletes them. The
/// `is_active` flag is best-effort bookkeeping; enforcement always re-checks
/// `end_time` against the current instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,

    /// Domains to block while this session is active.
    /// Malformed or missing values deserialize to an empty list.
    #[serde(default, deserialize_with = "lenient_domains")]
    pub domains: Vec<String>,

    pub duration_minutes: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
    pub created_date: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether this session should currently be enforced: flagged active and
    /// not yet past its end time. The stored flag alone is never enough.
    pub fn is_enforceable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.end_time > now
    }
}

/// Accept anything in the `domains` slot; non-arrays and non-string elements
/// collapse to empty rather than failing the whole record.
fn lenient_domains<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    })
}

/// A previously-used domain in the pick list. Independent of sessions and
/// never enforced by itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedDomain {
    pub id: String,
    pub domain: String,
    pub added_at: DateTime<Utc>,
}

/// Action taken by an enforcement rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Block,
}

/// Predicate for an enforcement rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCondition {
    /// Normalized hostname; matches the host itself and any subdomain
    pub host: String,

    /// Only top-level page loads are blocked, never sub-resources
    pub main_frame_only: bool,
}

/// An ephemeral enforcement rule. Rules are recomputed wholesale on every
/// reconciliation; ids are positional so an identical ordered domain list
/// produces identical rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

impl BlockRule {
    /// Build the rule for `domain` at `position` in the current domain list.
    pub fn new(base_id: u32, position: usize, domain: impl Into<String>) -> Self {
        Self {
            id: base_id + position as u32,
            priority: 1,
            action: RuleAction::Block,
            condition: RuleCondition {
                host: domain.into(),
                main_frame_only: true,
            },
        }
    }

    /// Whether this rule covers the given (raw) hostname.
    pub fn matches_host(&self, host: &str) -> bool {
        host_matches(host, &self.condition.host)
    }
}

/// An open browsing view as reported by the host side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRef {
    pub id: ViewId,

    /// Current URL, if the host could resolve one
    pub url: Option<String>,
}

/// Snapshot of daemon state for clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceState {
    pub api_version: u32,

    /// Domains enforced right now
    pub enforced_domains: Vec<String>,

    /// When the soonest active session expires, if any
    pub next_expiry: Option<DateTime<Utc>>,

    /// Total persisted sessions (active and elapsed)
    pub session_count: usize,

    /// Entries in the blocked-domain pick list
    pub blocked_domain_count: usize,
}
