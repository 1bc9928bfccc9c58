//! Broadcast events pushed to subscribed clients
//!
//! The browser bridge subscribes and acts on `RulesReplaced` and
//! `NavigateView`; UI clients typically watch the session events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_util::{SessionId, ViewId};

use crate::BlockRule;

/// Event wrapper with a timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// All broadcast event payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// The enforced rule set was replaced wholesale
    RulesReplaced { rules: Vec<BlockRule> },

    /// The named view must be navigated to the given URL
    NavigateView { view: ViewId, url: String },

    /// A new blocking session was started
    SessionStarted {
        session_id: SessionId,
        domains: Vec<String>,
        end_time: DateTime<Utc>,
    },

    /// A session stopped being enforced (explicit stop or expiry)
    SessionEnded { session_id: SessionId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RULE_BASE_ID;

    #[test]
    fn event_roundtrip() {
        let event = Event::new(EventPayload::RulesReplaced {
            rules: vec![BlockRule::new(RULE_BASE_ID, 0, "example.com")],
        });
        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert!(
            matches!(parsed.payload, EventPayload::RulesReplaced { rules } if rules.len() == 1)
        );
    }
}
