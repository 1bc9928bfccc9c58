//! Active-session selection policies
//!
//! Two distinct policies look at the same session collection with the same
//! liveness filter but different tie-breaks, serving different consumers:
//! enforcement wants the most recently started session, scheduling wants the
//! soonest expiry. They are deliberately separate functions, not one function
//! with a mode flag, and both recompute from scratch on every call.

use chrono::{DateTime, Utc};
use warden_api::SessionRecord;

/// Enforcement policy: the domains that should be blocked right now.
///
/// Among sessions that are flagged active and not yet elapsed, the one with
/// the latest `created_date` wins; its domain list is returned as-is. No
/// survivor means nothing is blocked.
pub fn enforced_domains(sessions: &[SessionRecord], now: DateTime<Utc>) -> Vec<String> {
    sessions
        .iter()
        .filter(|s| s.is_enforceable(now))
        .max_by_key(|s| s.created_date)
        .map(|s| s.domains.clone())
        .unwrap_or_default()
}

/// Scheduling policy: the instant the single expiry timer should fire.
///
/// Same liveness filter as enforcement, but the soonest `end_time` wins,
/// regardless of whose domains are currently enforced. None means no timer
/// is needed.
pub fn next_expiry(sessions: &[SessionRecord], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    sessions
        .iter()
        .filter(|s| s.is_enforceable(now))
        .map(|s| s.end_time)
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use warden_util::SessionId;

    fn session(
        domains: Vec<&str>,
        created_offset_min: i64,
        end_offset_min: i64,
        active: bool,
        now: DateTime<Utc>,
    ) -> SessionRecord {
        SessionRecord {
            id: SessionId::new(),
            domains: domains.into_iter().map(str::to_string).collect(),
            duration_minutes: 30,
            start_time: now + Duration::minutes(created_offset_min),
            end_time: now + Duration::minutes(end_offset_min),
            is_active: active,
            created_date: now + Duration::minutes(created_offset_min),
        }
    }

    #[test]
    fn no_sessions_means_nothing_enforced() {
        let now = Utc::now();
        assert!(enforced_domains(&[], now).is_empty());
        assert!(next_expiry(&[], now).is_none());
    }

    #[test]
    fn most_recently_created_session_wins_enforcement() {
        let now = Utc::now();
        let a = session(vec!["a.com"], -20, 60, true, now);
        let b = session(vec!["b.com"], -10, 30, true, now);

        // B was created later, so B's domains are enforced even though A
        // expires later.
        assert_eq!(enforced_domains(&[a, b], now), vec!["b.com"]);
    }

    #[test]
    fn soonest_expiry_wins_scheduling() {
        let now = Utc::now();
        let a = session(vec!["a.com"], -20, 10, true, now);
        let b = session(vec!["b.com"], -10, 30, true, now);
        let expected = a.end_time;

        // A expires first, so the timer targets A even though B is the
        // session being enforced.
        assert_eq!(next_expiry(&[a, b], now), Some(expected));
    }

    #[test]
    fn elapsed_sessions_are_excluded_despite_active_flag() {
        let now = Utc::now();
        let stale = session(vec!["stale.com"], -60, -10, true, now);

        assert!(enforced_domains(std::slice::from_ref(&stale), now).is_empty());
        assert!(next_expiry(&[stale], now).is_none());
    }

    #[test]
    fn inactive_sessions_are_excluded() {
        let now = Utc::now();
        let stopped = session(vec!["x.com"], -5, 30, false, now);

        assert!(enforced_domains(std::slice::from_ref(&stopped), now).is_empty());
        assert!(next_expiry(&[stopped], now).is_none());
    }

    #[test]
    fn end_time_exactly_now_is_elapsed() {
        let now = Utc::now();
        let edge = session(vec!["x.com"], -10, 0, true, now);

        // end_time must be strictly in the future
        assert!(enforced_domains(&[edge], now).is_empty());
    }
}
