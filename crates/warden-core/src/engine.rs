//! Reconciliation dispatcher
//!
//! The engine is level-triggered: every trigger re-derives the desired
//! enforcement and scheduling state from the persisted session collection and
//! drives the rule synchronizer, the expiry timer, and (on expiry) the
//! redirection agent. Failures are logged and absorbed; the prior enforced
//! state stays in place until the next trigger.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use warden_api::RULE_BASE_ID;
use warden_host_api::{ExpiryTimer, RuleEnforcer, ViewHost};
use warden_store::SessionStore;

use crate::{DEFAULT_REDIRECT_URL, Redirector, RuleSync, enforced_domains, next_expiry};

/// A reason to reconcile. Each external event maps to exactly one trigger;
/// there is no hidden control flow.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Service started (or was reinstalled)
    Startup,

    /// The session collection changed
    SessionsChanged,

    /// The caller already knows the desired domain list (freshly created
    /// session) and asks for it directly, bypassing resolution
    UpdateRequest { sites: Vec<String> },

    /// The expiry timer slot fired
    TimerFired,
}

/// Tunables for the engine
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Neutral destination for redirected views
    pub redirect_url: String,

    /// Base offset for positional rule ids
    pub rule_base_id: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            rule_base_id: RULE_BASE_ID,
        }
    }
}

/// The reconciliation engine. One instance owns the last-applied bookkeeping
/// and is driven by one dispatcher at a time.
pub struct Engine {
    store: Arc<dyn SessionStore>,
    sync: RuleSync,
    redirector: Redirector,
    timer: Arc<dyn ExpiryTimer>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        enforcer: Arc<dyn RuleEnforcer>,
        views: Arc<dyn ViewHost>,
        timer: Arc<dyn ExpiryTimer>,
        options: EngineOptions,
    ) -> Self {
        info!(
            redirect_url = %options.redirect_url,
            rule_base_id = options.rule_base_id,
            "Engine initialized"
        );

        Self {
            store,
            sync: RuleSync::new(enforcer, options.rule_base_id),
            redirector: Redirector::new(views, options.redirect_url),
            timer,
        }
    }

    /// The normalized domain set from the last successful rule replacement.
    pub fn last_applied(&self) -> &[String] {
        self.sync.last_applied()
    }

    /// Dispatch one trigger. Triggers are handled one at a time; the caller
    /// serializes them.
    pub async fn handle(&mut self, trigger: Trigger, now: DateTime<Utc>) {
        debug!(trigger = ?trigger, "Handling trigger");

        match trigger {
            Trigger::Startup | Trigger::SessionsChanged => self.reconcile(now).await,
            Trigger::UpdateRequest { sites } => {
                let _ = self.sync.synchronize(&sites).await;
                self.reschedule(now).await;
            }
            Trigger::TimerFired => self.on_timer_fired(now).await,
        }
    }

    /// Full recompute: resolve the enforceable domain set from the store,
    /// replace the rule set, and re-arm the timer.
    async fn reconcile(&mut self, now: DateTime<Utc>) {
        let sessions = match self.store.load_sessions() {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(error = %e, "Session store unavailable, skipping reconciliation");
                return;
            }
        };

        let domains = enforced_domains(&sessions, now);
        let _ = self.sync.synchronize(&domains).await;
        self.reschedule_from(&sessions, now).await;
    }

    /// Re-derive the timer slot from the store.
    pub async fn reschedule(&mut self, now: DateTime<Utc>) {
        let sessions = match self.store.load_sessions() {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(error = %e, "Session store unavailable, leaving timer as-is");
                return;
            }
        };

        self.reschedule_from(&sessions, now).await;
    }

    async fn reschedule_from(&self, sessions: &[warden_api::SessionRecord], now: DateTime<Utc>) {
        match next_expiry(sessions, now) {
            Some(at) => {
                if let Err(e) = self.timer.arm(at).await {
                    warn!(error = %e, "Failed to arm expiry timer");
                } else {
                    debug!(expiry = %at, "Expiry timer armed");
                }
            }
            None => {
                if let Err(e) = self.timer.cancel().await {
                    warn!(error = %e, "Failed to cancel expiry timer");
                }
            }
        }
    }

    /// The timer fired: either everything expired (clear rules, move views
    /// off the removed domains) or a different session is still live (re-arm
    /// for its expiry, no redirect).
    async fn on_timer_fired(&mut self, now: DateTime<Utc>) {
        let sessions = match self.store.load_sessions() {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(error = %e, "Session store unavailable on timer fire, skipping");
                return;
            }
        };

        let domains = enforced_domains(&sessions, now);
        if domains.is_empty() {
            info!("No active session remains, clearing rules");

            // Capture before synchronize() overwrites the bookkeeping.
            let removed = self.sync.last_applied().to_vec();
            let _ = self.sync.synchronize(&[]).await;
            self.redirector.redirect(&removed).await;
            // No survivor means no expiry to wait for; clear the slot.
            self.reschedule_from(&sessions, now).await;
        } else {
            // Another session is still active; the enforced set stands and
            // the slot advances to the next soonest expiry.
            self.reschedule_from(&sessions, now).await;
        }
    }

    /// Best-effort bookkeeping: flip `is_active` off on sessions that elapsed
    /// by time. Enforcement never depends on this; it exists so stored flags
    /// eventually match reality. Returns the ids of the sessions rewritten.
    pub fn expire_stale_sessions(&self, now: DateTime<Utc>) -> Vec<warden_util::SessionId> {
        let mut sessions = match self.store.load_sessions() {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(error = %e, "Session store unavailable, skipping flag cleanup");
                return Vec::new();
            }
        };

        let mut expired = Vec::new();
        for session in &mut sessions {
            if session.is_active && session.end_time <= now {
                session.is_active = false;
                expired.push(session.id.clone());
            }
        }

        if !expired.is_empty()
            && let Err(e) = self.store.save_sessions(&sessions)
        {
            warn!(error = %e, "Failed to persist deactivated sessions");
            return Vec::new();
        }

        expired
    }
}
