//! Wholesale rule-set synchronization
//!
//! The synchronizer converts a desired domain list into an enforced rule set
//! by removing everything currently installed and reinstalling from scratch.
//! Between removal and reinstall nothing is blocked; that brief under-blocking
//! window is an accepted trade for never having to diff rule sets. There is
//! no rollback and no retry; the next reconciliation converges.

use std::sync::Arc;
use tracing::{debug, info, warn};
use warden_api::BlockRule;
use warden_host_api::{HostResult, RuleEnforcer};
use warden_util::normalize_domain;

/// Synchronizes the enforced rule set and remembers what was last applied,
/// so the redirection agent knows which domains just stopped being blocked.
pub struct RuleSync {
    enforcer: Arc<dyn RuleEnforcer>,
    base_id: u32,
    last_applied: Vec<String>,
}

impl RuleSync {
    pub fn new(enforcer: Arc<dyn RuleEnforcer>, base_id: u32) -> Self {
        Self {
            enforcer,
            base_id,
            last_applied: Vec::new(),
        }
    }

    /// The normalized domain set from the last successful synchronization.
    pub fn last_applied(&self) -> &[String] {
        &self.last_applied
    }

    /// Replace the enforced rule set with one rule per domain.
    ///
    /// Rule ids are positional (`base + index`), so an identical ordered
    /// domain list always produces an identical rule set. An empty list is
    /// valid and means "block nothing". On failure the rule state is left
    /// wherever the failed step left it and `last_applied` is not touched.
    pub async fn synchronize(&mut self, domains: &[String]) -> HostResult<()> {
        let normalized: Vec<String> = domains.iter().map(|d| normalize_domain(d)).collect();

        let installed = self.enforcer.installed_rules().await.inspect_err(|e| {
            warn!(error = %e, "Failed to fetch installed rules, aborting synchronization");
        })?;

        let ids: Vec<u32> = installed.iter().map(|rule| rule.id).collect();
        self.enforcer.remove_rules(ids).await.inspect_err(|e| {
            warn!(error = %e, "Failed to remove existing rules, aborting synchronization");
        })?;

        if normalized.is_empty() {
            debug!("No domains to block, rule set left empty");
        } else {
            let rules: Vec<BlockRule> = normalized
                .iter()
                .enumerate()
                .map(|(position, domain)| BlockRule::new(self.base_id, position, domain))
                .collect();

            self.enforcer.install_rules(rules).await.inspect_err(|e| {
                // The old rules are already gone; nothing is blocked until
                // the next successful reconciliation.
                warn!(error = %e, "Failed to install rules, rule set left empty");
            })?;
        }

        info!(count = normalized.len(), "Rule set replaced");
        self.last_applied = normalized;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_api::RULE_BASE_ID;
    use warden_host_api::MockEnforcer;

    fn domains(list: &[&str]) -> Vec<String> {
        list.iter().map(|d| d.to_string()).collect()
    }

    #[tokio::test]
    async fn installs_one_rule_per_domain() {
        let enforcer = Arc::new(MockEnforcer::new());
        let mut sync = RuleSync::new(enforcer.clone(), RULE_BASE_ID);

        sync.synchronize(&domains(&["x.com", "y.com"])).await.unwrap();

        let rules = enforcer.rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, RULE_BASE_ID);
        assert_eq!(rules[0].condition.host, "x.com");
        assert_eq!(rules[1].id, RULE_BASE_ID + 1);
        assert_eq!(sync.last_applied(), ["x.com", "y.com"]);
    }

    #[tokio::test]
    async fn identical_input_yields_identical_rules() {
        let enforcer = Arc::new(MockEnforcer::new());
        let mut sync = RuleSync::new(enforcer.clone(), RULE_BASE_ID);
        let list = domains(&["a.com", "b.com", "c.com"]);

        sync.synchronize(&list).await.unwrap();
        let first = enforcer.rules();

        sync.synchronize(&list).await.unwrap();
        let second = enforcer.rules();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn replaces_previous_rules_wholesale() {
        let enforcer = Arc::new(MockEnforcer::new());
        let mut sync = RuleSync::new(enforcer.clone(), RULE_BASE_ID);

        sync.synchronize(&domains(&["old.com", "older.com"])).await.unwrap();
        sync.synchronize(&domains(&["new.com"])).await.unwrap();

        let rules = enforcer.rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].condition.host, "new.com");
        assert_eq!(rules[0].id, RULE_BASE_ID);
    }

    #[tokio::test]
    async fn empty_input_clears_everything() {
        let enforcer = Arc::new(MockEnforcer::new());
        let mut sync = RuleSync::new(enforcer.clone(), RULE_BASE_ID);

        sync.synchronize(&domains(&["x.com"])).await.unwrap();
        sync.synchronize(&[]).await.unwrap();

        assert!(enforcer.rules().is_empty());
        assert!(sync.last_applied().is_empty());
    }

    #[tokio::test]
    async fn input_is_normalized() {
        let enforcer = Arc::new(MockEnforcer::new());
        let mut sync = RuleSync::new(enforcer.clone(), RULE_BASE_ID);

        sync.synchronize(&domains(&["https://www.Example.com/"]))
            .await
            .unwrap();

        assert_eq!(enforcer.rules()[0].condition.host, "example.com");
        assert_eq!(sync.last_applied(), ["example.com"]);
    }

    #[tokio::test]
    async fn install_failure_leaves_last_applied_untouched() {
        let enforcer = Arc::new(MockEnforcer::new());
        let mut sync = RuleSync::new(enforcer.clone(), RULE_BASE_ID);

        sync.synchronize(&domains(&["x.com"])).await.unwrap();

        *enforcer.fail_install.lock().unwrap() = true;
        let result = sync.synchronize(&domains(&["y.com"])).await;

        assert!(result.is_err());
        // Old rules were removed before the failed install: under-blocked,
        // but the bookkeeping still names the last successful set.
        assert!(enforcer.rules().is_empty());
        assert_eq!(sync.last_applied(), ["x.com"]);
    }
}
