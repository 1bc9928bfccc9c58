//! Mock host collaborators for testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use warden_api::{BlockRule, ViewRef};
use warden_util::ViewId;

use crate::{ExpiryTimer, HostError, HostResult, RuleEnforcer, ViewHost};

/// Mock rule enforcer backed by an in-memory rule list
#[derive(Default)]
pub struct MockEnforcer {
    rules: Mutex<Vec<BlockRule>>,

    /// Every rule list passed to `install_rules`, in order
    pub install_calls: Mutex<Vec<Vec<BlockRule>>>,

    /// Configure the next install to fail
    pub fail_install: Arc<Mutex<bool>>,

    /// Configure the next removal to fail
    pub fail_remove: Arc<Mutex<bool>>,
}

impl MockEnforcer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of currently installed rules
    pub fn rules(&self) -> Vec<BlockRule> {
        self.rules.lock().unwrap().clone()
    }
}

#[async_trait]
impl RuleEnforcer for MockEnforcer {
    async fn installed_rules(&self) -> HostResult<Vec<BlockRule>> {
        Ok(self.rules.lock().unwrap().clone())
    }

    async fn remove_rules(&self, ids: Vec<u32>) -> HostResult<()> {
        if *self.fail_remove.lock().unwrap() {
            return Err(HostError::EnforcementFailed("mock removal failure".into()));
        }
        self.rules
            .lock()
            .unwrap()
            .retain(|rule| !ids.contains(&rule.id));
        Ok(())
    }

    async fn install_rules(&self, rules: Vec<BlockRule>) -> HostResult<()> {
        if *self.fail_install.lock().unwrap() {
            return Err(HostError::EnforcementFailed("mock install failure".into()));
        }
        self.install_calls.lock().unwrap().push(rules.clone());
        self.rules.lock().unwrap().extend(rules);
        Ok(())
    }
}

/// Mock view host with a configurable view list
#[derive(Default)]
pub struct MockViews {
    views: Mutex<Vec<ViewRef>>,

    /// Recorded navigations as (view, url) pairs
    pub navigations: Mutex<Vec<(ViewId, String)>>,

    /// Configure enumeration to fail
    pub fail_list: Arc<Mutex<bool>>,

    /// View ids whose navigation should fail
    pub fail_navigate: Arc<Mutex<Vec<ViewId>>>,
}

impl MockViews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_views(views: Vec<ViewRef>) -> Self {
        Self {
            views: Mutex::new(views),
            ..Self::default()
        }
    }

    pub fn set_views(&self, views: Vec<ViewRef>) {
        *self.views.lock().unwrap() = views;
    }

    /// Targets of recorded navigations
    pub fn navigated_views(&self) -> Vec<ViewId> {
        self.navigations
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }
}

#[async_trait]
impl ViewHost for MockViews {
    async fn list_views(&self) -> HostResult<Vec<ViewRef>> {
        if *self.fail_list.lock().unwrap() {
            return Err(HostError::EnumerationFailed(
                "mock enumeration failure".into(),
            ));
        }
        Ok(self.views.lock().unwrap().clone())
    }

    async fn navigate(&self, view: ViewId, url: &str) -> HostResult<()> {
        if self.fail_navigate.lock().unwrap().contains(&view) {
            return Err(HostError::NavigationFailed(format!(
                "mock navigation failure for view {view}"
            )));
        }
        self.navigations
            .lock()
            .unwrap()
            .push((view, url.to_string()));
        Ok(())
    }
}

/// Mock timer slot recording the armed instant
#[derive(Default)]
pub struct MockTimer {
    armed: Mutex<Option<DateTime<Utc>>>,

    /// Number of times `arm` was called
    pub arm_count: Mutex<usize>,
}

impl MockTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently armed instant, if any
    pub fn armed_at(&self) -> Option<DateTime<Utc>> {
        *self.armed.lock().unwrap()
    }
}

#[async_trait]
impl ExpiryTimer for MockTimer {
    async fn arm(&self, at: DateTime<Utc>) -> HostResult<()> {
        *self.armed.lock().unwrap() = Some(at);
        *self.arm_count.lock().unwrap() += 1;
        Ok(())
    }

    async fn cancel(&self) -> HostResult<()> {
        *self.armed.lock().unwrap() = None;
        Ok(())
    }
}
