//! IPC-backed host collaborators
//!
//! The actual enforcement surface lives in the browser. A bridge client
//! connects to the daemon socket, subscribes to events, mirrors every
//! `RulesReplaced` broadcast into the browser's blocking machinery, executes
//! `NavigateView`, and reports its open views with `ReportViews`. On the
//! daemon side this type implements the engine's host traits against that
//! protocol: the rule set and view list are cached here, navigation is fire
//! and forget.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::debug;
use warden_api::{BlockRule, Event, EventPayload, ViewRef};
use warden_host_api::{HostResult, RuleEnforcer, ViewHost};
use warden_ipc::IpcServer;
use warden_util::ViewId;

pub struct BridgeHost {
    ipc: Arc<IpcServer>,
    rules: Mutex<Vec<BlockRule>>,
    views: Mutex<Vec<ViewRef>>,
}

impl BridgeHost {
    pub fn new(ipc: Arc<IpcServer>) -> Self {
        Self {
            ipc,
            rules: Mutex::new(Vec::new()),
            views: Mutex::new(Vec::new()),
        }
    }

    /// Replace the cached view list (from a `ReportViews` command)
    pub fn set_views(&self, views: Vec<ViewRef>) {
        debug!(count = views.len(), "Bridge views updated");
        *self.views.lock().unwrap() = views;
    }

    fn broadcast_rules(&self) {
        let rules = self.rules.lock().unwrap().clone();
        self.ipc
            .broadcast_event(Event::new(EventPayload::RulesReplaced { rules }));
    }
}

#[async_trait]
impl RuleEnforcer for BridgeHost {
    async fn installed_rules(&self) -> HostResult<Vec<BlockRule>> {
        Ok(self.rules.lock().unwrap().clone())
    }

    async fn remove_rules(&self, ids: Vec<u32>) -> HostResult<()> {
        self.rules
            .lock()
            .unwrap()
            .retain(|rule| !ids.contains(&rule.id));
        self.broadcast_rules();
        Ok(())
    }

    async fn install_rules(&self, rules: Vec<BlockRule>) -> HostResult<()> {
        self.rules.lock().unwrap().extend(rules);
        self.broadcast_rules();
        Ok(())
    }
}

#[async_trait]
impl ViewHost for BridgeHost {
    async fn list_views(&self) -> HostResult<Vec<ViewRef>> {
        Ok(self.views.lock().unwrap().clone())
    }

    async fn navigate(&self, view: ViewId, url: &str) -> HostResult<()> {
        self.ipc.broadcast_event(Event::new(EventPayload::NavigateView {
            view,
            url: url.to_string(),
        }));
        Ok(())
    }
}
