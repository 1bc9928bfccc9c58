//! The single expiry timer slot, backed by tokio
//!
//! Arming writes the new deadline into a watch channel; one long-lived task
//! sleeps toward whatever the channel currently holds. Because a watch channel
//! keeps only the latest value, arming atomically supersedes any prior arming
//! and two timers can never be live at once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::debug;
use warden_host_api::{ExpiryTimer, HostError, HostResult};

pub struct TokioTimer {
    deadline_tx: watch::Sender<Option<DateTime<Utc>>>,
}

impl TokioTimer {
    /// Spawn the sleeper task; each fire sends one unit on `fire_tx`.
    pub fn new(fire_tx: mpsc::UnboundedSender<()>) -> Self {
        let (deadline_tx, mut deadline_rx) = watch::channel(None::<DateTime<Utc>>);

        tokio::spawn(async move {
            loop {
                let deadline = *deadline_rx.borrow_and_update();
                match deadline {
                    Some(at) => {
                        let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                        tokio::select! {
                            _ = tokio::time::sleep(wait) => {
                                debug!(deadline = %at, "Expiry timer fired");
                                if fire_tx.send(()).is_err() {
                                    break;
                                }
                                // The slot is spent; block until re-armed.
                                if deadline_rx.changed().await.is_err() {
                                    break;
                                }
                            }
                            changed = deadline_rx.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    None => {
                        if deadline_rx.changed().await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self { deadline_tx }
    }
}

#[async_trait]
impl ExpiryTimer for TokioTimer {
    async fn arm(&self, at: DateTime<Utc>) -> HostResult<()> {
        self.deadline_tx
            .send(Some(at))
            .map_err(|_| HostError::TimerFailed("timer task has exited".into()))
    }

    async fn cancel(&self) -> HostResult<()> {
        self.deadline_tx
            .send(None)
            .map_err(|_| HostError::TimerFailed("timer task has exited".into()))
    }
}
