//! Kiosk/nurse view switching and the background queue poller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::dashboard::{QueueDashboard, QueueSnapshot};
use crate::gate::{AccessGate, GateError, SessionSource};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Kiosk,
    Nurse,
}

/// Owns which view is visible and the gate in front of the nurse view.
pub struct ViewRouter {
    active: Mutex<View>,
    gate: AccessGate,
    dashboard: Arc<QueueDashboard>,
}

impl ViewRouter {
    pub fn new(dashboard: Arc<QueueDashboard>, gate: AccessGate) -> Self {
        Self {
            active: Mutex::new(View::Kiosk),
            gate,
            dashboard,
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, View> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn active(&self) -> View {
        *self.lock_active()
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn dashboard(&self) -> &Arc<QueueDashboard> {
        &self.dashboard
    }

    /// Show `view`. Opening the nurse view refreshes the queue at once.
    pub async fn switch_to(&self, view: View) -> Option<QueueSnapshot> {
        *self.lock_active() = view;
        tracing::debug!(?view, "View switched");
        match view {
            View::Nurse => Some(self.dashboard.refresh().await),
            View::Kiosk => None,
        }
    }

    /// Background refresh only runs for a visible, unlocked dashboard.
    pub fn should_poll(&self) -> bool {
        self.active() == View::Nurse && self.gate.is_open()
    }

    /// One poller tick.
    pub async fn poll_tick(&self) -> Option<QueueSnapshot> {
        if !self.should_poll() {
            return None;
        }
        Some(self.dashboard.refresh().await)
    }

    /// PIN unlock; reveals and refreshes the dashboard.
    pub async fn unlock_with_pin(&self, pin: &str) -> Result<QueueSnapshot, GateError> {
        self.gate.unlock_with_pin(pin)?;
        Ok(self.dashboard.refresh().await)
    }

    /// Page-load session check. A logged-in session reveals and refreshes the
    /// dashboard.
    pub async fn restore_session(
        &self,
        source: &dyn SessionSource,
    ) -> Result<Option<QueueSnapshot>, GateError> {
        if self.gate.check_session(source).await? {
            Ok(Some(self.dashboard.refresh().await))
        } else {
            Ok(None)
        }
    }
}

/// Handle to the periodic queue refresh task. Dropping it stops the task.
pub struct QueuePoller {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl QueuePoller {
    /// Tick every `period`, starting one period from now.
    pub fn start(router: Arc<ViewRouter>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(period_ms = period.as_millis() as u64, "Queue poller started");

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        router.poll_tick().await;
                    }
                }
            }

            tracing::info!("Queue poller stopped");
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the task to stop and wait for it to finish.
    pub async fn stop(&mut self) {
        self.signal_stop();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Queue poller task ended abnormally");
            }
        }
    }

    fn signal_stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for QueuePoller {
    fn drop(&mut self) {
        self.signal_stop();
    }
}
