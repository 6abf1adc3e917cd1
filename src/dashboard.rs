//! Nurse queue dashboard: metrics, ordered list, detail panel.
//!
//! `refresh()` may be called from the poller and from a manual refresh at
//! the same time. Every call takes a ticket before fetching; a result is
//! rendered only if no later-started refresh has rendered already, so an
//! old response can never overwrite a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;

use crate::models::PatientRecord;
use crate::store::{order_queue, ClearOutcome, QueueRepository};
use crate::text::shorten;
use crate::triage::{EsiBadge, NO_ANALYSIS};

pub const EMPTY_QUEUE_TEXT: &str = "No patients in queue.";
pub const UNAVAILABLE_QUEUE_TEXT: &str = "Unable to load queue.";
pub const DETAIL_PLACEHOLDER_TEXT: &str = "Click a patient in the queue to view details here.";
pub const QUEUE_CLEARED_TEXT: &str = "Queue cleared.";

const PREVIEW_CHARS: usize = 42;

// ═══════════════════════════════════════════
// Render model
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueMetrics {
    pub total: usize,
    /// Records at ESI 1 or 2.
    pub critical: usize,
}

impl QueueMetrics {
    pub fn from_records(records: &[PatientRecord]) -> Self {
        Self {
            total: records.len(),
            critical: records.iter().filter(|r| r.esi.is_critical()).count(),
        }
    }
}

/// One clickable row of the queue list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueItem {
    pub id: String,
    pub badge: EsiBadge,
    pub name: String,
    /// `29 yrs • ACTIVE • 10:01:02`
    pub subline: String,
    pub preview: String,
    pub active: bool,
}

impl QueueItem {
    fn from_record(record: &PatientRecord) -> Self {
        let mut parts = Vec::with_capacity(3);
        if !record.age.is_empty() {
            parts.push(format!("{} yrs", record.age));
        }
        parts.push(record.status.queue_label().to_string());
        if !record.time.is_empty() {
            parts.push(record.time.clone());
        }

        Self {
            id: record.id.clone(),
            badge: EsiBadge::for_level(record.esi),
            name: display_name(&record.name),
            subline: parts.join(" • "),
            preview: shorten(&record.complaint, PREVIEW_CHARS),
            active: record.is_active(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "items", rename_all = "snake_case")]
pub enum QueueList {
    Items(Vec<QueueItem>),
    Empty,
    Unavailable,
}

impl QueueList {
    /// Placeholder shown instead of rows, if any.
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Items(_) => None,
            Self::Empty => Some(EMPTY_QUEUE_TEXT),
            Self::Unavailable => Some(UNAVAILABLE_QUEUE_TEXT),
        }
    }

    pub fn items(&self) -> &[QueueItem] {
        match self {
            Self::Items(items) => items,
            _ => &[],
        }
    }
}

/// Whether the detail panel offers "mark resolved".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveAction {
    Available,
    AlreadyResolved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientDetail {
    pub id: String,
    pub name: String,
    pub age: String,
    pub sex: String,
    pub time: String,
    pub esi: String,
    pub status: &'static str,
    pub vitals: String,
    pub complaint: String,
    pub analysis: String,
    pub action: ResolveAction,
}

impl PatientDetail {
    pub fn from_record(record: &PatientRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: display_name(&record.name),
            age: if record.age.is_empty() {
                "-".to_string()
            } else {
                record.age.clone()
            },
            sex: record.sex.clone(),
            time: record.time.clone(),
            esi: format!("ESI {}", record.esi),
            status: record.status.as_str(),
            vitals: record
                .vitals
                .display_text()
                .unwrap_or_else(|| "Not provided".to_string()),
            complaint: record.complaint.clone(),
            analysis: record
                .analysis
                .clone()
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| NO_ANALYSIS.to_string()),
            action: if record.is_active() {
                ResolveAction::Available
            } else {
                ResolveAction::AlreadyResolved
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum DetailPanel {
    Placeholder(&'static str),
    Patient(PatientDetail),
}

impl Default for DetailPanel {
    fn default() -> Self {
        Self::Placeholder(DETAIL_PLACEHOLDER_TEXT)
    }
}

/// What the dashboard currently shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueSnapshot {
    pub metrics: QueueMetrics,
    pub list: QueueList,
    pub detail: DetailPanel,
}

impl Default for QueueSnapshot {
    fn default() -> Self {
        Self {
            metrics: QueueMetrics::default(),
            list: QueueList::Empty,
            detail: DetailPanel::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearResult {
    /// No confirmation given; nothing happened.
    Cancelled,
    Cleared,
    /// The store cannot clear; informational message for the user.
    Info(&'static str),
    /// Failure was logged; the view is unchanged.
    Failed,
}

fn display_name(name: &str) -> String {
    if name.trim().is_empty() {
        "Unknown".to_string()
    } else {
        name.to_string()
    }
}

// ═══════════════════════════════════════════
// Controller
// ═══════════════════════════════════════════

struct DashboardState {
    snapshot: QueueSnapshot,
    /// Ordered copies from the last successful fetch, for selection.
    records: Vec<PatientRecord>,
    rendered_ticket: u64,
}

pub struct QueueDashboard {
    repo: Arc<dyn QueueRepository>,
    state: Mutex<DashboardState>,
    next_ticket: AtomicU64,
    published: watch::Sender<QueueSnapshot>,
}

impl QueueDashboard {
    pub fn new(repo: Arc<dyn QueueRepository>) -> Self {
        let (published, _) = watch::channel(QueueSnapshot::default());
        Self {
            repo,
            state: Mutex::new(DashboardState {
                snapshot: QueueSnapshot::default(),
                records: Vec::new(),
                rendered_ticket: 0,
            }),
            next_ticket: AtomicU64::new(0),
            published,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current render.
    pub fn snapshot(&self) -> QueueSnapshot {
        self.lock_state().snapshot.clone()
    }

    /// Receive every render as it happens.
    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.published.subscribe()
    }

    /// Callers hold the state lock, so subscribers see renders in the same
    /// order as `snapshot()`.
    fn publish(&self, snapshot: &QueueSnapshot) {
        self.published.send_replace(snapshot.clone());
    }

    /// Re-read the queue and replace the render.
    pub async fn refresh(&self) -> QueueSnapshot {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let fetched = self.repo.list().await;

        let mut state = self.lock_state();
        if ticket < state.rendered_ticket {
            tracing::debug!(ticket, rendered = state.rendered_ticket, "Dropping stale queue refresh");
            return state.snapshot.clone();
        }
        state.rendered_ticket = ticket;

        match fetched {
            Ok(records) => {
                let records = order_queue(records);
                state.snapshot.metrics = QueueMetrics::from_records(&records);
                state.snapshot.list = if records.is_empty() {
                    QueueList::Empty
                } else {
                    QueueList::Items(records.iter().map(QueueItem::from_record).collect())
                };
                tracing::debug!(
                    total = state.snapshot.metrics.total,
                    critical = state.snapshot.metrics.critical,
                    "Queue refreshed"
                );
                state.records = records;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Queue refresh failed");
                state.snapshot.metrics = QueueMetrics::default();
                state.snapshot.list = QueueList::Unavailable;
                state.records.clear();
            }
        }

        let snapshot = state.snapshot.clone();
        self.publish(&snapshot);
        drop(state);
        snapshot
    }

    /// Show a record from the last render in the detail panel.
    pub fn select_record(&self, id: &str) -> Option<PatientDetail> {
        let mut state = self.lock_state();
        let detail = state
            .records
            .iter()
            .find(|r| r.id == id)
            .map(PatientDetail::from_record)?;
        state.snapshot.detail = DetailPanel::Patient(detail.clone());
        let snapshot = state.snapshot.clone();
        self.publish(&snapshot);
        drop(state);
        Some(detail)
    }

    /// Mark a record completed. Failures are logged only.
    pub async fn resolve(&self, id: &str) -> QueueSnapshot {
        match self.repo.resolve(id).await {
            Ok(true) => tracing::info!(id, "Patient resolved"),
            Ok(false) => tracing::warn!(id, "Resolve ignored: unknown patient"),
            Err(e) => tracing::error!(id, error = %e, "Resolve failed"),
        }
        self.refresh().await;
        self.set_detail(DetailPanel::default())
    }

    /// Empty the queue. Requires explicit confirmation.
    pub async fn clear(&self, confirmed: bool) -> ClearResult {
        if !confirmed {
            return ClearResult::Cancelled;
        }

        match self.repo.clear().await {
            Ok(ClearOutcome::Cleared) => {
                self.refresh().await;
                self.set_detail(DetailPanel::Placeholder(QUEUE_CLEARED_TEXT));
                ClearResult::Cleared
            }
            Ok(ClearOutcome::Unsupported(message)) => ClearResult::Info(message),
            Err(e) => {
                tracing::error!(error = %e, "Clear failed");
                ClearResult::Failed
            }
        }
    }

    fn set_detail(&self, detail: DetailPanel) -> QueueSnapshot {
        let mut state = self.lock_state();
        state.snapshot.detail = detail;
        let snapshot = state.snapshot.clone();
        self.publish(&snapshot);
        drop(state);
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EsiLevel, PatientStatus};
    use crate::store::{LocalQueueStore, StoreError, TriageOutcome};
    use crate::triage::Intake;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn intake(name: &str, complaint: &str) -> Intake {
        Intake {
            name: name.into(),
            age: "29".into(),
            sex: "F".into(),
            complaint: complaint.into(),
            vitals: Default::default(),
        }
    }

    async fn seeded() -> (Arc<LocalQueueStore>, QueueDashboard) {
        let store = Arc::new(LocalQueueStore::open_in_memory().unwrap());
        store.append(&intake("Rash", "rash on arm")).await.unwrap();
        store.append(&intake("Arrest", "cardiac arrest")).await.unwrap();
        store.append(&intake("Fever", "high fever")).await.unwrap();
        let dashboard = QueueDashboard::new(store.clone());
        (store, dashboard)
    }

    struct FailingRepo;

    #[async_trait]
    impl QueueRepository for FailingRepo {
        async fn list(&self) -> Result<Vec<PatientRecord>, StoreError> {
            Err(StoreError::Transport("connection reset".into()))
        }
        async fn append(&self, _intake: &Intake) -> Result<TriageOutcome, StoreError> {
            Err(StoreError::Transport("connection reset".into()))
        }
        async fn resolve(&self, _id: &str) -> Result<bool, StoreError> {
            Err(StoreError::Transport("connection reset".into()))
        }
        async fn clear(&self) -> Result<ClearOutcome, StoreError> {
            Err(StoreError::Transport("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn empty_queue_shows_placeholder() {
        let store = Arc::new(LocalQueueStore::open_in_memory().unwrap());
        let snapshot = QueueDashboard::new(store).refresh().await;
        assert_eq!(snapshot.list, QueueList::Empty);
        assert_eq!(snapshot.list.placeholder(), Some("No patients in queue."));
        assert_eq!(snapshot.metrics, QueueMetrics::default());
    }

    #[tokio::test]
    async fn refresh_orders_by_urgency_and_counts_critical() {
        let (_store, dashboard) = seeded().await;
        let snapshot = dashboard.refresh().await;

        let names: Vec<&str> = snapshot.list.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Arrest", "Fever", "Rash"]);
        assert_eq!(snapshot.metrics.total, 3);
        assert_eq!(snapshot.metrics.critical, 1);
        assert_eq!(snapshot.list.items()[0].badge.short_label(), "ESI 1");
        assert!(snapshot.list.items()[0].subline.starts_with("29 yrs • ACTIVE • "));
    }

    #[tokio::test]
    async fn submission_moves_metrics_by_one() {
        let (store, dashboard) = seeded().await;
        let before = dashboard.refresh().await.metrics;

        store.append(&intake("Jane", "rash")).await.unwrap();
        let after = dashboard.refresh().await.metrics;
        assert_eq!(after.total, before.total + 1);
        assert_eq!(after.critical, before.critical);

        store.append(&intake("Joe", "chest pain")).await.unwrap();
        let critical = dashboard.refresh().await.metrics;
        assert_eq!(critical.total, after.total + 1);
        assert_eq!(critical.critical, after.critical + 1);
    }

    #[tokio::test]
    async fn transport_failure_zeroes_metrics() {
        let dashboard = QueueDashboard::new(Arc::new(FailingRepo));
        let snapshot = dashboard.refresh().await;
        assert_eq!(snapshot.list.placeholder(), Some("Unable to load queue."));
        assert_eq!(snapshot.metrics.total.to_string(), "0");
        assert_eq!(snapshot.metrics.critical.to_string(), "0");
    }

    /// Local store that can be switched into failing mode.
    struct FlakyRepo {
        inner: LocalQueueStore,
        down: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl QueueRepository for FlakyRepo {
        async fn list(&self) -> Result<Vec<PatientRecord>, StoreError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::Status { status: 503 });
            }
            self.inner.list().await
        }
        async fn append(&self, intake: &Intake) -> Result<TriageOutcome, StoreError> {
            self.inner.append(intake).await
        }
        async fn resolve(&self, id: &str) -> Result<bool, StoreError> {
            self.inner.resolve(id).await
        }
        async fn clear(&self) -> Result<ClearOutcome, StoreError> {
            self.inner.clear().await
        }
    }

    #[tokio::test]
    async fn failure_after_success_drops_stale_rows() {
        let repo = Arc::new(FlakyRepo {
            inner: LocalQueueStore::open_in_memory().unwrap(),
            down: std::sync::atomic::AtomicBool::new(false),
        });
        repo.append(&intake("Jane", "fever")).await.unwrap();
        let dashboard = QueueDashboard::new(repo.clone());

        let first = dashboard.refresh().await;
        let id = first.list.items()[0].id.clone();
        assert!(dashboard.select_record(&id).is_some());

        repo.down.store(true, Ordering::SeqCst);
        let snapshot = dashboard.refresh().await;
        assert!(snapshot.list.items().is_empty());
        assert_eq!(snapshot.list, QueueList::Unavailable);
        assert_eq!(snapshot.metrics, QueueMetrics::default());
        assert!(dashboard.select_record(&id).is_none());
    }

    #[tokio::test]
    async fn select_then_resolve_resets_detail() {
        let (store, dashboard) = seeded().await;
        let snapshot = dashboard.refresh().await;
        let id = snapshot.list.items()[0].id.clone();

        let detail = dashboard.select_record(&id).unwrap();
        assert_eq!(detail.action, ResolveAction::Available);
        assert_eq!(detail.vitals, "Not provided");
        assert!(matches!(dashboard.snapshot().detail, DetailPanel::Patient(_)));

        let after = dashboard.resolve(&id).await;
        assert_eq!(after.detail, DetailPanel::Placeholder(DETAIL_PLACEHOLDER_TEXT));

        // Completed records sink below active ones.
        let last = after.list.items().last().unwrap();
        assert_eq!(last.id, id);
        assert!(!last.active);
        assert_eq!(
            dashboard.select_record(&id).unwrap().action,
            ResolveAction::AlreadyResolved
        );

        // Resolving twice leaves the record completed.
        dashboard.resolve(&id).await;
        let records = store.list().await.unwrap();
        let record = records.iter().find(|r| r.id == id).unwrap();
        assert_eq!(record.status, PatientStatus::Completed);
    }

    #[tokio::test]
    async fn resolve_failure_is_swallowed() {
        let dashboard = QueueDashboard::new(Arc::new(FailingRepo));
        let snapshot = dashboard.resolve("abc").await;
        assert_eq!(snapshot.list, QueueList::Unavailable);
        assert_eq!(snapshot.detail, DetailPanel::default());
    }

    #[tokio::test]
    async fn clear_needs_confirmation() {
        let (store, dashboard) = seeded().await;
        assert_eq!(dashboard.clear(false).await, ClearResult::Cancelled);
        assert_eq!(store.list().await.unwrap().len(), 3);

        assert_eq!(dashboard.clear(true).await, ClearResult::Cleared);
        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.list.placeholder(), Some(EMPTY_QUEUE_TEXT));
        assert_eq!(snapshot.metrics, QueueMetrics::default());
        assert_eq!(snapshot.detail, DetailPanel::Placeholder(QUEUE_CLEARED_TEXT));
    }

    #[tokio::test]
    async fn clear_failure_is_logged_only() {
        let dashboard = QueueDashboard::new(Arc::new(FailingRepo));
        assert_eq!(dashboard.clear(true).await, ClearResult::Failed);
    }

    #[test]
    fn detail_falls_back_for_missing_fields() {
        let record = PatientRecord {
            id: "1".into(),
            time: String::new(),
            name: " ".into(),
            age: String::new(),
            sex: String::new(),
            vitals: Default::default(),
            complaint: "cough".into(),
            esi: EsiLevel::new(4).unwrap(),
            analysis: None,
            status: PatientStatus::Active,
        };
        let detail = PatientDetail::from_record(&record);
        assert_eq!(detail.name, "Unknown");
        assert_eq!(detail.age, "-");
        assert_eq!(detail.analysis, NO_ANALYSIS);
        assert_eq!(QueueItem::from_record(&record).subline, "ACTIVE");
    }

    /// Holds the first `list` call until released; later calls answer at once.
    struct SlowFirstRepo {
        inner: LocalQueueStore,
        release: Arc<Notify>,
        calls: AtomicU64,
    }

    #[async_trait]
    impl QueueRepository for SlowFirstRepo {
        async fn list(&self) -> Result<Vec<PatientRecord>, StoreError> {
            let snapshot = self.inner.list().await;
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.release.notified().await;
            }
            snapshot
        }
        async fn append(&self, intake: &Intake) -> Result<TriageOutcome, StoreError> {
            self.inner.append(intake).await
        }
        async fn resolve(&self, id: &str) -> Result<bool, StoreError> {
            self.inner.resolve(id).await
        }
        async fn clear(&self) -> Result<ClearOutcome, StoreError> {
            self.inner.clear().await
        }
    }

    #[tokio::test]
    async fn stale_refresh_does_not_overwrite_newer_render() {
        let release = Arc::new(Notify::new());
        let repo = Arc::new(SlowFirstRepo {
            inner: LocalQueueStore::open_in_memory().unwrap(),
            release: release.clone(),
            calls: AtomicU64::new(0),
        });
        let dashboard = Arc::new(QueueDashboard::new(repo.clone()));

        // First refresh reads an empty queue, then stalls.
        let slow = tokio::spawn({
            let dashboard = dashboard.clone();
            async move { dashboard.refresh().await }
        });
        while repo.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        repo.append(&intake("Jane", "chest pain")).await.unwrap();
        let fresh = dashboard.refresh().await;
        assert_eq!(fresh.metrics.total, 1);

        release.notify_one();
        let stale = slow.await.unwrap();
        assert_eq!(stale.metrics.total, 1);
        assert_eq!(dashboard.snapshot().metrics.total, 1);
    }

    #[tokio::test]
    async fn subscribers_see_each_render() {
        let (_store, dashboard) = seeded().await;
        let mut rx = dashboard.subscribe();
        dashboard.refresh().await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().metrics.total, 3);
    }

    /// Every `list` call answers with one more row than the call before.
    struct GrowingRepo {
        calls: AtomicU64,
    }

    #[async_trait]
    impl QueueRepository for GrowingRepo {
        async fn list(&self) -> Result<Vec<PatientRecord>, StoreError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            for _ in 0..(n % 4) {
                tokio::task::yield_now().await;
            }
            Ok((0..n)
                .map(|i| PatientRecord {
                    id: format!("p{i}"),
                    time: String::new(),
                    name: format!("Patient {i}"),
                    age: String::new(),
                    sex: String::new(),
                    vitals: Default::default(),
                    complaint: "cough".into(),
                    esi: EsiLevel::new(4).unwrap(),
                    analysis: None,
                    status: PatientStatus::Active,
                })
                .collect())
        }
        async fn append(&self, _intake: &Intake) -> Result<TriageOutcome, StoreError> {
            Err(StoreError::Transport("read only".into()))
        }
        async fn resolve(&self, _id: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn clear(&self) -> Result<ClearOutcome, StoreError> {
            Ok(ClearOutcome::Cleared)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn published_render_matches_snapshot_under_concurrent_refresh() {
        let dashboard = Arc::new(QueueDashboard::new(Arc::new(GrowingRepo {
            calls: AtomicU64::new(0),
        })));
        let rx = dashboard.subscribe();

        for _ in 0..20 {
            let tasks: Vec<_> = (0..16)
                .map(|_| {
                    let dashboard = dashboard.clone();
                    tokio::spawn(async move { dashboard.refresh().await })
                })
                .collect();
            for task in tasks {
                task.await.unwrap();
            }
            assert_eq!(*rx.borrow(), dashboard.snapshot());
        }
    }
}
