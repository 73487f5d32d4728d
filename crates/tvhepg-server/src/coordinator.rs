//! Refresh coordinator.
//!
//! One coordinator per configured server. It owns the only path that talks
//! to the server in steady state:
//!
//! ```text
//! tick / force ──► guard ──► EpgSource::fetch_epg ──► EpgStorage::save ──► publish
//!                                   │                        │
//!                                   └──── classify failure ◄─┘
//! ```
//!
//! Refreshes never overlap. A caller that arrives while a refresh is in
//! flight waits for it and receives its outcome instead of fetching again.
//! The published state keeps the last good snapshot and the last failure in
//! separate fields, so a failed refresh never hides data readers already had.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use tvhepg_api::{ApiError, ApiErrorKind, DEFAULT_EPG_LIMIT, EpgSource};
use tvhepg_core::EpgSnapshot;

use crate::error::{ServerError, ServerResult};
use crate::storage::EpgStorage;

/// Why a refresh failed, coarse enough to show to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The server rejected the credentials.
    AuthenticationFailed,
    /// The server could not be reached or timed out.
    CannotConnect,
    /// The server answered with an error status.
    HttpError,
    /// Anything else. Details are only logged.
    Unexpected,
}

impl FailureReason {
    /// Maps a client error kind to a failure reason.
    pub fn from_api_kind(kind: ApiErrorKind) -> Self {
        match kind {
            ApiErrorKind::Authentication => Self::AuthenticationFailed,
            ApiErrorKind::Connection => Self::CannotConnect,
            ApiErrorKind::Request => Self::HttpError,
            ApiErrorKind::InvalidResponse | ApiErrorKind::Configuration => Self::Unexpected,
        }
    }

    /// Human-readable reason.
    pub fn message(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication failed",
            Self::CannotConnect => "cannot connect",
            Self::HttpError => "HTTP error",
            Self::Unexpected => "unexpected error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A failed refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshFailure {
    /// Coarse reason.
    pub reason: FailureReason,
    /// Detail safe to show to users.
    pub detail: String,
    /// When the attempt failed.
    pub at: DateTime<Utc>,
}

impl RefreshFailure {
    /// Creates a failure stamped with the current time.
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
            at: Utc::now(),
        }
    }

    /// An unexpected failure. The detail is replaced by the generic reason.
    pub fn unexpected() -> Self {
        Self::new(FailureReason::Unexpected, FailureReason::Unexpected.message())
    }
}

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail == self.reason.message() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "{}: {}", self.reason, self.detail)
        }
    }
}

/// Result of one refresh attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The guide was fetched, saved and published.
    Success(EpgSnapshot),
    /// The attempt failed; the previous snapshot is still published.
    Failure(RefreshFailure),
}

impl RefreshOutcome {
    /// Returns true for a successful refresh.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The new snapshot, on success.
    pub fn snapshot(&self) -> Option<&EpgSnapshot> {
        match self {
            Self::Success(snapshot) => Some(snapshot),
            Self::Failure(_) => None,
        }
    }

    /// The failure, on failure.
    pub fn failure(&self) -> Option<&RefreshFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

/// What a coordinator currently publishes to readers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishedState {
    /// Last successfully fetched snapshot. Survives later failures.
    pub last_success: Option<EpgSnapshot>,
    /// Failure of the most recent attempt; cleared by the next success.
    pub last_error: Option<RefreshFailure>,
    /// Whether a refresh is currently running.
    pub refreshing: bool,
    /// Number of completed refresh attempts.
    pub attempts: u64,
}

impl PublishedState {
    /// Returns true if the most recent attempt succeeded.
    pub fn last_update_success(&self) -> bool {
        self.last_success.is_some() && self.last_error.is_none()
    }
}

/// Serializes refreshes for one server and publishes their results.
pub struct RefreshCoordinator {
    id: String,
    source: Arc<dyn EpgSource>,
    storage: Arc<dyn EpgStorage>,
    epg_limit: usize,
    /// Held for the whole refresh; stores the outcome of the latest one.
    guard: Mutex<Option<RefreshOutcome>>,
    /// Bumped every time a refresh finishes.
    completed: AtomicU64,
    state: watch::Sender<PublishedState>,
}

impl RefreshCoordinator {
    /// Creates a coordinator for the server identified by `id`.
    pub fn new(
        id: impl Into<String>,
        source: Arc<dyn EpgSource>,
        storage: Arc<dyn EpgStorage>,
    ) -> Self {
        let (state, _) = watch::channel(PublishedState::default());
        Self {
            id: id.into(),
            source,
            storage,
            epg_limit: DEFAULT_EPG_LIMIT,
            guard: Mutex::new(None),
            completed: AtomicU64::new(0),
            state,
        }
    }

    /// Sets the number of guide entries requested per refresh.
    pub fn with_epg_limit(mut self, limit: usize) -> Self {
        self.epg_limit = limit;
        self
    }

    /// Identifier of the server this coordinator refreshes.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The source the coordinator fetches from.
    pub fn source(&self) -> &Arc<dyn EpgSource> {
        &self.source
    }

    /// Returns a copy of the published state.
    pub fn state(&self) -> PublishedState {
        self.state.borrow().clone()
    }

    /// Subscribes to published state changes.
    pub fn subscribe(&self) -> watch::Receiver<PublishedState> {
        self.state.subscribe()
    }

    /// Last successfully fetched snapshot.
    pub fn last_success(&self) -> Option<EpgSnapshot> {
        self.state.borrow().last_success.clone()
    }

    /// Failure of the most recent attempt, if it failed.
    pub fn last_error(&self) -> Option<RefreshFailure> {
        self.state.borrow().last_error.clone()
    }

    /// Runs a refresh, or joins the one already in flight.
    pub async fn refresh(&self) -> RefreshOutcome {
        let seen = self.completed.load(Ordering::Acquire);
        let mut last = self.guard.lock().await;

        if self.completed.load(Ordering::Acquire) != seen
            && let Some(outcome) = last.as_ref()
        {
            debug!(server = %self.id, "Joined a refresh that finished while waiting");
            return outcome.clone();
        }

        self.refresh_locked(&mut last).await
    }

    /// Runs a refresh unless one is already in flight.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::RefreshInProgress`] if the guard is held.
    pub async fn try_refresh(&self) -> ServerResult<RefreshOutcome> {
        let mut last = self
            .guard
            .try_lock()
            .map_err(|_| ServerError::refresh_in_progress(&self.id))?;
        Ok(self.refresh_locked(&mut last).await)
    }

    /// Refresh requested from outside the periodic schedule.
    ///
    /// Goes through the same guard as timer ticks and leaves the timer alone.
    pub async fn force_refresh(&self) -> RefreshOutcome {
        info!(server = %self.id, "Forced EPG refresh requested");
        self.refresh().await
    }

    /// Initial refresh that must succeed before the server is considered ready.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::NotReady`] with the failure if the refresh failed.
    pub async fn first_refresh(&self) -> ServerResult<EpgSnapshot> {
        match self.refresh().await {
            RefreshOutcome::Success(snapshot) => Ok(snapshot),
            RefreshOutcome::Failure(failure) => Err(ServerError::not_ready(&self.id, failure)),
        }
    }

    /// Publishes the persisted snapshot if nothing has been fetched yet.
    ///
    /// Returns the loaded snapshot, whether or not it was published.
    pub async fn restore(&self) -> ServerResult<Option<EpgSnapshot>> {
        let loaded = self.storage.load().await?;

        if let Some(snapshot) = &loaded {
            let published = self.state.send_if_modified(|state| {
                if state.last_success.is_some() {
                    return false;
                }
                state.last_success = Some(snapshot.clone());
                true
            });
            if published {
                info!(
                    server = %self.id,
                    events = snapshot.len(),
                    fetched_at = %snapshot.fetched_at(),
                    "Restored persisted EPG snapshot"
                );
            }
        }

        Ok(loaded)
    }

    async fn refresh_locked(&self, last: &mut Option<RefreshOutcome>) -> RefreshOutcome {
        let _refreshing = RefreshingFlag::raise(&self.state);
        debug!(server = %self.id, limit = self.epg_limit, "Fetching EPG");

        let result = match AssertUnwindSafe(self.fetch_and_store()).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!(server = %self.id, "EPG refresh panicked");
                Err(RefreshFailure::unexpected())
            }
        };

        let outcome = match result {
            Ok(snapshot) => {
                info!(server = %self.id, events = snapshot.len(), "EPG refresh succeeded");
                self.state.send_modify(|state| {
                    state.last_success = Some(snapshot.clone());
                    state.last_error = None;
                    state.refreshing = false;
                    state.attempts += 1;
                });
                RefreshOutcome::Success(snapshot)
            }
            Err(failure) => {
                self.state.send_modify(|state| {
                    state.last_error = Some(failure.clone());
                    state.refreshing = false;
                    state.attempts += 1;
                });
                RefreshOutcome::Failure(failure)
            }
        };

        *last = Some(outcome.clone());
        self.completed.fetch_add(1, Ordering::Release);
        outcome
    }

    async fn fetch_and_store(&self) -> Result<EpgSnapshot, RefreshFailure> {
        let events = self
            .source
            .fetch_epg(self.epg_limit)
            .await
            .map_err(|e| self.classify(e))?;
        let snapshot = EpgSnapshot::new(events);

        if let Err(e) = self.storage.save(&snapshot).await {
            error!(server = %self.id, error = %e, "Failed to persist EPG snapshot");
            return Err(RefreshFailure::unexpected());
        }

        Ok(snapshot)
    }

    fn classify(&self, err: ApiError) -> RefreshFailure {
        let reason = FailureReason::from_api_kind(err.kind());
        if reason == FailureReason::Unexpected {
            error!(server = %self.id, error = ?err, "EPG update failed unexpectedly");
            return RefreshFailure::unexpected();
        }

        warn!(server = %self.id, reason = %reason, error = %err, "EPG update failed");
        RefreshFailure::new(reason, err.message())
    }
}

/// Publishes `refreshing = true` while alive. Clears it on drop, including
/// when the refresh future is dropped mid-fetch.
struct RefreshingFlag<'a> {
    state: &'a watch::Sender<PublishedState>,
}

impl<'a> RefreshingFlag<'a> {
    fn raise(state: &'a watch::Sender<PublishedState>) -> Self {
        state.send_modify(|state| state.refreshing = true);
        Self { state }
    }
}

impl Drop for RefreshingFlag<'_> {
    fn drop(&mut self) {
        self.state
            .send_if_modified(|state| std::mem::replace(&mut state.refreshing, false));
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("id", &self.id)
            .field("source", &self.source.name())
            .field("epg_limit", &self.epg_limit)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use serde_json::{Map, Value, json};
    use tokio::sync::Notify;
    use tvhepg_api::{ApiResult, BoxFuture};
    use tvhepg_core::EpgEvent;

    use crate::storage::{MemoryStorage, StorageError, StorageResult};

    /// Scripted source: pops one prepared response per fetch.
    #[derive(Default)]
    pub(crate) struct ScriptedSource {
        responses: std::sync::Mutex<VecDeque<ApiResult<Vec<EpgEvent>>>>,
        fetches: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedSource {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Every fetch waits on `gate` before answering.
        pub(crate) fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::default()
            }
        }

        pub(crate) fn push_events(&self, titles: &[&str]) {
            let events = titles
                .iter()
                .map(|t| serde_json::from_value(json!({"title": t})).unwrap())
                .collect();
            self.responses.lock().unwrap().push_back(Ok(events));
        }

        pub(crate) fn push_error(&self, err: ApiError) {
            self.responses.lock().unwrap().push_back(Err(err));
        }

        pub(crate) fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        pub(crate) fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    impl EpgSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch_epg(&self, _limit: usize) -> BoxFuture<'_, ApiResult<Vec<EpgEvent>>> {
            Box::pin(async move {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);

                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }

                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                self.responses
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| Ok(Vec::new()))
            })
        }

        fn server_info(&self) -> BoxFuture<'_, ApiResult<Map<String, Value>>> {
            Box::pin(async { Ok(Map::new()) })
        }
    }

    struct FailingStorage;

    impl EpgStorage for FailingStorage {
        fn save<'a>(&'a self, _snapshot: &'a EpgSnapshot) -> BoxFuture<'a, StorageResult<()>> {
            Box::pin(async {
                Err(StorageError::Io {
                    path: "/readonly/tvh.json".into(),
                    source: std::io::Error::other("read-only file system"),
                })
            })
        }

        fn load(&self) -> BoxFuture<'_, StorageResult<Option<EpgSnapshot>>> {
            Box::pin(async { Ok(None) })
        }
    }

    struct PanickingSource;

    fn broken_decoder() -> ApiResult<Vec<EpgEvent>> {
        panic!("decoder bug")
    }

    impl EpgSource for PanickingSource {
        fn name(&self) -> &str {
            "panicking"
        }

        fn fetch_epg(&self, _limit: usize) -> BoxFuture<'_, ApiResult<Vec<EpgEvent>>> {
            Box::pin(async { broken_decoder() })
        }

        fn server_info(&self) -> BoxFuture<'_, ApiResult<Map<String, Value>>> {
            Box::pin(async { Ok(Map::new()) })
        }
    }

    fn coordinator(source: Arc<ScriptedSource>) -> (RefreshCoordinator, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let coordinator = RefreshCoordinator::new("tvh", source, storage.clone());
        (coordinator, storage)
    }

    fn titles(snapshot: &EpgSnapshot) -> Vec<&str> {
        snapshot.iter().filter_map(EpgEvent::title).collect()
    }

    #[test]
    fn failure_reason_mapping() {
        assert_eq!(
            FailureReason::from_api_kind(ApiErrorKind::Authentication),
            FailureReason::AuthenticationFailed
        );
        assert_eq!(
            FailureReason::from_api_kind(ApiErrorKind::Connection),
            FailureReason::CannotConnect
        );
        assert_eq!(
            FailureReason::from_api_kind(ApiErrorKind::Request),
            FailureReason::HttpError
        );
        assert_eq!(
            FailureReason::from_api_kind(ApiErrorKind::InvalidResponse),
            FailureReason::Unexpected
        );
        assert_eq!(FailureReason::HttpError.to_string(), "HTTP error");
    }

    #[test]
    fn failure_display() {
        let failure = RefreshFailure::new(FailureReason::CannotConnect, "connection timed out");
        assert_eq!(failure.to_string(), "cannot connect: connection timed out");
        assert_eq!(RefreshFailure::unexpected().to_string(), "unexpected error");
    }

    #[tokio::test]
    async fn success_saves_then_publishes() {
        let source = Arc::new(ScriptedSource::new());
        source.push_events(&["News", "Weather"]);
        let (coordinator, storage) = coordinator(source.clone());

        let outcome = coordinator.refresh().await;

        let snapshot = outcome.snapshot().unwrap();
        assert_eq!(titles(snapshot), vec!["News", "Weather"]);
        assert_eq!(storage.save_count(), 1);
        assert_eq!(storage.load().await.unwrap().as_ref(), Some(snapshot));

        let state = coordinator.state();
        assert_eq!(state.last_success.as_ref(), Some(snapshot));
        assert!(state.last_error.is_none());
        assert!(!state.refreshing);
        assert_eq!(state.attempts, 1);
        assert!(state.last_update_success());
    }

    #[tokio::test]
    async fn failure_keeps_last_known_good_snapshot() {
        let source = Arc::new(ScriptedSource::new());
        source.push_events(&["News"]);
        source.push_error(ApiError::authentication("invalid username or password"));
        let (coordinator, storage) = coordinator(source.clone());

        let first = coordinator.refresh().await;
        let second = coordinator.refresh().await;

        let failure = second.failure().unwrap();
        assert_eq!(failure.reason, FailureReason::AuthenticationFailed);
        assert!(failure.to_string().contains("authentication"));

        let state = coordinator.state();
        assert_eq!(state.last_success.as_ref(), first.snapshot());
        assert_eq!(state.last_error.as_ref(), Some(failure));
        assert!(!state.last_update_success());
        assert_eq!(storage.save_count(), 1);
    }

    #[tokio::test]
    async fn each_error_kind_maps_to_its_reason() {
        let cases = [
            (ApiError::timeout(), FailureReason::CannotConnect),
            (ApiError::request(500, "boom"), FailureReason::HttpError),
            (ApiError::invalid_response("garbage"), FailureReason::Unexpected),
        ];

        for (err, expected) in cases {
            let source = Arc::new(ScriptedSource::new());
            source.push_error(err);
            let (coordinator, _) = coordinator(source);

            let outcome = coordinator.refresh().await;
            assert_eq!(outcome.failure().unwrap().reason, expected);
        }
    }

    #[tokio::test]
    async fn unexpected_failure_hides_detail() {
        let source = Arc::new(ScriptedSource::new());
        source.push_error(ApiError::invalid_response("secret internal payload"));
        let (coordinator, _) = coordinator(source);

        let failure = coordinator.refresh().await.failure().cloned().unwrap();
        assert_eq!(failure.reason, FailureReason::Unexpected);
        assert!(!failure.detail.contains("secret"));
    }

    #[tokio::test]
    async fn success_clears_previous_error() {
        let source = Arc::new(ScriptedSource::new());
        source.push_error(ApiError::timeout());
        source.push_events(&["Back"]);
        let (coordinator, _) = coordinator(source);

        assert!(!coordinator.refresh().await.is_success());
        assert!(coordinator.last_error().is_some());
        assert!(coordinator.last_success().is_none());

        assert!(coordinator.refresh().await.is_success());
        assert!(coordinator.last_error().is_none());
        assert_eq!(coordinator.state().attempts, 2);
    }

    #[tokio::test]
    async fn storage_failure_fails_the_refresh() {
        let source = Arc::new(ScriptedSource::new());
        source.push_events(&["News"]);
        let coordinator = RefreshCoordinator::new("tvh", source, Arc::new(FailingStorage));

        let outcome = coordinator.refresh().await;

        assert_eq!(outcome.failure().unwrap().reason, FailureReason::Unexpected);
        assert!(coordinator.last_success().is_none());
    }

    #[tokio::test]
    async fn panicking_source_is_contained() {
        let coordinator = RefreshCoordinator::new(
            "tvh",
            Arc::new(PanickingSource),
            Arc::new(MemoryStorage::new()),
        );

        let outcome = coordinator.refresh().await;
        assert_eq!(outcome.failure().unwrap().reason, FailureReason::Unexpected);
        assert!(!coordinator.state().refreshing);

        // The guard is still usable afterwards.
        assert!(coordinator.try_refresh().await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(ScriptedSource::gated(gate.clone()));
        source.push_events(&["Only once"]);
        let (coordinator, _) = coordinator(source.clone());
        let coordinator = Arc::new(coordinator);

        let first = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        while source.fetches() == 0 {
            tokio::task::yield_now().await;
        }

        let second = tokio::spawn({
            let c = coordinator.clone();
            async move { c.force_refresh().await }
        });
        // Let the second caller queue on the guard.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(coordinator.state().refreshing);

        gate.notify_one();
        let first = first.await.unwrap();
        let second = second.await.unwrap();

        assert_eq!(source.fetches(), 1);
        assert_eq!(source.max_in_flight(), 1);
        assert_eq!(first, second);
        assert_eq!(titles(first.snapshot().unwrap()), vec!["Only once"]);
    }

    #[tokio::test]
    async fn try_refresh_rejects_while_running() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(ScriptedSource::gated(gate.clone()));
        let (coordinator, _) = coordinator(source.clone());
        let coordinator = Arc::new(coordinator);

        let running = tokio::spawn({
            let c = coordinator.clone();
            async move { c.refresh().await }
        });
        while source.fetches() == 0 {
            tokio::task::yield_now().await;
        }

        let err = coordinator.try_refresh().await.unwrap_err();
        assert!(matches!(err, ServerError::RefreshInProgress { .. }));

        gate.notify_one();
        running.await.unwrap();
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test]
    async fn abandoned_refresh_clears_refreshing_flag() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(ScriptedSource::gated(gate.clone()));
        let (coordinator, _) = coordinator(source.clone());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), coordinator.refresh()).await;
        assert!(abandoned.is_err());
        assert_eq!(source.fetches(), 1);

        let state = coordinator.state();
        assert!(!state.refreshing);
        assert_eq!(state.attempts, 0);
        assert!(state.last_error.is_none());

        source.push_events(&["After timeout"]);
        gate.notify_one();
        let outcome = coordinator.try_refresh().await.unwrap();
        assert_eq!(titles(outcome.snapshot().unwrap()), vec!["After timeout"]);
        assert_eq!(source.fetches(), 2);
        assert!(!coordinator.state().refreshing);
    }

    #[tokio::test]
    async fn sequential_refreshes_fetch_each_time() {
        let source = Arc::new(ScriptedSource::new());
        let (coordinator, _) = coordinator(source.clone());

        coordinator.refresh().await;
        coordinator.refresh().await;
        coordinator.force_refresh().await;

        assert_eq!(source.fetches(), 3);
    }

    #[tokio::test]
    async fn first_refresh_reports_not_ready() {
        let source = Arc::new(ScriptedSource::new());
        source.push_error(ApiError::timeout());
        let (coordinator, _) = coordinator(source);

        let err = coordinator.first_refresh().await.unwrap_err();
        match err {
            ServerError::NotReady { server, failure } => {
                assert_eq!(server, "tvh");
                assert_eq!(failure.reason, FailureReason::CannotConnect);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn restore_publishes_only_when_empty() {
        let source = Arc::new(ScriptedSource::new());
        source.push_events(&["Fresh"]);
        let storage = Arc::new(MemoryStorage::new());
        let persisted = EpgSnapshot::new(vec![
            serde_json::from_value(json!({"title": "Persisted"})).unwrap(),
        ]);
        storage.save(&persisted).await.unwrap();

        let coordinator = RefreshCoordinator::new("tvh", source, storage);
        let restored = coordinator.restore().await.unwrap();
        assert_eq!(restored.as_ref(), Some(&persisted));
        assert_eq!(coordinator.last_success(), Some(persisted.clone()));

        coordinator.refresh().await;
        coordinator.restore().await.unwrap();
        assert_eq!(titles(&coordinator.last_success().unwrap()), vec!["Fresh"]);
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let source = Arc::new(ScriptedSource::new());
        source.push_events(&["News"]);
        let (coordinator, _) = coordinator(source);
        let mut rx = coordinator.subscribe();

        coordinator.refresh().await;

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert!(state.last_success.is_some());
    }
}
