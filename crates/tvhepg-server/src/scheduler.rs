//! Periodic refresh scheduling.
//!
//! The scheduler only decides *when* to refresh; everything else is the
//! coordinator's job. Ticks run on a fixed grid anchored at start-up, so a
//! forced refresh in between neither adds nor moves a scheduled tick.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::coordinator::{RefreshCoordinator, RefreshOutcome};

/// Default time between scheduled refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Shortest interval the scheduler accepts.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between scheduled refreshes.
    pub refresh_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl SchedulerConfig {
    /// Creates a config with the given interval.
    pub fn new(refresh_interval: Duration) -> Self {
        Self { refresh_interval }
    }

    fn period(&self) -> Duration {
        self.refresh_interval.max(MIN_REFRESH_INTERVAL)
    }
}

/// Drives a coordinator on a fixed interval.
#[derive(Debug)]
pub struct RefreshScheduler {
    coordinator: Arc<RefreshCoordinator>,
    config: SchedulerConfig,
}

impl RefreshScheduler {
    /// Creates a scheduler for `coordinator`.
    pub fn new(coordinator: Arc<RefreshCoordinator>, config: SchedulerConfig) -> Self {
        Self {
            coordinator,
            config,
        }
    }

    /// The coordinator this scheduler drives.
    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Runs until `shutdown` completes.
    ///
    /// The first tick fires one interval after start; callers do the initial
    /// refresh themselves through [`RefreshCoordinator::first_refresh`]. A
    /// refresh that is already running when shutdown fires is allowed to
    /// finish.
    pub async fn run_until<S>(self, shutdown: S)
    where
        S: Future,
    {
        let period = self.config.period();
        let server = self.coordinator.id().to_string();
        info!(server = %server, interval_secs = period.as_secs(), "Scheduler started");

        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(server = %server, "Scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    debug!(server = %server, "Scheduled refresh");
                    if let RefreshOutcome::Failure(failure) = self.coordinator.refresh().await {
                        debug!(server = %server, %failure, "Scheduled refresh failed");
                    }
                }
            }
        }
    }

    /// Spawns [`run_until`](Self::run_until) on the current runtime.
    pub fn spawn<S>(self, shutdown: S) -> JoinHandle<()>
    where
        S: Future + Send + 'static,
        S::Output: Send,
    {
        tokio::spawn(self.run_until(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::tests::ScriptedSource;
    use crate::storage::MemoryStorage;
    use tokio::sync::oneshot;

    fn scheduled(
        interval: Duration,
    ) -> (Arc<ScriptedSource>, Arc<RefreshCoordinator>, RefreshScheduler) {
        let source = Arc::new(ScriptedSource::new());
        let coordinator = Arc::new(RefreshCoordinator::new(
            "tvh",
            source.clone(),
            Arc::new(MemoryStorage::new()),
        ));
        let scheduler = RefreshScheduler::new(coordinator.clone(), SchedulerConfig::new(interval));
        (source, coordinator, scheduler)
    }

    #[test]
    fn config_default() {
        assert_eq!(
            SchedulerConfig::default().refresh_interval,
            Duration::from_secs(900)
        );
    }

    #[test]
    fn zero_interval_is_clamped() {
        let config = SchedulerConfig::new(Duration::ZERO);
        assert_eq!(config.period(), MIN_REFRESH_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_on_interval() {
        let (source, _, scheduler) = scheduled(Duration::from_secs(60));
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = scheduler.spawn(stop_rx);

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.fetches(), 0);

        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(source.fetches(), 1);

        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(source.fetches(), 3);

        stop_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn forced_refresh_does_not_move_schedule() {
        let (source, coordinator, scheduler) = scheduled(Duration::from_secs(60));
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = scheduler.spawn(stop_rx);

        time::sleep(Duration::from_secs(61)).await;
        assert_eq!(source.fetches(), 1);

        // Halfway to the next tick.
        time::sleep(Duration::from_secs(29)).await;
        assert!(coordinator.force_refresh().await.is_success());
        assert_eq!(source.fetches(), 2);

        // The tick at 120s still fires on time, and only once.
        time::sleep(Duration::from_secs(29)).await;
        assert_eq!(source.fetches(), 2);
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(source.fetches(), 3);

        stop_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_shutdown() {
        let (source, _, scheduler) = scheduled(Duration::from_secs(60));
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = scheduler.spawn(stop_rx);

        stop_tx.send(()).unwrap();
        task.await.unwrap();

        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(source.fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_signal_handler_shutdown() {
        let (source, _, scheduler) = scheduled(Duration::from_secs(60));
        let signals = crate::signals::SignalHandler::new();
        let task = scheduler.spawn(signals.shutdown().wait());

        time::sleep(Duration::from_secs(61)).await;
        assert_eq!(source.fetches(), 1);

        signals.trigger_shutdown();
        task.await.unwrap();

        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(source.fetches(), 1);
    }
}
