//! Background refresh for the timeline.
//!
//! Two timers run while the scheduler is enabled: a fetch timer that pulls a
//! snapshot and merges it, and a display timer that re-renders relative time
//! labels. Fetch cycles never overlap; a tick that lands while a cycle is in
//! flight is skipped. When the service rejects the session the scheduler
//! suspends itself until [`resume`](AutoRefreshScheduler::resume).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::app::SkylightError;
use crate::client::FeedClient;
use crate::config::settings::{SettingsHandle, SettingsObserver, MIN_FETCH_INTERVAL_SECS};
use crate::normalizer::Normalizer;
use crate::timeline::{MergeResult, ReconciliationEngine};

/// Relative time labels are refreshed this often.
pub const DISPLAY_REFRESH_SECS: u64 = 60;

/// Receives the scheduler's output. The CLI prints; a UI would redraw.
pub trait PresentationSink: Send + Sync {
    fn merge_applied(&self, result: &MergeResult);
    fn labels_changed(&self, changes: &[(String, String)]);
}

/// Everything one fetch-merge cycle needs, cloneable into spawned tasks.
#[derive(Clone)]
struct CycleRunner {
    client: Arc<dyn FeedClient + Send + Sync>,
    engine: Arc<ReconciliationEngine>,
    normalizer: Normalizer,
    settings: SettingsHandle,
    sink: Arc<dyn PresentationSink>,
    selection: Arc<Mutex<Option<String>>>,
    authenticated: Arc<AtomicBool>,
    current_interval: Arc<AtomicU64>,
}

impl CycleRunner {
    async fn run_cycle(&self) {
        if !self.authenticated.load(Ordering::SeqCst) {
            tracing::debug!("skipping fetch cycle: not authenticated");
            return;
        }
        let Some(_guard) = self.engine.begin_cycle() else {
            tracing::debug!("skipping fetch cycle: previous cycle still running");
            return;
        };

        let fetch_count = self.settings.current().fetch_count;
        let entries = match self.client.fetch_timeline(fetch_count).await {
            Ok(entries) => entries,
            Err(SkylightError::AuthInvalid(detail)) => {
                tracing::warn!("session rejected by service, suspending refresh: {detail}");
                self.authenticated.store(false, Ordering::SeqCst);
                // The fetch timer loop exits on the next tick; report the
                // timer as stopped right away.
                self.current_interval.store(0, Ordering::SeqCst);
                return;
            }
            Err(e) => {
                tracing::warn!("fetch failed, will retry next tick: {e}");
                return;
            }
        };

        let batch = self.normalizer.normalize_batch(&entries, Utc::now());
        let selected = self
            .selection
            .lock()
            .ok()
            .and_then(|selection| selection.clone());

        match self.engine.merge(batch, selected.as_deref()) {
            Ok(result) => {
                if let Ok(mut selection) = self.selection.lock() {
                    *selection = result.reselected_id.clone();
                }
                self.sink.merge_applied(&result);
            }
            Err(e) => {
                tracing::warn!("merge failed, cache left untouched: {e}");
            }
        }
    }

    fn refresh_labels(&self) {
        match self.engine.refresh_display_times(Utc::now()) {
            Ok(changes) if !changes.is_empty() => self.sink.labels_changed(&changes),
            Ok(_) => {}
            Err(e) => tracing::warn!("label refresh failed: {e}"),
        }
    }
}

/// Drives periodic fetch-merge cycles and label refreshes.
pub struct AutoRefreshScheduler {
    runner: CycleRunner,
    fetch_task: Mutex<Option<JoinHandle<()>>>,
    display_task: Mutex<Option<JoinHandle<()>>>,
}

impl AutoRefreshScheduler {
    pub fn new(
        client: Arc<dyn FeedClient + Send + Sync>,
        engine: Arc<ReconciliationEngine>,
        normalizer: Normalizer,
        settings: SettingsHandle,
        sink: Arc<dyn PresentationSink>,
    ) -> Self {
        Self {
            runner: CycleRunner {
                client,
                engine,
                normalizer,
                settings,
                sink,
                selection: Arc::new(Mutex::new(None)),
                authenticated: Arc::new(AtomicBool::new(true)),
                current_interval: Arc::new(AtomicU64::new(0)),
            },
            fetch_task: Mutex::new(None),
            display_task: Mutex::new(None),
        }
    }

    /// Start the display timer and, if settings allow, the fetch timer.
    pub fn start(&self) {
        self.start_display_timer();
        self.apply_settings();
    }

    /// (Re)start the fetch timer with the given period. Periods below the
    /// floor are raised to it. The first fetch happens one period from now,
    /// not immediately.
    pub fn enable(&self, interval_secs: u64) {
        let interval_secs = interval_secs.max(MIN_FETCH_INTERVAL_SECS);
        self.runner
            .current_interval
            .store(interval_secs, Ordering::SeqCst);

        let runner = self.runner.clone();
        let task = tokio::spawn(async move {
            let mut timer = interval(Duration::from_secs(interval_secs));
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            timer.tick().await; // Skip the first immediate tick

            loop {
                timer.tick().await;
                if !runner.authenticated.load(Ordering::SeqCst) {
                    tracing::debug!("fetch timer stopping: suspended");
                    break;
                }
                runner.run_cycle().await;
            }
        });

        let mut slot = self.fetch_task.lock().expect("fetch task lock poisoned");
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
        tracing::info!(interval_secs, "automatic refresh enabled");
    }

    pub fn disable(&self) {
        self.runner.current_interval.store(0, Ordering::SeqCst);
        let mut slot = self.fetch_task.lock().expect("fetch task lock poisoned");
        if let Some(task) = slot.take() {
            task.abort();
            tracing::info!("automatic refresh disabled");
        }
    }

    /// Stop fetching until [`resume`](Self::resume); used after the service
    /// rejects the session.
    pub fn suspend(&self) {
        self.runner.authenticated.store(false, Ordering::SeqCst);
        self.disable();
    }

    /// Mark the session valid again and re-apply the current settings.
    pub fn resume(&self) {
        self.runner.authenticated.store(true, Ordering::SeqCst);
        self.apply_settings();
    }

    /// Reconcile the timers with the current settings.
    pub fn apply_settings(&self) {
        let settings = self.runner.settings.current();
        let authenticated = self.runner.authenticated.load(Ordering::SeqCst);
        if settings.auto_fetch && authenticated {
            self.enable(settings.fetch_interval);
        } else {
            self.disable();
        }
    }

    /// The active fetch period in seconds, 0 when disabled.
    pub fn fetch_interval(&self) -> u64 {
        self.runner.current_interval.load(Ordering::SeqCst)
    }

    pub fn is_suspended(&self) -> bool {
        !self.runner.authenticated.load(Ordering::SeqCst)
    }

    /// Remember which post the presentation has selected, so the next merge
    /// can report whether it survived.
    pub fn set_selected(&self, id: Option<String>) {
        if let Ok(mut selection) = self.runner.selection.lock() {
            *selection = id;
        }
    }

    /// Run one fetch-merge cycle right now, outside the timer.
    pub async fn refresh_now(&self) {
        self.runner.run_cycle().await;
    }

    fn start_display_timer(&self) {
        let runner = self.runner.clone();
        let task = tokio::spawn(async move {
            let mut timer = interval(Duration::from_secs(DISPLAY_REFRESH_SECS));
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            timer.tick().await;

            loop {
                timer.tick().await;
                runner.refresh_labels();
            }
        });

        let mut slot = self.display_task.lock().expect("display task lock poisoned");
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    pub fn shutdown(&self) {
        self.disable();
        let mut slot = self.display_task.lock().expect("display task lock poisoned");
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}

impl Drop for AutoRefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl SettingsObserver for AutoRefreshScheduler {
    fn on_settings_changed(&self, changed_key: Option<&str>) {
        // Only timeline keys affect the timers.
        match changed_key {
            Some(key) if !key.starts_with("timeline.") => {}
            _ => self.apply_settings(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Result;
    use crate::client::raw::RawFeedEntry;
    use crate::config::settings::TimelineSettings;
    use crate::timeline::FeedCache;
    use async_trait::async_trait;

    struct EmptyClient;

    #[async_trait]
    impl FeedClient for EmptyClient {
        async fn fetch_timeline(&self, _limit: usize) -> Result<Vec<RawFeedEntry>> {
            Ok(Vec::new())
        }
    }

    struct RejectingClient;

    #[async_trait]
    impl FeedClient for RejectingClient {
        async fn fetch_timeline(&self, _limit: usize) -> Result<Vec<RawFeedEntry>> {
            Err(SkylightError::AuthInvalid("ExpiredToken".into()))
        }
    }

    struct NullSink;

    impl PresentationSink for NullSink {
        fn merge_applied(&self, _result: &MergeResult) {}
        fn labels_changed(&self, _changes: &[(String, String)]) {}
    }

    fn scheduler(settings: SettingsHandle) -> AutoRefreshScheduler {
        AutoRefreshScheduler::new(
            Arc::new(EmptyClient),
            Arc::new(ReconciliationEngine::new(FeedCache::new())),
            Normalizer::new("alice.bsky.social"),
            settings,
            Arc::new(NullSink),
        )
    }

    #[tokio::test]
    async fn test_enable_clamps_interval_to_floor() {
        let scheduler = scheduler(SettingsHandle::new(TimelineSettings::default()));
        scheduler.enable(30);
        assert_eq!(scheduler.fetch_interval(), MIN_FETCH_INTERVAL_SECS);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_disable_stops_the_timer() {
        let scheduler = scheduler(SettingsHandle::new(TimelineSettings::default()));
        scheduler.enable(600);
        assert_eq!(scheduler.fetch_interval(), 600);
        scheduler.disable();
        assert_eq!(scheduler.fetch_interval(), 0);
    }

    #[tokio::test]
    async fn test_settings_change_applies_timeline_keys_only() {
        let settings = SettingsHandle::new(TimelineSettings::default());
        let scheduler = scheduler(settings.clone());

        settings.update(
            TimelineSettings {
                auto_fetch: true,
                fetch_interval: 900,
                fetch_count: 50,
            },
            None,
        );

        scheduler.on_settings_changed(Some("display.theme"));
        assert_eq!(scheduler.fetch_interval(), 0);

        scheduler.on_settings_changed(Some("timeline.fetch_interval"));
        assert_eq!(scheduler.fetch_interval(), 900);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_suspend_and_resume() {
        let settings = SettingsHandle::new(TimelineSettings::default());
        let scheduler = scheduler(settings);
        scheduler.start();
        assert_eq!(scheduler.fetch_interval(), 600);

        scheduler.suspend();
        assert!(scheduler.is_suspended());
        assert_eq!(scheduler.fetch_interval(), 0);

        scheduler.resume();
        assert!(!scheduler.is_suspended());
        assert_eq!(scheduler.fetch_interval(), 600);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_auto_fetch_off_keeps_timer_stopped() {
        let settings = SettingsHandle::new(TimelineSettings {
            auto_fetch: false,
            fetch_interval: 600,
            fetch_count: 50,
        });
        let scheduler = scheduler(settings);
        scheduler.start();
        assert_eq!(scheduler.fetch_interval(), 0);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_auth_rejection_suspends_and_stops_reporting_an_interval() {
        let scheduler = AutoRefreshScheduler::new(
            Arc::new(RejectingClient),
            Arc::new(ReconciliationEngine::new(FeedCache::new())),
            Normalizer::new("alice.bsky.social"),
            SettingsHandle::new(TimelineSettings::default()),
            Arc::new(NullSink),
        );
        scheduler.enable(600);
        assert_eq!(scheduler.fetch_interval(), 600);

        scheduler.refresh_now().await;

        assert!(scheduler.is_suspended());
        assert_eq!(scheduler.fetch_interval(), 0);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_refresh_now_merges_immediately() {
        let settings = SettingsHandle::new(TimelineSettings::default());
        let scheduler = scheduler(settings);
        scheduler.refresh_now().await;
        // The empty client yields an empty merge without error.
        assert!(!scheduler.is_suspended());
    }
}
