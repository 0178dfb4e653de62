//! Runtime timeline settings, adjustable while the scheduler is live.
//!
//! A [`SettingsHandle`] is shared between the components that read settings
//! and whatever changes them. Observers subscribe to hear about updates and
//! are dropped from the list automatically once they go away.

use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::client::{MAX_FETCH_COUNT, MIN_FETCH_COUNT};
use crate::config::TimelineConfig;

/// Fetching more often than this is not allowed, whatever the config says.
pub const MIN_FETCH_INTERVAL_SECS: u64 = 180;

/// The live, mutable subset of configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineSettings {
    pub auto_fetch: bool,
    pub fetch_interval: u64,
    pub fetch_count: usize,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            auto_fetch: true,
            fetch_interval: 600,
            fetch_count: 50,
        }
    }
}

impl From<&TimelineConfig> for TimelineSettings {
    fn from(config: &TimelineConfig) -> Self {
        Self {
            auto_fetch: config.auto_fetch,
            fetch_interval: config.fetch_interval,
            fetch_count: config.fetch_count,
        }
        .clamped()
    }
}

impl TimelineSettings {
    /// Pull out-of-range values back into range instead of rejecting them.
    pub fn clamped(mut self) -> Self {
        self.fetch_interval = self.fetch_interval.max(MIN_FETCH_INTERVAL_SECS);
        self.fetch_count = self.fetch_count.clamp(MIN_FETCH_COUNT, MAX_FETCH_COUNT);
        self
    }
}

/// Gets told when settings change. `changed_key` names the dotted config key
/// that changed (e.g. `timeline.fetch_interval`), or `None` for a wholesale
/// replacement.
pub trait SettingsObserver: Send + Sync {
    fn on_settings_changed(&self, changed_key: Option<&str>);
}

struct SettingsInner {
    current: RwLock<TimelineSettings>,
    observers: Mutex<Vec<(u64, Weak<dyn SettingsObserver>)>>,
    next_observer_id: Mutex<u64>,
}

/// Shared handle to the live settings. Cheap to clone.
#[derive(Clone)]
pub struct SettingsHandle {
    inner: Arc<SettingsInner>,
}

impl SettingsHandle {
    pub fn new(settings: TimelineSettings) -> Self {
        Self {
            inner: Arc::new(SettingsInner {
                current: RwLock::new(settings.clamped()),
                observers: Mutex::new(Vec::new()),
                next_observer_id: Mutex::new(0),
            }),
        }
    }

    pub fn current(&self) -> TimelineSettings {
        self.inner
            .current
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Replace the settings (clamped) and notify observers. `changed_key`
    /// is forwarded verbatim so observers can ignore keys they don't own.
    pub fn update(&self, settings: TimelineSettings, changed_key: Option<&str>) {
        let clamped = settings.clamped();
        if let Ok(mut current) = self.inner.current.write() {
            *current = clamped;
        }
        self.notify(changed_key);
    }

    /// Register an observer. Dropping the returned subscription (or the
    /// observer itself) stops the notifications.
    pub fn subscribe(&self, observer: Weak<dyn SettingsObserver>) -> SettingsSubscription {
        let id = {
            let mut next = self
                .inner
                .next_observer_id
                .lock()
                .expect("observer id lock poisoned");
            *next += 1;
            *next
        };
        if let Ok(mut observers) = self.inner.observers.lock() {
            observers.push((id, observer));
        }
        SettingsSubscription {
            handle: self.clone(),
            id,
        }
    }

    fn notify(&self, changed_key: Option<&str>) {
        let observers: Vec<Arc<dyn SettingsObserver>> = {
            let Ok(mut observers) = self.inner.observers.lock() else {
                return;
            };
            observers.retain(|(_, weak)| weak.strong_count() > 0);
            observers.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };
        for observer in observers {
            observer.on_settings_changed(changed_key);
        }
    }

    fn unsubscribe(&self, id: u64) {
        if let Ok(mut observers) = self.inner.observers.lock() {
            observers.retain(|(observer_id, _)| *observer_id != id);
        }
    }
}

/// RAII registration handle; unsubscribes on drop.
pub struct SettingsSubscription {
    handle: SettingsHandle,
    id: u64,
}

impl Drop for SettingsSubscription {
    fn drop(&mut self) {
        self.handle.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_clamping() {
        let settings = TimelineSettings {
            auto_fetch: true,
            fetch_interval: 30,
            fetch_count: 500,
        }
        .clamped();

        assert_eq!(settings.fetch_interval, MIN_FETCH_INTERVAL_SECS);
        assert_eq!(settings.fetch_count, MAX_FETCH_COUNT);

        let zero = TimelineSettings {
            auto_fetch: false,
            fetch_interval: 600,
            fetch_count: 0,
        }
        .clamped();
        assert_eq!(zero.fetch_count, MIN_FETCH_COUNT);
    }

    #[test]
    fn test_update_stores_clamped_values() {
        let handle = SettingsHandle::new(TimelineSettings::default());
        handle.update(
            TimelineSettings {
                auto_fetch: true,
                fetch_interval: 10,
                fetch_count: 50,
            },
            Some("timeline.fetch_interval"),
        );
        assert_eq!(handle.current().fetch_interval, MIN_FETCH_INTERVAL_SECS);
    }

    struct CountingObserver {
        calls: AtomicUsize,
    }

    impl SettingsObserver for CountingObserver {
        fn on_settings_changed(&self, _changed_key: Option<&str>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_observers_are_notified_until_unsubscribed() {
        let handle = SettingsHandle::new(TimelineSettings::default());
        let observer = Arc::new(CountingObserver {
            calls: AtomicUsize::new(0),
        });

        let subscription =
            handle.subscribe(Arc::downgrade(&observer) as Weak<dyn SettingsObserver>);

        handle.update(TimelineSettings::default(), None);
        assert_eq!(observer.calls.load(Ordering::SeqCst), 1);

        drop(subscription);
        handle.update(TimelineSettings::default(), None);
        assert_eq!(observer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_observer_is_skipped() {
        let handle = SettingsHandle::new(TimelineSettings::default());
        let observer = Arc::new(CountingObserver {
            calls: AtomicUsize::new(0),
        });
        let _subscription =
            handle.subscribe(Arc::downgrade(&observer) as Weak<dyn SettingsObserver>);

        drop(observer);
        // Must not panic or call into a dead observer.
        handle.update(TimelineSettings::default(), None);
    }
}
