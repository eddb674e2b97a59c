//! # Status Registry
//!
//! Last-known status per endpoint, plus at most one listener per endpoint.
//!
//! ```text
//! statusChanged(status, url)
//!       │
//!       ▼
//! apply(url, status)
//!   ├── current[url] = status        (always)
//!   └── listener[url]?(status text)  (if one is registered)
//! ```
//!
//! Registering a listener replaces the previous one for that endpoint.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use tether_core::SyncStatus;

/// Callback receiving human-readable status text.
pub type StatusListener = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Entry {
    status: Option<SyncStatus>,
    listener: Option<StatusListener>,
}

/// Per-endpoint status and listener slots.
#[derive(Default)]
pub struct StatusRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a status event and notifies the endpoint's listener.
    ///
    /// The listener runs after the lock is released, so it may call back
    /// into the registry.
    pub fn apply(&self, url: &str, status: SyncStatus) {
        let listener = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(url.to_string()).or_default();
            entry.status = Some(status);
            entry.listener.clone()
        };

        if let Some(listener) = listener {
            listener(&status.to_string());
        }
    }

    /// Registers `listener` for `url`, replacing any previous one.
    ///
    /// Does not invoke the listener with the current status.
    pub fn set_listener(&self, url: &str, listener: StatusListener) {
        self.entries
            .lock()
            .entry(url.to_string())
            .or_default()
            .listener = Some(listener);
    }

    /// Removes the listener for `url`.
    pub fn clear_listener(&self, url: &str) {
        if let Some(entry) = self.entries.lock().get_mut(url) {
            entry.listener = None;
        }
    }

    /// Returns true if `url` has a listener.
    pub fn has_listener(&self, url: &str) -> bool {
        self.entries
            .lock()
            .get(url)
            .is_some_and(|entry| entry.listener.is_some())
    }

    /// Last status received for `url`.
    pub fn current(&self, url: &str) -> Option<SyncStatus> {
        self.entries.lock().get(url).and_then(|entry| entry.status)
    }

    /// Drops everything known about `url`.
    pub fn forget(&self, url: &str) {
        self.entries.lock().remove(url);
    }
}

impl fmt::Debug for StatusRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("StatusRegistry")
            .field("endpoints", &entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://sync.example/db1";

    fn recording() -> (StatusListener, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener: StatusListener = Arc::new(move |text: &str| sink.lock().push(text.to_string()));
        (listener, seen)
    }

    #[test]
    fn test_status_recorded_without_listener() {
        let registry = StatusRegistry::new();
        assert_eq!(registry.current(URL), None);

        registry.apply(URL, SyncStatus::Online);
        assert_eq!(registry.current(URL), Some(SyncStatus::Online));
        assert!(!registry.has_listener(URL));
    }

    #[test]
    fn test_listener_receives_text() {
        let registry = StatusRegistry::new();
        let (listener, seen) = recording();
        registry.set_listener(URL, listener);

        // Registration alone does not fire.
        assert!(seen.lock().is_empty());

        registry.apply(URL, SyncStatus::Connecting);
        registry.apply(URL, SyncStatus::Online);
        registry.apply("memory://other", SyncStatus::Error);
        assert_eq!(*seen.lock(), vec!["Connecting", "Connected"]);
    }

    #[test]
    fn test_listener_replacement() {
        let registry = StatusRegistry::new();
        let (first, first_seen) = recording();
        let (second, second_seen) = recording();

        registry.set_listener(URL, first);
        registry.set_listener(URL, second);
        registry.apply(URL, SyncStatus::ErrorWillRetry);

        assert!(first_seen.lock().is_empty());
        assert_eq!(*second_seen.lock(), vec!["Error, will retry"]);
    }

    #[test]
    fn test_clear_and_forget() {
        let registry = StatusRegistry::new();
        let (listener, seen) = recording();
        registry.set_listener(URL, listener);
        registry.apply(URL, SyncStatus::Online);

        registry.clear_listener(URL);
        registry.apply(URL, SyncStatus::Offline);
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(registry.current(URL), Some(SyncStatus::Offline));

        registry.forget(URL);
        assert_eq!(registry.current(URL), None);
    }

    #[test]
    fn test_listener_may_reenter() {
        let registry = Arc::new(StatusRegistry::new());
        let inner = registry.clone();
        registry.set_listener(
            URL,
            Arc::new(move |_: &str| {
                assert!(inner.current(URL).is_some());
            }),
        );
        registry.apply(URL, SyncStatus::Syncing);
    }
}
