//! Hot-reloadable runtime settings.
//!
//! Settings that stages re-read on every request live in an [`arc_swap`]
//! cell rather than in the immutable startup config. A watch channel lets
//! interested subsystems react to changes; readers on the request path only
//! pay an atomic load.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;

use crate::config::schema::ServerConfig;

/// The subset of configuration that takes effect without restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Trusted reverse-proxy hops when resolving the client address.
    pub trusted_proxies: usize,
}

impl RuntimeSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { trusted_proxies: config.trusted_proxies }
    }
}

/// Owner of the live settings: atomic swap for readers, watch channel for
/// subscribers. In-flight requests keep the snapshot they loaded.
pub struct SettingsCell {
    current: ArcSwap<RuntimeSettings>,
    notify_tx: watch::Sender<Arc<RuntimeSettings>>,
}

impl SettingsCell {
    pub fn new(initial: RuntimeSettings) -> Self {
        let initial = Arc::new(initial);
        let (notify_tx, _) = watch::channel(initial.clone());
        Self { current: ArcSwap::new(initial), notify_tx }
    }

    /// Snapshot of the current settings.
    pub fn load(&self) -> Arc<RuntimeSettings> {
        self.current.load_full()
    }

    /// Replace the settings. All requests processed after this call observe
    /// the new values; subscribers are notified.
    pub fn store(&self, settings: RuntimeSettings) {
        let settings = Arc::new(settings);
        self.current.store(settings.clone());
        let _ = self.notify_tx.send(settings);
    }

    /// Subscribe to settings changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<RuntimeSettings>> {
        self.notify_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_is_visible_to_next_load() {
        let cell = SettingsCell::new(RuntimeSettings { trusted_proxies: 0 });
        assert_eq!(cell.load().trusted_proxies, 0);

        cell.store(RuntimeSettings { trusted_proxies: 2 });
        assert_eq!(cell.load().trusted_proxies, 2);
    }

    #[tokio::test]
    async fn subscribers_observe_changes() {
        let cell = SettingsCell::new(RuntimeSettings { trusted_proxies: 0 });
        let mut rx = cell.subscribe();

        cell.store(RuntimeSettings { trusted_proxies: 3 });
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().trusted_proxies, 3);
    }

    #[test]
    fn in_flight_snapshot_is_stable() {
        let cell = SettingsCell::new(RuntimeSettings { trusted_proxies: 1 });
        let snapshot = cell.load();
        cell.store(RuntimeSettings { trusted_proxies: 5 });
        assert_eq!(snapshot.trusted_proxies, 1);
        assert_eq!(cell.load().trusted_proxies, 5);
    }
}
