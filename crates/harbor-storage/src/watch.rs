//! Per-key change notification.
//!
//! Each watched key owns one multicast, replay-latest channel
//! (`tokio::sync::watch`). Channels are created lazily on the first
//! subscription and never torn down by the facade; callers cancel by
//! dropping their stream. Repeated subscriptions to the same key share one
//! underlying channel, so every subscriber observes the current snapshot
//! first and every mutation after.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream as TokioWatchStream;

/// Live-update stream for one key.
///
/// Yields the current value (or `None` for absent) immediately, then the
/// value after each subsequent mutation. Infinite; cancelled by dropping.
pub type WatchStream = TokioWatchStream<Option<Value>>;

/// Lazily-populated map from key to its notification channel.
///
/// Senders are kept alive for the lifetime of the map even with no
/// subscribers, so a later subscription still replays the latest value.
#[derive(Debug, Default)]
pub(crate) struct WatcherMap {
    inner: Mutex<HashMap<String, watch::Sender<Option<Value>>>>,
}

impl WatcherMap {
    /// Subscribe to an existing channel for `key`, if one was created
    /// before. Also returns the snapshot the stream will replay first, so
    /// the caller can inspect it before handing the stream out.
    pub(crate) fn subscribe(&self, key: &str) -> Option<(WatchStream, Option<Value>)> {
        let map = match self.inner.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.get(key).map(|sender| {
            let current = sender.borrow().clone();
            (TokioWatchStream::new(sender.subscribe()), current)
        })
    }

    /// Subscribe to `key`, creating its channel primed with `current` if it
    /// does not exist yet.
    ///
    /// When another caller created the channel in the meantime, the
    /// existing channel wins and `current` is discarded: the channel
    /// already replays the latest observed value.
    pub(crate) fn subscribe_or_create(&self, key: &str, current: Option<Value>) -> WatchStream {
        let mut map = match self.inner.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        let sender = map
            .entry(key.to_owned())
            .or_insert_with(|| watch::channel(current).0);
        TokioWatchStream::new(sender.subscribe())
    }

    /// Notify the watcher for `key`, if any, of a new value (`None` for
    /// absent).
    pub(crate) fn notify(&self, key: &str, value: Option<Value>) {
        let map = match self.inner.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(sender) = map.get(key) {
            // send_replace also updates the retained value when no
            // subscriber is currently listening.
            sender.send_replace(value);
        }
    }

    /// Notify every watched key that its value is now absent.
    pub(crate) fn notify_all_absent(&self) {
        let map = match self.inner.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        for sender in map.values() {
            sender.send_replace(None);
        }
    }
}
