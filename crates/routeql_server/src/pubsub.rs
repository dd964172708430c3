//! In-process realtime transport for subscriptions.
//!
//! Channels are registered as patterns such as `/personCreated/{firstname}`.
//! Publishing and subscribing use concrete paths (`/personCreated/john`); a
//! concrete path must match a registered pattern segment by segment.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use routeql_runtime::{ChannelSource, RouteqlError, RouteqlResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

const DEFAULT_CAPACITY: usize = 256;

type Channels = Arc<Mutex<HashMap<String, broadcast::Sender<Value>>>>;

/// A publish/subscribe hub.
///
/// Cloning is cheap; clones share channels and patterns. A concrete channel
/// lives only while it has receivers.
#[derive(Clone)]
pub struct PubSub {
    channels: Channels,
    patterns: Arc<RwLock<IndexMap<String, Option<Value>>>>,
    capacity: usize,
}

impl Default for PubSub {
    fn default() -> Self {
        Self::new()
    }
}

impl PubSub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a hub whose channels buffer `capacity` events per subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            patterns: Arc::new(RwLock::new(IndexMap::new())),
            capacity,
        }
    }

    /// Registers a channel pattern with transport options. Re-registering a
    /// pattern replaces its options.
    pub fn register_pattern(&self, pattern: impl Into<String>, options: Option<Value>) {
        let pattern = pattern.into();
        debug!(%pattern, "channel registered");
        self.patterns.write().insert(pattern, options);
    }

    /// Registered patterns with their options.
    pub fn patterns(&self) -> Vec<(String, Option<Value>)> {
        self.patterns
            .read()
            .iter()
            .map(|(pattern, options)| (pattern.clone(), options.clone()))
            .collect()
    }

    /// Returns the pattern a concrete path belongs to.
    pub fn pattern_for(&self, path: &str) -> Option<String> {
        self.patterns
            .read()
            .keys()
            .find(|pattern| pattern_matches(pattern, path))
            .cloned()
    }

    /// Publishes an event on a concrete path. Returns the number of
    /// subscribers that received it.
    pub fn publish(&self, path: impl AsRef<str>, event: Value) -> usize {
        let path = path.as_ref();
        let mut channels = self.channels.lock();
        let delivered = match channels.get(path).map(|sender| sender.send(event)) {
            Some(Ok(delivered)) => delivered,
            Some(Err(_)) => {
                channels.remove(path);
                debug!(%path, "idle channel dropped");
                0
            }
            None => 0,
        };
        debug!(%path, delivered, "published");
        delivered
    }

    /// Subscribes to a concrete path.
    pub fn subscribe(&self, path: impl Into<String>) -> broadcast::Receiver<Value> {
        let path = path.into();
        let mut channels = self.channels.lock();

        if let Some(sender) = channels.get(&path) {
            sender.subscribe()
        } else {
            let (sender, receiver) = broadcast::channel(self.capacity);
            channels.insert(path, sender);
            receiver
        }
    }

    /// Whether any receiver listens on a concrete path.
    pub fn has_subscribers(&self, path: &str) -> bool {
        self.channels
            .lock()
            .get(path)
            .is_some_and(|sender| sender.receiver_count() > 0)
    }
}

/// Receiver side of a subscription stream. Dropping the last one removes the
/// channel.
struct Subscriber {
    receiver: broadcast::Receiver<Value>,
    channels: Channels,
    path: String,
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        let mut channels = self.channels.lock();
        // our own receiver is still alive here
        if channels
            .get(&self.path)
            .is_some_and(|sender| sender.receiver_count() <= 1)
        {
            channels.remove(&self.path);
            debug!(path = %self.path, "channel closed");
        }
    }
}

#[async_trait]
impl ChannelSource for PubSub {
    async fn subscribe(&self, path: &str) -> RouteqlResult<BoxStream<'static, Value>> {
        if self.pattern_for(path).is_none() {
            return Err(RouteqlError::channel(format!(
                "No channel registered for \"{path}\""
            )));
        }
        let subscriber = Subscriber {
            receiver: PubSub::subscribe(self, path),
            channels: Arc::clone(&self.channels),
            path: path.to_string(),
        };
        Ok(stream::unfold(subscriber, |mut subscriber| async move {
            loop {
                match subscriber.receiver.recv().await {
                    Ok(event) => return Some((event, subscriber)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(path = %subscriber.path, skipped, "subscriber lagged behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed())
    }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(expected), Some(actual)) => {
                let is_param = expected.starts_with('{') && expected.ends_with('}');
                if !is_param && expected != actual {
                    return false;
                }
            }
            _ => return false,
        }
    }
}
