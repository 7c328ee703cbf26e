//! A versioned snapshot feed with one refresher task per collection.
//!
//! Writers never publish directly. They mark the feed dirty; the refresher
//! reloads the whole ordered query and publishes the result as the next
//! version. A burst of marks arriving while a load is in flight collapses
//! into a single follow-up load, and because only the refresher publishes,
//! versions are strictly increasing.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::retry::Backoff;
use futures::Stream;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A full, ordered materialization of a collection.
#[derive(Debug)]
pub struct Snapshot<T> {
    /// 0 until the first successful load.
    pub version: u64,
    pub items: Arc<Vec<T>>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            items: Arc::clone(&self.items),
        }
    }
}

/// Retry settings for a refresher whose load fails.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_ms: u64,
    pub max_ms: u64,
}

pub struct Feed<T> {
    name: &'static str,
    tx: watch::Sender<Snapshot<T>>,
    dirty: Notify,
    subscribers: Arc<AtomicUsize>,
}

impl<T: Send + Sync + 'static> Feed<T> {
    pub fn new(name: &'static str) -> Arc<Self> {
        let (tx, _rx) = watch::channel(Snapshot {
            version: 0,
            items: Arc::new(Vec::new()),
        });
        Arc::new(Self {
            name,
            tx,
            dirty: Notify::new(),
            subscribers: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Request a reload. Cheap; repeated calls before the reload starts coalesce.
    pub fn mark_dirty(&self) {
        self.dirty.notify_one();
    }

    /// The latest published snapshot.
    pub fn current(&self) -> Snapshot<T> {
        self.tx.borrow().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }

    /// Subscribe to this feed. The subscription first yields the current
    /// snapshot (waiting for the initial load if needed), then every later one.
    pub fn subscribe(&self) -> Subscription<T> {
        let count = self.subscribers.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(feed = self.name, subscribers = count, "Subscribed");
        Subscription {
            feed: self.name,
            rx: self.tx.subscribe(),
            started: false,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    fn publish(&self, items: Vec<T>) -> u64 {
        let mut version = 0;
        self.tx.send_modify(|snap| {
            snap.version += 1;
            snap.items = Arc::new(items);
            version = snap.version;
        });
        version
    }

    /// Spawn the refresher task that owns all publishes of this feed.
    ///
    /// The feed is marked dirty immediately so the first load happens at once.
    /// A failed load keeps the last good snapshot published and is retried
    /// with exponential backoff until it succeeds.
    pub fn spawn_refresher<F, Fut, E>(self: &Arc<Self>, policy: RetryPolicy, load: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, E>> + Send,
        E: std::fmt::Display + Send,
    {
        let feed = Arc::clone(self);
        feed.mark_dirty();
        tokio::spawn(async move {
            let mut backoff = Backoff::new(policy.base_ms, policy.max_ms);
            loop {
                feed.dirty.notified().await;
                loop {
                    match load().await {
                        Ok(items) => {
                            let len = items.len();
                            let version = feed.publish(items);
                            backoff.reset();
                            debug!(feed = feed.name, version, items = len, "Published snapshot");
                            break;
                        }
                        Err(e) => {
                            let delay = backoff.next_delay();
                            warn!(
                                feed = feed.name,
                                attempt = backoff.attempt(),
                                retry_in_ms = delay.as_millis() as u64,
                                error = %e,
                                "Snapshot load failed, keeping last snapshot"
                            );
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        })
    }
}

/// A live subscription to one feed. Dropping it unsubscribes.
pub struct Subscription<T> {
    feed: &'static str,
    rx: watch::Receiver<Snapshot<T>>,
    started: bool,
    subscribers: Arc<AtomicUsize>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    /// Wait for the next snapshot. Returns `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<Snapshot<T>> {
        if !self.started {
            self.started = true;
            let snap = self.rx.wait_for(|s| s.version > 0).await.ok()?;
            return Some(snap.clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Turn the subscription into a stream of snapshots.
    pub fn into_stream(self) -> impl Stream<Item = Snapshot<T>> + Send + 'static {
        futures::stream::unfold(self, |mut sub| async move {
            let snap = sub.next().await?;
            Some((snap, sub))
        })
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        let left = self.subscribers.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!(feed = self.feed, subscribers = left, "Unsubscribed");
    }
}
