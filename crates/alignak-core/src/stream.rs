// ── Reactive collection streams ──
//
// Subscription type for consuming collection replacements from the
// DataStore.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::CollectionSnapshot;

/// A subscription to one resource collection.
///
/// Provides both point-in-time snapshot access and change notification
/// via [`changed()`](Self::changed) or by converting into a `Stream`.
pub struct ResourceStream {
    current: Arc<CollectionSnapshot>,
    receiver: watch::Receiver<Arc<CollectionSnapshot>>,
}

impl ResourceStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<CollectionSnapshot>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation (or at the last `changed()`).
    pub fn current(&self) -> &Arc<CollectionSnapshot> {
        &self.current
    }

    /// Wait for the next replacement. Returns `None` once the store is
    /// dropped.
    pub async fn changed(&mut self) -> Option<Arc<CollectionSnapshot>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    /// The first item is the current snapshot.
    pub fn into_stream(self) -> ResourceWatchStream {
        ResourceWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct ResourceWatchStream {
    inner: WatchStream<Arc<CollectionSnapshot>>,
}

impl Stream for ResourceWatchStream {
    type Item = Arc<CollectionSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
