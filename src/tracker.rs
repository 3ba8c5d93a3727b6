use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::types::Provider;

/// Counts the connections a connector currently holds open.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConnectionTracker {
    open: Arc<AtomicUsize>,
}

impl ConnectionTracker {
    pub(crate) fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Record a newly opened connection; the count drops when the lease does.
    pub(crate) fn lease(&self, provider: Provider) -> ConnectionLease {
        let now_open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(%provider, open = now_open, "connection opened");
        ConnectionLease {
            open: Arc::clone(&self.open),
            provider,
        }
    }
}

/// Held next to a live driver connection.
///
/// Declare it after the connection field so the connection is closed first.
#[derive(Debug)]
pub(crate) struct ConnectionLease {
    open: Arc<AtomicUsize>,
    provider: Provider,
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        let now_open = self.open.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!(provider = %self.provider, open = now_open, "connection released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_counts_until_dropped() {
        let tracker = ConnectionTracker::default();
        let a = tracker.lease(Provider::Sqlite);
        let b = tracker.clone().lease(Provider::Sqlite);
        assert_eq!(tracker.open_connections(), 2);
        drop(a);
        assert_eq!(tracker.open_connections(), 1);
        drop(b);
        assert_eq!(tracker.open_connections(), 0);
    }
}
