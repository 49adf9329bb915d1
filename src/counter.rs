use std::sync::{atomic, Arc};

/// A monotonic counter shared between the reporter handle, the batcher and
/// its flush tasks. Reads never reset it, so snapshots are cumulative.
#[derive(Clone, Default, Debug)]
pub(crate) struct Counter {
    inner: Arc<atomic::AtomicU64>,
}

impl Counter {
    pub fn incr_by(&self, count: u64) {
        self.inner.fetch_add(count, atomic::Ordering::Relaxed);
    }

    pub fn incr(&self) {
        self.incr_by(1);
    }

    pub fn get(&self) -> u64 {
        self.inner.load(atomic::Ordering::Relaxed)
    }
}

/// The reporter's own bookkeeping. Every field is a cheap handle, cloning
/// shares the underlying counters.
#[derive(Clone, Default, Debug)]
pub(crate) struct Counters {
    pub events_enqueued: Counter,
    pub batches_sent: Counter,
    pub events_sent: Counter,
    pub batches_failed: Counter,
    pub events_dropped: Counter,
}

impl Counters {
    pub fn snapshot(&self) -> ReporterStats {
        ReporterStats {
            events_enqueued: self.events_enqueued.get(),
            batches_sent: self.batches_sent.get(),
            events_sent: self.events_sent.get(),
            batches_failed: self.batches_failed.get(),
            events_dropped: self.events_dropped.get(),
        }
    }
}

/// Point in time view of what a reporter has done so far.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ReporterStats {
    /// Events accepted by the queue.
    pub events_enqueued: u64,
    /// Batches the collector acknowledged.
    pub batches_sent: u64,
    pub events_sent: u64,
    /// Batches dropped because the flush failed.
    pub batches_failed: u64,
    /// Events lost with those failed batches.
    pub events_dropped: u64,
}

impl ReporterStats {
    /// Batches whose flush has finished, one way or the other.
    pub fn batches_flushed(&self) -> u64 {
        self.batches_sent + self.batches_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let counters = Counters::default();
        let clone = counters.clone();
        clone.batches_sent.incr();
        clone.events_sent.incr_by(3);
        counters.batches_failed.incr();
        let snap = counters.snapshot();
        assert_eq!(snap.batches_sent, 1);
        assert_eq!(snap.events_sent, 3);
        assert_eq!(snap.batches_flushed(), 2);
    }
}
