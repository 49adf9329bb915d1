//! A thin indirection so application code can emit stats without depending on
//! a concrete backend.
//!
//! Either hold a [`Stats`] and pass it around, or install one process wide
//! with [`init`] and use the free functions.

use std::sync::{Arc, OnceLock};

use crate::{
    backend::Backend,
    error::{Error, Result},
};

static DEFAULT_STATS: OnceLock<Stats> = OnceLock::new();

/// Forwards stat calls to a backend, optionally logging each one first.
#[derive(Clone)]
pub struct Stats {
    backend: Arc<dyn Backend>,
    verbose: bool,
}

impl std::fmt::Debug for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stats")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl Stats {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn count(&self, name: &str, count: i64) {
        if self.verbose {
            tracing::info!(message = "stats.count", name, count);
        }
        self.backend.count(name, count);
    }

    pub fn record(&self, name: &str, value: f64) {
        if self.verbose {
            tracing::info!(message = "stats.record", name, value);
        }
        self.backend.record(name, value);
    }

    pub fn inc(&self, name: &str) {
        self.count(name, 1);
    }
}

impl Backend for Stats {
    fn count(&self, name: &str, count: i64) {
        Stats::count(self, name, count)
    }

    fn record(&self, name: &str, value: f64) {
        Stats::record(self, name, value)
    }
}

/// Install the process wide [`Stats`]. This can only happen once.
pub fn init(stats: Stats) -> Result<()> {
    DEFAULT_STATS
        .set(stats)
        .map_err(|_| Error::AlreadyInitialized)
}

/// The process wide [`Stats`], if [`init`] has been called.
pub fn global() -> Option<&'static Stats> {
    DEFAULT_STATS.get()
}

fn must_global() -> Result<&'static Stats> {
    global().ok_or(Error::NoBackend)
}

pub fn count(name: &str, count: i64) -> Result<()> {
    must_global()?.count(name, count);
    Ok(())
}

pub fn record(name: &str, value: f64) -> Result<()> {
    must_global()?.record(name, value);
    Ok(())
}

pub fn inc(name: &str) -> Result<()> {
    count(name, 1)
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::event::Event;

    /// Remembers every call in order.
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<Event>>,
    }

    impl Backend for RecordingBackend {
        fn count(&self, name: &str, count: i64) {
            self.calls.lock().push(Event::count(name, count));
        }

        fn record(&self, name: &str, value: f64) {
            self.calls.lock().push(Event::value(name, value));
        }
    }

    #[test]
    fn forwards_to_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let stats = Stats::new(backend.clone()).verbose(true);
        stats.inc("requests");
        stats.count("bytes", 512);
        stats.record("latency_ms", 12.5);
        assert_eq!(
            *backend.calls.lock(),
            vec![
                Event::count("requests", 1),
                Event::count("bytes", 512),
                Event::value("latency_ms", 12.5),
            ]
        );
    }

    // NOTE: this is the only test allowed to touch the process wide stats.
    #[test]
    fn global_is_set_once() {
        assert!(matches!(inc("before"), Err(Error::NoBackend)));

        let backend = Arc::new(RecordingBackend::default());
        init(Stats::new(backend.clone())).unwrap();
        assert!(matches!(
            init(Stats::new(backend.clone())),
            Err(Error::AlreadyInitialized)
        ));

        inc("after").unwrap();
        record("gauge", 1.0).unwrap();
        assert_eq!(
            *backend.calls.lock(),
            vec![Event::count("after", 1), Event::value("gauge", 1.0)]
        );
    }
}
