use std::sync::Arc;

/// Anything that can accept stats. Implementations must be callable from many
/// threads at once and must never block on, or fail because of, the network:
/// reporting is fire and forget.
pub trait Backend: Send + Sync {
    /// Add `count` to the counter `name`.
    fn count(&self, name: &str, count: i64);

    /// Record a sample of the value `name`.
    fn record(&self, name: &str, value: f64);

    fn inc(&self, name: &str) {
        self.count(name, 1);
    }
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn count(&self, name: &str, count: i64) {
        (**self).count(name, count)
    }

    fn record(&self, name: &str, value: f64) {
        (**self).record(name, value)
    }

    fn inc(&self, name: &str) {
        (**self).inc(name)
    }
}

impl<B: Backend + ?Sized> Backend for &B {
    fn count(&self, name: &str, count: i64) {
        (**self).count(name, count)
    }

    fn record(&self, name: &str, value: f64) {
        (**self).record(name, value)
    }

    fn inc(&self, name: &str) {
        (**self).inc(name)
    }
}

/// A backend that throws everything away.
#[derive(Debug, Default, Copy, Clone)]
pub struct Discard;

impl Backend for Discard {
    fn count(&self, _name: &str, _count: i64) {}

    fn record(&self, _name: &str, _value: f64) {}
}
