use std::sync::Arc;

use parking_lot::Mutex;
use tokio::{runtime::Handle, task::JoinHandle};

use crate::{
    backend::Backend,
    batcher::Batcher,
    config::Config,
    counter::{Counters, ReporterStats},
    error::{join_error_message, Error, Result},
    event::Event,
    queue::{self, EventQueue},
    transport::{HttpTransport, Transport},
};

/// The batching backend. Stat calls go into a bounded queue, a background
/// task groups them into batches and ships them to the collector.
///
/// The synchronous calls block while the queue is full, except on a
/// current-thread runtime (`#[tokio::main(flavor = "current_thread")]`) where
/// blocking would starve the batcher. There a full queue fails with
/// [`Error::QueueFull`], and through the [`Backend`] impl the stat is logged
/// and lost. Under load on such a runtime use [`Reporter::count_async`] and
/// [`Reporter::record_async`], which wait for room instead.
///
/// Dropping a reporter without calling [`Reporter::close`] still flushes what
/// was queued, but nothing waits for it.
#[derive(Debug)]
pub struct Reporter {
    queue: EventQueue,
    counters: Counters,
    consumer: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl Reporter {
    /// Start a reporter that posts to the collector over HTTP.
    pub fn start(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Start a reporter on top of any transport. Must be called from within a
    /// tokio runtime, the batcher is spawned onto it.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let handle = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let (queue, events) = queue::channel(config.channel_buffer_size);
        let counters = Counters::default();
        let batcher = Batcher::new(&config, events, transport, counters.clone());
        let consumer = handle.spawn(batcher.run());
        tracing::info!(
            message = "stats reporter started",
            endpoint = %config.endpoint,
            batch_timeout = ?config.batch_timeout,
            max_batch_size = config.max_batch_size,
        );

        Ok(Self {
            queue,
            counters,
            consumer: Mutex::new(Some(consumer)),
        })
    }

    fn enqueue(&self, event: Event) -> Result<()> {
        self.queue.send(event)?;
        self.counters.events_enqueued.incr();
        Ok(())
    }

    async fn enqueue_async(&self, event: Event) -> Result<()> {
        self.queue.send_async(event).await?;
        self.counters.events_enqueued.incr();
        Ok(())
    }

    /// Add `count` to the counter `name`. Blocks while the queue is full.
    pub fn count(&self, name: &str, count: i64) -> Result<()> {
        self.enqueue(Event::count(name, count))
    }

    /// Record a sample of the value `name`. Blocks while the queue is full.
    pub fn record(&self, name: &str, value: f64) -> Result<()> {
        self.enqueue(Event::value(name, value))
    }

    pub fn inc(&self, name: &str) -> Result<()> {
        self.count(name, 1)
    }

    pub async fn count_async(&self, name: &str, count: i64) -> Result<()> {
        self.enqueue_async(Event::count(name, count)).await
    }

    pub async fn record_async(&self, name: &str, value: f64) -> Result<()> {
        self.enqueue_async(Event::value(name, value)).await
    }

    pub fn stats(&self) -> ReporterStats {
        self.counters.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Stop accepting stats, flush what is left and wait for the background
    /// task to finish. Returns the error of the final flush, if it failed.
    /// Closing a second time is an error.
    pub async fn close(&self) -> Result<()> {
        self.queue.close()?;
        let consumer = self.consumer.lock().take().ok_or(Error::Closed)?;
        let res = match consumer.await {
            Ok(res) => res,
            Err(e) => Err(Error::ConsumerPanicked(join_error_message(e))),
        };
        let stats = self.stats();
        tracing::info!(
            message = "stats reporter closed",
            batches_sent = stats.batches_sent,
            batches_failed = stats.batches_failed,
            events_dropped = stats.events_dropped,
        );
        res
    }

    /// Reporting into a closed reporter is a bug in the caller and panics. Any
    /// other failure to enqueue, a consumer that went away without a close
    /// included, is logged and the stat is lost.
    fn producer_error(&self, name: &str, err: Error) {
        match err {
            Error::Closed if self.queue.is_closed() => {
                panic!("stat {name:?} reported after the reporter was closed")
            }
            err => tracing::error!(message = "dropped stat", stat = name, error = %err),
        }
    }
}

impl Backend for Reporter {
    fn count(&self, name: &str, count: i64) {
        if let Err(e) = Reporter::count(self, name, count) {
            self.producer_error(name, e);
        }
    }

    fn record(&self, name: &str, value: f64) {
        if let Err(e) = Reporter::record(self, name, value) {
            self.producer_error(name, e);
        }
    }
}
