//! The consumer side of the pipeline.
//!
//! One task owns the batch being built. A batch is sent once it reaches
//! `max_batch_size` events, or `batch_timeout` after its first event arrived,
//! whichever comes first. Sends run as their own tasks so the consumer goes
//! straight back to accumulating the next batch. A failed send is logged and
//! the batch is gone, there are no retries.

use std::{
    future, mem,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

use futures::FutureExt;
use tokio::{
    task::JoinSet,
    time::{sleep_until, Instant},
};

use crate::{
    config::{Config, ShutdownMode},
    counter::Counters,
    error::{join_error_message, panic_message, Error, Result},
    event::{Batch, Event},
    queue::EventReceiver,
    transport::Transport,
};

pub(crate) struct Batcher {
    key: String,
    debug: bool,
    batch_timeout: Duration,
    max_batch_size: usize,
    shutdown_mode: ShutdownMode,
    events: EventReceiver,
    transport: Arc<dyn Transport>,
    counters: Counters,
    in_flight: JoinSet<Result<()>>,
    batch: Batch,
    // Armed by the first event of a batch, never pushed back by later ones.
    deadline: Option<Instant>,
}

impl Batcher {
    pub fn new(
        config: &Config,
        events: EventReceiver,
        transport: Arc<dyn Transport>,
        counters: Counters,
    ) -> Self {
        let max_batch_size = config.max_batch_size.max(1);
        Self {
            key: config.key.clone(),
            debug: config.debug,
            batch_timeout: config.batch_timeout,
            max_batch_size,
            shutdown_mode: config.shutdown_mode,
            events,
            transport,
            counters,
            in_flight: JoinSet::new(),
            batch: Batch::with_capacity(config.key.clone(), max_batch_size.min(1024)),
            deadline: None,
        }
    }

    fn new_batch(&self) -> Batch {
        Batch::with_capacity(self.key.clone(), self.max_batch_size.min(1024))
    }

    /// Run until the queue is closed and drained. Returns the outcome of the
    /// final flush.
    pub async fn run(mut self) -> Result<()> {
        if self.debug {
            tracing::debug!(
                message = "started background process",
                transport = self.transport.name()
            );
        }

        loop {
            let deadline = self.deadline;
            let timer = async move {
                match deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => future::pending().await,
                }
            };

            tokio::select! {
                biased;

                _ = timer => self.guarded(Self::dispatch_pending),
                Some(res) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    if let Err(e) = res {
                        tracing::error!(message = "flush task failed", error = %join_error_message(e));
                    }
                }
                event = self.events.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    self.guarded(|this| this.accept(event));
                }
            }
        }

        let fresh = self.new_batch();
        let batch = mem::replace(&mut self.batch, fresh);
        if self.debug {
            tracing::debug!(
                message = "process closed",
                pending = batch.len(),
                in_flight = self.in_flight.len()
            );
        }
        let result = if batch.is_empty() {
            Ok(())
        } else {
            flush(self.transport.clone(), self.counters.clone(), self.debug, batch).await
        };
        self.finish_in_flight().await;
        result
    }

    fn accept(&mut self, event: Event) {
        if self.debug {
            tracing::debug!(message = "received stat", event = ?event);
        }
        self.batch.push(event);
        if self.deadline.is_none() {
            // A timeout too large to represent leaves only the size threshold.
            self.deadline = Instant::now().checked_add(self.batch_timeout);
        }
        if self.batch.len() >= self.max_batch_size {
            self.dispatch_pending();
        }
    }

    /// Hand the batch being built to its own task and start a new one. Empty
    /// batches are never sent.
    fn dispatch_pending(&mut self) {
        self.deadline = None;
        let fresh = self.new_batch();
        let batch = mem::replace(&mut self.batch, fresh);
        if batch.is_empty() {
            return;
        }
        self.in_flight.spawn(flush(
            self.transport.clone(),
            self.counters.clone(),
            self.debug,
            batch,
        ));
    }

    /// Run one step of the consumer loop. A panic costs the batch being built,
    /// the consumer keeps going.
    fn guarded(&mut self, step: impl FnOnce(&mut Self)) {
        let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| step(self))) else {
            return;
        };
        let fresh = self.new_batch();
        let lost = mem::replace(&mut self.batch, fresh).len();
        self.deadline = None;
        self.counters.events_dropped.incr_by(lost as u64);
        tracing::error!(
            message = "batcher step panicked",
            dropped = lost,
            error = %panic_message(payload.as_ref())
        );
    }

    async fn finish_in_flight(&mut self) {
        match self.shutdown_mode {
            ShutdownMode::Drain => {
                while let Some(res) = self.in_flight.join_next().await {
                    if let Err(e) = res {
                        tracing::error!(message = "flush task failed", error = %join_error_message(e));
                    }
                }
            }
            ShutdownMode::Detach => self.in_flight.detach_all(),
        }
    }
}

/// Send one batch and account for the result. Failures, panics included, are
/// logged here and handed back only so the final flush can surface them.
async fn flush(
    transport: Arc<dyn Transport>,
    counters: Counters,
    debug: bool,
    batch: Batch,
) -> Result<()> {
    let items = batch.len();
    if debug {
        tracing::debug!(message = "sending batch", items);
    }

    let res = AssertUnwindSafe(transport.send(&batch))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            Err(Error::FlushPanicked(panic_message(payload.as_ref())))
        });

    match res {
        Ok(resp) => {
            counters.batches_sent.incr();
            counters.events_sent.incr_by(items as u64);
            if debug {
                tracing::debug!(
                    message = "batch accepted",
                    items,
                    status = resp.status,
                    msg = %resp.message
                );
            }
            Ok(())
        }
        Err(e) => {
            counters.batches_failed.incr();
            counters.events_dropped.incr_by(items as u64);
            tracing::error!(
                message = "failed to flush batch",
                transport = transport.name(),
                items,
                error = %e
            );
            Err(e)
        }
    }
}
