use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::Transport;
use crate::{
    error::{Error, Result},
    event::{ApiResponse, Batch},
};

/// How the next call to [`MemoryTransport::send`] should end.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ok,
    /// Succeed, but only after this long.
    Slow(Duration),
    /// The collector answers with this status and message.
    Status(i64, String),
    /// The request never gets an answer.
    Fail(String),
    Panic(String),
}

/// A transport that keeps every batch it is handed. Outcomes can be scripted
/// per call, unscripted calls succeed.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    batches: Mutex<Vec<Batch>>,
    script: Mutex<VecDeque<Outcome>>,
    delay: Option<Duration>,
    notify: Notify,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send take `delay` before it resolves.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue up the outcome of a future send.
    pub fn push_outcome(&self, outcome: Outcome) {
        self.script.lock().push_back(outcome);
    }

    /// Every batch received so far, in the order the sends started.
    pub fn batches(&self) -> Vec<Batch> {
        self.batches.lock().clone()
    }

    /// Wait until at least `n` batches were received and return them all.
    pub async fn wait_for_batches(&self, n: usize) -> Vec<Batch> {
        loop {
            let notified = self.notify.notified();
            {
                let batches = self.batches.lock();
                if batches.len() >= n {
                    return batches.clone();
                }
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn send(&self, batch: &Batch) -> Result<ApiResponse> {
        let outcome = self.script.lock().pop_front().unwrap_or(Outcome::Ok);
        let delay = match &outcome {
            Outcome::Slow(delay) => Some(*delay),
            _ => self.delay,
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.batches.lock().push(batch.clone());
        self.notify.notify_waiters();

        match outcome {
            Outcome::Ok | Outcome::Slow(_) => Ok(ApiResponse::ok()),
            Outcome::Status(status, msg) => Err(Error::Api { status, msg }),
            Outcome::Fail(reason) => Err(Error::Transport(reason)),
            Outcome::Panic(reason) => panic!("{reason}"),
        }
    }
}
