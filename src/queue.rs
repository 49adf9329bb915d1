//! Bounded multi-producer, single-consumer queue between stat calls and the
//! batcher.
//!
//! A full queue applies backpressure: producers block until the consumer has
//! made room. Closing the queue is the only shutdown signal the consumer gets;
//! it keeps draining whatever was buffered and then sees the end of the stream.

use parking_lot::RwLock;
use tokio::{
    runtime::{Handle, RuntimeFlavor},
    sync::mpsc::{self, error::TrySendError},
};

use crate::{
    error::{Error, Result},
    event::Event,
};

pub const DEFAULT_CAPACITY: usize = 10_000;

/// Create a queue holding at most `capacity` events.
pub fn channel(capacity: usize) -> (EventQueue, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EventQueue {
            sender: RwLock::new(Some(tx)),
        },
        EventReceiver { inner: rx },
    )
}

/// The producer side.
#[derive(Debug)]
pub struct EventQueue {
    // Producers clone the sender out of the slot and send on the clone, so a
    // blocked producer never holds the lock. The channel closes once the slot
    // is emptied and the last in-flight clone is gone.
    sender: RwLock<Option<mpsc::Sender<Event>>>,
}

impl EventQueue {
    fn sender(&self) -> Result<mpsc::Sender<Event>> {
        self.sender.read().as_ref().cloned().ok_or(Error::Closed)
    }

    /// Enqueue an event, blocking the calling thread while the queue is full.
    ///
    /// Inside a multi-threaded tokio runtime the wait happens through
    /// [`tokio::task::block_in_place`]. A current-thread runtime can't block
    /// without starving the consumer, so a full queue there is reported as
    /// [`Error::QueueFull`] instead.
    pub fn send(&self, event: Event) -> Result<()> {
        let sender = self.sender()?;
        match sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(Error::Closed),
            Err(TrySendError::Full(event)) => blocking_send(&sender, event),
        }
    }

    /// Enqueue an event, waiting asynchronously while the queue is full.
    pub async fn send_async(&self, event: Event) -> Result<()> {
        let sender = self.sender()?;
        sender.send(event).await.map_err(|_| Error::Closed)
    }

    /// Stop accepting events. Fails if the queue was already closed.
    pub fn close(&self) -> Result<()> {
        self.sender.write().take().map(drop).ok_or(Error::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }
}

fn blocking_send(sender: &mpsc::Sender<Event>, event: Event) -> Result<()> {
    let res = match Handle::try_current() {
        Ok(handle) => match handle.runtime_flavor() {
            RuntimeFlavor::CurrentThread => {
                tracing::warn!(
                    message = "event queue full on a current-thread runtime",
                    stat = event.name()
                );
                return Err(Error::QueueFull);
            }
            _ => tokio::task::block_in_place(|| sender.blocking_send(event)),
        },
        Err(_) => sender.blocking_send(event),
    };
    res.map_err(|_| Error::Closed)
}

/// The consumer side, owned by the batcher.
#[derive(Debug)]
pub struct EventReceiver {
    inner: mpsc::Receiver<Event>,
}

impl EventReceiver {
    /// The next event, or `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.inner.recv().await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    };

    use super::*;

    #[test]
    fn full_queue_blocks_until_drained() {
        let (queue, mut rx) = channel(1);
        let queue = Arc::new(queue);
        queue.send(Event::count("first", 1)).unwrap();

        let sent = Arc::new(AtomicBool::new(false));
        let producer = {
            let queue = queue.clone();
            let sent = sent.clone();
            std::thread::spawn(move || {
                queue.send(Event::count("second", 1)).unwrap();
                sent.store(true, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(100));
        assert!(!sent.load(Ordering::SeqCst), "producer should be blocked");

        assert_eq!(rx.inner.blocking_recv(), Some(Event::count("first", 1)));
        producer.join().unwrap();
        assert!(sent.load(Ordering::SeqCst));
        assert_eq!(rx.inner.blocking_recv(), Some(Event::count("second", 1)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn blocks_inside_multi_thread_runtime() {
        let (queue, mut rx) = channel(1);
        let queue = Arc::new(queue);
        queue.send(Event::count("first", 1)).unwrap();

        let producer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.send(Event::count("second", 2)) })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!producer.is_finished());

        assert_eq!(rx.recv().await, Some(Event::count("first", 1)));
        producer.await.unwrap().unwrap();
        assert_eq!(rx.recv().await, Some(Event::count("second", 2)));
    }

    #[tokio::test]
    async fn full_queue_on_current_thread_is_an_error() {
        let (queue, _rx) = channel(1);
        queue.send(Event::count("first", 1)).unwrap();
        assert!(matches!(
            queue.send(Event::count("second", 1)),
            Err(Error::QueueFull)
        ));
    }

    #[tokio::test]
    async fn close_drains_then_ends() {
        let (queue, mut rx) = channel(8);
        queue.send(Event::count("a", 1)).unwrap();
        queue.send_async(Event::value("b", 2.0)).await.unwrap();
        queue.close().unwrap();

        assert!(queue.is_closed());
        assert!(matches!(queue.send(Event::count("c", 1)), Err(Error::Closed)));
        assert!(matches!(queue.close(), Err(Error::Closed)));

        assert_eq!(rx.recv().await, Some(Event::count("a", 1)));
        assert_eq!(rx.recv().await, Some(Event::value("b", 2.0)));
        assert_eq!(rx.recv().await, None);
    }
}
