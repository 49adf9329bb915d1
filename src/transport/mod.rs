//! Getting a batch to the collector.
//!
//! The batcher only knows about [`Transport`]: hand it a batch, get back the
//! collector's answer or an error. [`HttpTransport`] is the real thing,
//! [`MemoryTransport`] keeps batches in memory for tests.

use async_trait::async_trait;

use crate::{error::Result, event::ApiResponse, event::Batch};

mod http;
mod memory;

pub use http::HttpTransport;
pub use memory::{MemoryTransport, Outcome};

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Short name used when logging failures.
    fn name(&self) -> &'static str;

    /// Deliver one batch. Any error, including a non-OK status from the
    /// collector, means the batch was not accepted.
    async fn send(&self, batch: &Batch) -> Result<ApiResponse>;
}
