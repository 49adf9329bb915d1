//! Fire and forget stats for StatHat style collectors.
//!
//! Application code talks to a [`Backend`], usually through [`Stats`]:
//! ```no_run
//! # async fn example() -> stats64::Result<()> {
//! use std::sync::Arc;
//!
//! let reporter = Arc::new(stats64::Reporter::start(stats64::Config::new("my-ezkey"))?);
//! stats64::stats::init(stats64::Stats::new(reporter.clone()))?;
//!
//! stats64::stats::inc("app/requests")?;
//! stats64::stats::record("app/latency_ms", 12.5)?;
//!
//! reporter.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! The [`Reporter`] never does network I/O on the caller's thread. Calls land
//! in a bounded queue, a single background task batches them up and every
//! batch is posted by its own task. Delivery is best effort: a batch that
//! fails to send is logged and dropped.

mod backend;
mod batcher;
mod config;
mod counter;
mod error;
mod event;
pub mod queue;
mod reporter;
pub mod stats;
pub mod transport;

pub use backend::{Backend, Discard};
pub use config::{Config, ShutdownMode, DEFAULT_ENDPOINT};
pub use counter::ReporterStats;
pub use error::{Error, Result};
pub use event::{ApiResponse, Batch, Event};
pub use reporter::Reporter;
pub use stats::Stats;
