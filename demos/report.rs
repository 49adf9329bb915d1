use std::{sync::Arc, time::Duration};

use stats64::{Config, Reporter, Stats};

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let key = std::env::var("STATHAT_EZKEY").unwrap_or_default();
    let config = Config::new(key)
        .with_debug(true)
        .with_batch_timeout(Duration::from_secs(2));
    let reporter = Arc::new(Reporter::start(config)?);
    stats64::stats::init(Stats::new(reporter.clone()).verbose(true))?;

    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    for i in 0..10 {
        ticker.tick().await;
        stats64::stats::inc("stats64/demo/ticks")?;
        stats64::stats::record("stats64/demo/value", i as f64)?;
    }
    reporter.close().await?;
    tracing::info!(message = "done", stats = ?reporter.stats());
    Ok(())
}
