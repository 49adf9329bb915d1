use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::Semaphore;

use super::Transport;
use crate::{
    config::Config,
    error::{Error, Result},
    event::{ApiResponse, Batch},
};

/// Posts batches as JSON to the collector over a pooled reqwest client.
///
/// The pool keeps at most `max_idle_conns` idle connections around, and a
/// semaphore caps the number of requests in flight at `max_connections` so a
/// burst of flushes can't fan out without bound.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    permits: Arc<Semaphore>,
    debug: bool,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_write_timeout)
            .pool_max_idle_per_host(config.max_idle_conns)
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            permits: Arc::new(Semaphore::new(config.max_connections.max(1))),
            debug: config.debug,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(&self, batch: &Batch) -> Result<ApiResponse> {
        let body = batch.to_json().map_err(Error::Encode)?;
        if self.debug {
            tracing::debug!(message = "request", body = %String::from_utf8_lossy(&body));
        }

        // The semaphore is never closed.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Transport("connection limiter closed".into()))?;

        let resp = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        let api_resp: ApiResponse =
            serde_json::from_slice(&bytes).map_err(|source| Error::Decode {
                status: status.as_u16(),
                source,
            })?;
        if !api_resp.is_ok() {
            return Err(Error::Api {
                status: api_resp.status,
                msg: api_resp.message,
            });
        }
        if self.debug {
            tracing::debug!(
                message = "api response",
                status = api_resp.status,
                msg = %api_resp.message
            );
        }
        Ok(api_resp)
    }
}
