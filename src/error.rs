use std::any::Any;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while reporting stats. Most of these never
/// reach the caller: per-batch failures are logged by the batcher and the
/// batch is dropped. Only misuse and the final flush at shutdown surface.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no stats backend configured")]
    NoBackend,

    #[error("stats backend already initialized")]
    AlreadyInitialized,

    #[error("event queue is closed")]
    Closed,

    /// Only returned when blocking on a full queue would deadlock the
    /// consumer, i.e. from inside a current-thread tokio runtime.
    #[error("event queue is full and the current runtime cannot block")]
    QueueFull,

    #[error("reporter must be started from within a tokio runtime")]
    NoRuntime,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("error json encoding request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport level failure that isn't tied to a particular HTTP client.
    #[error("transport failed: {0}")]
    Transport(String),

    #[error("error decoding response (http status {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("api error: status={status} msg={msg:?}")]
    Api { status: i64, msg: String },

    #[error("flush task panicked: {0}")]
    FlushPanicked(String),

    #[error("consumer task panicked: {0}")]
    ConsumerPanicked(String),
}

/// Render the payload of a caught panic into something loggable.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".into()
    }
}

pub(crate) fn join_error_message(err: tokio::task::JoinError) -> String {
    if err.is_cancelled() {
        return "cancelled".into();
    }
    panic_message(err.into_panic().as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_detail() {
        let err = Error::Api {
            status: 500,
            msg: "invalid ezkey".into(),
        };
        assert_eq!(err.to_string(), "api error: status=500 msg=\"invalid ezkey\"");
    }

    #[tokio::test]
    async fn panic_message_extracts_payload() {
        let err = tokio::spawn(async { panic!("kaboom") }).await.unwrap_err();
        assert_eq!(join_error_message(err), "kaboom");

        let payload: Box<dyn Any + Send> = Box::new(format!("code {}", 7));
        assert_eq!(panic_message(payload.as_ref()), "code 7");
    }
}
