//! Event stream client
//!
//! Maintains one long-lived connection to the kitchen push endpoint
//! and decodes newline-delimited JSON frames into [`StreamEvent`]s.
//! The client never retries on its own: reconnection policy belongs to
//! the caller, which coordinates it with operation-mode transitions.

use futures::TryStreamExt;
use tokio::io::AsyncBufReadExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use shared::stream::StreamEvent;

use crate::config::ClientConfig;
use crate::error::{DataError, DataResult};

pub struct EventStreamClient {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl EventStreamClient {
    pub fn new(config: &ClientConfig) -> DataResult<Self> {
        // No total request timeout: the connection is expected to stay
        // open indefinitely. Only establishment is bounded.
        let http = reqwest::Client::builder()
            .connect_timeout(config.stream.connect_timeout)
            .build()
            .map_err(|e| DataError::unreachable(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            url: format!(
                "{}/api/kitchen/stream",
                config.base_url.trim_end_matches('/')
            ),
            token: config.token.clone(),
        })
    }

    /// Opens the connection and spawns the reader task. Single
    /// consumer: each call owns its own connection and handle.
    ///
    /// `on_event` runs once per decoded frame; malformed frames are
    /// logged and dropped without terminating the connection.
    /// `on_error` runs at most once, on connection failure or end of
    /// stream, and never after `close()` has returned.
    pub fn subscribe<F, E>(&self, mut on_event: F, on_error: E) -> StreamSubscription
    where
        F: FnMut(StreamEvent) + Send + 'static,
        E: FnOnce(DataError) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let mut request = self.http.get(&self.url);
        if let Some(t) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Bearer {t}"));
        }

        let task = tokio::spawn(async move {
            let mut on_error = Some(on_error);

            let response = tokio::select! {
                _ = token.cancelled() => return,
                r = request.send() => r.and_then(|r| r.error_for_status()),
            };
            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    if let Some(fail) = on_error.take() {
                        fail(DataError::Unreachable(e.to_string()));
                    }
                    return;
                }
            };
            tracing::debug!("kitchen stream connected");

            let stream = response.bytes_stream().map_err(std::io::Error::other);
            let mut lines = StreamReader::new(stream).lines();
            loop {
                let line = tokio::select! {
                    _ = token.cancelled() => return,
                    line = lines.next_line() => line,
                };
                match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match decode_frame(line) {
                            Ok(event) => on_event(event),
                            // One bad frame must not take the connection down.
                            Err(e) => tracing::warn!(error = %e, "dropping stream frame"),
                        }
                    }
                    Ok(None) => {
                        if let Some(fail) = on_error.take() {
                            fail(DataError::unreachable("stream closed by server"));
                        }
                        return;
                    }
                    Err(e) => {
                        if let Some(fail) = on_error.take() {
                            fail(DataError::Unreachable(e.to_string()));
                        }
                        return;
                    }
                }
            }
        });

        StreamSubscription {
            cancel,
            task: Mutex::new(Some(task)),
        }
    }
}

fn decode_frame(line: &str) -> DataResult<StreamEvent> {
    serde_json::from_str(line).map_err(|e| DataError::Malformed(e.to_string()))
}

/// Handle to one open stream connection.
pub struct StreamSubscription {
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamSubscription {
    /// Closes the connection. Idempotent; safe to call while the
    /// connection is still being established. After this returns, no
    /// further `on_event`/`on_error` invocation happens.
    pub async fn close(&self) {
        self.cancel.cancel();
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!("stream reader task panicked");
                }
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_frame_rejects_garbage() {
        assert!(matches!(
            decode_frame("not json at all").unwrap_err(),
            DataError::Malformed(_)
        ));
        assert!(matches!(
            decode_frame(r#"{"type": "exploded"}"#).unwrap_err(),
            DataError::Malformed(_)
        ));
    }

    #[test]
    fn test_decode_frame_accepts_deleted() {
        let event = decode_frame(r#"{"type": "deleted", "orderId": "o-1"}"#).unwrap();
        assert_eq!(event.order_id(), "o-1");
    }
}
