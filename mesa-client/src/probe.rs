//! Availability prober
//!
//! Decides whether the backend is reachable. "No backend" is a normal
//! operating mode, so a probe never fails: every outcome is a value.

use std::sync::Arc;
use std::time::Duration;

use crate::http::RemoteApi;

/// Which source the façade routes operations to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    /// Backend reachable, entity store acts as read cache.
    Remote,
    /// Operating entirely against the local entity store.
    Fallback,
    /// First probe has not resolved yet.
    Undetermined,
}

pub struct AvailabilityProber {
    remote: Arc<dyn RemoteApi>,
    timeout: Duration,
}

impl AvailabilityProber {
    pub fn new(remote: Arc<dyn RemoteApi>, timeout: Duration) -> Self {
        Self { remote, timeout }
    }

    /// One lightweight read-only call against the backend, bounded by
    /// the configured timeout rather than the transport's own.
    pub async fn probe(&self) -> OperationMode {
        match tokio::time::timeout(self.timeout, self.remote.list_tables()).await {
            Ok(Ok(tables)) => {
                tracing::debug!(tables = tables.len(), "probe succeeded, backend reachable");
                OperationMode::Remote
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "probe failed, operating against local store");
                OperationMode::Fallback
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "probe timed out, operating against local store"
                );
                OperationMode::Fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::{Behavior, MockRemote};

    #[tokio::test]
    async fn test_probe_reachable_backend() {
        let remote = Arc::new(MockRemote::new(Behavior::Healthy));
        let prober = AvailabilityProber::new(remote, Duration::from_millis(200));
        assert_eq!(prober.probe().await, OperationMode::Remote);
    }

    #[tokio::test]
    async fn test_probe_failure_is_a_value() {
        let remote = Arc::new(MockRemote::new(Behavior::Unreachable));
        let prober = AvailabilityProber::new(remote, Duration::from_millis(200));
        assert_eq!(prober.probe().await, OperationMode::Fallback);
    }

    #[tokio::test]
    async fn test_probe_is_bounded_by_timeout() {
        let remote = Arc::new(MockRemote::new(Behavior::Hang));
        let prober = AvailabilityProber::new(remote, Duration::from_millis(50));
        assert_eq!(prober.probe().await, OperationMode::Fallback);
    }
}
