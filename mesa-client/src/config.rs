//! Client configuration

use std::time::Duration;

/// Configuration for connecting to the backend API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "http://localhost:8080")
    pub base_url: String,

    /// Bearer token attached to every request, opaque to this crate
    pub token: Option<String>,

    /// Total request timeout for CRUD calls, in seconds
    pub timeout: u64,

    /// Upper bound on the availability probe, independent of the
    /// transport's own timeout
    pub probe_timeout: Duration,

    /// Consecutive unreachable failures before the façade re-probes
    pub reprobe_after: u32,

    /// Kitchen stream reconnection policy
    pub stream: StreamConfig,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: 30,
            probe_timeout: Duration::from_secs(3),
            reprobe_after: 3,
            stream: StreamConfig::default(),
        }
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the CRUD request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the probe timeout
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the re-probe hysteresis threshold
    pub fn with_reprobe_after(mut self, failures: u32) -> Self {
        self.reprobe_after = failures;
        self
    }

    /// Set the stream reconnection policy
    pub fn with_stream(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

/// Kitchen stream reconnection configuration
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// First reconnect delay
    pub reconnect_delay: Duration,
    /// Exponential backoff cap
    pub max_reconnect_delay: Duration,
    /// Consecutive failed connections before the façade re-probes
    pub max_reconnect_attempts: u32,
}

impl Default for StreamConfig {
    /// LAN-optimized: fast detection, fast recovery.
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            reconnect_delay: Duration::from_millis(500),
            max_reconnect_delay: Duration::from_secs(10),
            max_reconnect_attempts: 5,
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// LAN configuration (default)
    pub fn lan() -> Self {
        Self::default()
    }

    /// WAN/internet configuration: tolerates high latency, backs off
    /// further before giving the prober a say.
    pub fn wan() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
            max_reconnect_attempts: 8,
        }
    }

    /// Set the first reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the backoff cap
    pub fn with_max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.max_reconnect_delay = delay;
        self
    }

    /// Set how many failed connections are tolerated before re-probing
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Backoff delay before reconnect attempt `attempt` (1-based),
    /// doubling from `reconnect_delay` up to `max_reconnect_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .reconnect_delay
            .saturating_mul(2u32.saturating_pow(exponent));
        delay.min(self.max_reconnect_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout, 30);
        assert_eq!(config.reprobe_after, 3);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("http://edge:8081")
            .with_token("jwt")
            .with_timeout(5)
            .with_reprobe_after(1);

        assert_eq!(config.base_url, "http://edge:8081");
        assert_eq!(config.token.as_deref(), Some("jwt"));
        assert_eq!(config.timeout, 5);
        assert_eq!(config.reprobe_after, 1);
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let stream = StreamConfig::lan();
        assert_eq!(stream.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(stream.delay_for_attempt(2), Duration::from_secs(1));
        assert_eq!(stream.delay_for_attempt(3), Duration::from_secs(2));
        assert_eq!(stream.delay_for_attempt(5), Duration::from_secs(8));
        assert_eq!(stream.delay_for_attempt(6), Duration::from_secs(10));
        assert_eq!(stream.delay_for_attempt(60), Duration::from_secs(10));
    }
}
