//! Worker pool configuration

use crate::core::{ProntoError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`WorkerPool`](crate::pool::WorkerPool)
///
/// # Example
///
/// ```rust
/// use pronto_utils::prelude::*;
///
/// let config = PoolConfig::new(4)
///     .with_max_queue_size(64)
///     .with_thread_name_prefix("obo-loader");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of workers, fixed for the pool's lifetime
    pub size: usize,
    /// Maximum queue size (0 = unbounded)
    pub max_queue_size: usize,
    /// Worker thread name prefix
    pub thread_name_prefix: String,
    /// Whether workers may construct pools of their own
    pub allows_child_work: bool,
    /// How often idle workers check for new jobs and for closing.
    /// Default: 50ms
    pub poll_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: num_cpus::get(),
            max_queue_size: 0,
            thread_name_prefix: "pronto-worker".to_string(),
            allows_child_work: true,
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with the given number of workers
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults.
    ///
    /// ```rust
    /// use pronto_utils::prelude::*;
    ///
    /// let config = PoolConfig::from_json(r#"{"size": 3, "allows_child_work": false}"#).unwrap();
    /// assert_eq!(config.size, 3);
    /// assert!(!config.allows_child_work);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ProntoError::invalid_config("json", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set maximum queue size
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Allow or forbid workers from owning pools of their own.
    ///
    /// Allowed by default. A pool built with `false` behaves like a pool of
    /// background workers: constructing a [`WorkerPool`](crate::pool::WorkerPool)
    /// from inside one of its jobs fails with
    /// [`ProntoError::ChildWorkNotAllowed`].
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_child_work(mut self, allowed: bool) -> Self {
        self.allows_child_work = allowed;
        self
    }

    /// Set the worker poll interval.
    ///
    /// # Panics
    ///
    /// Panics if interval is zero.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "poll interval must be non-zero");
        self.poll_interval = interval;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(ProntoError::invalid_pool_size(self.size));
        }
        if self.poll_interval.is_zero() {
            return Err(ProntoError::invalid_config(
                "poll_interval",
                "Poll interval must be non-zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.size, num_cpus::get());
        assert_eq!(config.max_queue_size, 0);
        assert!(config.allows_child_work);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_size_is_invalid() {
        let err = PoolConfig::new(0).validate().unwrap_err();
        assert!(matches!(err, ProntoError::InvalidPoolSize { size: 0 }));
    }

    #[test]
    fn test_builder() {
        let config = PoolConfig::new(2)
            .with_max_queue_size(8)
            .with_thread_name_prefix("parser")
            .with_child_work(false)
            .with_poll_interval(Duration::from_millis(5));

        assert_eq!(config.size, 2);
        assert_eq!(config.max_queue_size, 8);
        assert_eq!(config.thread_name_prefix, "parser");
        assert!(!config.allows_child_work);
        assert_eq!(config.poll_interval, Duration::from_millis(5));
    }

    #[test]
    #[should_panic(expected = "poll interval must be non-zero")]
    fn test_zero_poll_interval_panics() {
        let _ = PoolConfig::new(1).with_poll_interval(Duration::ZERO);
    }

    #[test]
    fn test_from_json() {
        let config = PoolConfig::from_json(r#"{"size": 6, "max_queue_size": 12}"#).unwrap();
        assert_eq!(config.size, 6);
        assert_eq!(config.max_queue_size, 12);
        assert_eq!(config.thread_name_prefix, "pronto-worker");

        assert!(matches!(
            PoolConfig::from_json(r#"{"size": 0}"#),
            Err(ProntoError::InvalidPoolSize { .. })
        ));
        assert!(matches!(
            PoolConfig::from_json("{not json"),
            Err(ProntoError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_json_round_trip_keeps_fields() {
        let config = PoolConfig::new(3).with_child_work(false);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(PoolConfig::from_json(&json).unwrap(), config);
    }
}
