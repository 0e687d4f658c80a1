//! # Global engine configuration.
//!
//! Provides [`Config`] centralized settings for the resolution engine.
//!
//! ## Sentinel values
//! - `fetch_timeout = 0s` → no timeout on remote fetches
//! - `poll_interval` below 1ms is clamped to 1ms (the scheduler never busy-waits)

use std::time::Duration;

/// Default delay between two scheduler passes while runners are pending.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Protocol prefix that routes a specifier to the remote resource adapter.
pub const DEFAULT_REMOTE_PROTOCOL: &str = "ajax";

/// Global configuration for the resolution engine.
///
/// ## Field semantics
/// - `poll_interval`: upper bound on the wait between scheduler passes (min 1ms)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `fetch_timeout`: timeout for remote resource fetches (`0s` = none)
/// - `cache_bust`: append a random query parameter to remote URLs
/// - `remote_protocol`: specifier protocol handled by the remote adapter
#[derive(Clone, Debug)]
pub struct Config {
    /// Delay between scheduler passes while runners are pending.
    ///
    /// A resolution also wakes the scheduler early, so this only bounds
    /// the latency of a `run` callback.
    pub poll_interval: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages skip
    /// older items.
    pub bus_capacity: usize,

    /// Timeout applied to each remote resource fetch.
    ///
    /// - `Duration::ZERO` = no timeout
    /// - `> 0` = the in-flight request is aborted and reported as a fetch error
    pub fetch_timeout: Duration,

    /// Append `random=<n>` to remote URLs so intermediaries never serve a cached copy.
    pub cache_bust: bool,

    /// Protocol prefix of remote resource specifiers (`ajax` in `ajax:data.json`).
    pub remote_protocol: String,
}

impl Config {
    /// Returns the poll interval clamped to a minimum of 1ms.
    #[inline]
    pub fn poll_interval_clamped(&self) -> Duration {
        self.poll_interval.max(Duration::from_millis(1))
    }

    /// Returns the remote fetch timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → timeout applied per fetch
    #[inline]
    pub fn fetch_timeout(&self) -> Option<Duration> {
        if self.fetch_timeout == Duration::ZERO {
            None
        } else {
            Some(self.fetch_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `poll_interval = 20ms`
    /// - `bus_capacity = 1024`
    /// - `fetch_timeout = 0s` (no timeout)
    /// - `cache_bust = true`
    /// - `remote_protocol = "ajax"`
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            bus_capacity: 1024,
            fetch_timeout: Duration::ZERO,
            cache_bust: true,
            remote_protocol: DEFAULT_REMOTE_PROTOCOL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fetch_timeout_means_none() {
        let cfg = Config::default();
        assert_eq!(cfg.fetch_timeout(), None);

        let cfg = Config {
            fetch_timeout: Duration::from_secs(2),
            ..Config::default()
        };
        assert_eq!(cfg.fetch_timeout(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn poll_interval_never_zero() {
        let cfg = Config {
            poll_interval: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(cfg.poll_interval_clamped(), Duration::from_millis(1));
        assert_eq!(Config::default().poll_interval_clamped(), DEFAULT_POLL_INTERVAL);
    }
}
