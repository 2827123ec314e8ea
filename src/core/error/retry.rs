// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry configuration and backoff strategies for data sampling.
//!
//! Sampling goes through out-of-process drivers that fail transiently. The
//! suite retries a failed sample according to `sampling.retry.*` before the
//! failure is reported as an unavailable check.

use crate::core::config::FlatConfig;
use std::time::Duration;

/// Backoff strategy for retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackoffStrategy {
    /// delay = initial_delay * 2^(attempt-1)
    #[default]
    Exponential,
    /// delay = initial_delay * attempt
    Linear,
    /// delay = initial_delay
    Fixed,
}

impl BackoffStrategy {
    /// Parse backoff strategy from string (case-insensitive)
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "exponential" => Ok(BackoffStrategy::Exponential),
            "linear" => Ok(BackoffStrategy::Linear),
            "fixed" => Ok(BackoffStrategy::Fixed),
            _ => Err(format!(
                "Invalid backoff strategy '{}'. Valid values: 'exponential', 'linear', 'fixed'",
                s
            )),
        }
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            BackoffStrategy::Exponential => "exponential",
            BackoffStrategy::Linear => "linear",
            BackoffStrategy::Fixed => "fixed",
        }
    }
}

/// Retry configuration for one sample request
///
/// `max_attempts` counts the first try, so `1` disables retrying.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub backoff: BackoffStrategy,
    pub initial_delay: Duration,
    /// Cap for exponential growth
    pub max_delay: Duration,
}

impl RetryConfig {
    pub fn new(
        max_attempts: usize,
        backoff: BackoffStrategy,
        initial_delay: Duration,
        max_delay: Duration,
    ) -> Result<Self, String> {
        if max_attempts == 0 {
            return Err("max_attempts must be greater than 0".to_string());
        }

        if initial_delay > max_delay {
            return Err("initial_delay cannot be greater than max_delay".to_string());
        }

        Ok(Self {
            max_attempts,
            backoff,
            initial_delay,
            max_delay,
        })
    }

    /// Parse retry configuration from FlatConfig
    ///
    /// Defaults: a single attempt, exponential backoff, 100ms initial delay,
    /// 5s max delay.
    pub fn from_flat_config(config: &FlatConfig) -> Result<Self, String> {
        let max_attempts = config
            .get("sampling.retry.max-attempts")
            .map(|s| {
                s.parse::<usize>().map_err(|_| {
                    "sampling.retry.max-attempts must be a positive integer".to_string()
                })
            })
            .transpose()?
            .unwrap_or(1);

        let backoff = config
            .get("sampling.retry.backoff")
            .map(|s| BackoffStrategy::parse(s))
            .transpose()?
            .unwrap_or_default();

        let initial_delay = config
            .get("sampling.retry.initial-delay")
            .map(|s| parse_duration(s))
            .transpose()?
            .unwrap_or(Duration::from_millis(100));

        let max_delay = config
            .get("sampling.retry.max-delay")
            .map(|s| parse_duration(s))
            .transpose()?
            .unwrap_or(Duration::from_secs(5));

        Self::new(max_attempts, backoff, initial_delay, max_delay)
            .map_err(|e| format!("sampling.retry: {}", e))
    }

    /// Delay before retry number `attempt` (1-indexed)
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay = match self.backoff {
            BackoffStrategy::Exponential => {
                let multiplier = 2u32.saturating_pow((attempt - 1).min(31) as u32);
                self.initial_delay.saturating_mul(multiplier)
            }
            BackoffStrategy::Linear => self.initial_delay.saturating_mul(attempt as u32),
            BackoffStrategy::Fixed => self.initial_delay,
        };
        delay.min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: BackoffStrategy::Exponential,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Duration setting: "100ms", "30s", "2m"; a bare number is milliseconds
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let raw = s.trim();
    let (digits, unit_millis) = [("ms", 1u64), ("s", 1_000), ("m", 60_000)]
        .iter()
        .find_map(|(suffix, millis)| raw.strip_suffix(*suffix).map(|rest| (rest.trim(), *millis)))
        .unwrap_or((raw, 1));

    digits
        .parse::<u64>()
        .map(|n| Duration::from_millis(n.saturating_mul(unit_millis)))
        .map_err(|_| format!("Invalid duration '{}': use a number with ms, s or m", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PropertySource;

    #[test]
    fn test_backoff_strategy_parse() {
        assert_eq!(
            BackoffStrategy::parse("Exponential").unwrap(),
            BackoffStrategy::Exponential
        );
        assert_eq!(BackoffStrategy::parse("linear").unwrap(), BackoffStrategy::Linear);
        assert_eq!(BackoffStrategy::parse("fixed").unwrap(), BackoffStrategy::Fixed);
        assert!(BackoffStrategy::parse("random").is_err());
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let config = RetryConfig::new(
            5,
            BackoffStrategy::Exponential,
            Duration::from_millis(100),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(config.calculate_delay(0), Duration::ZERO);
        assert_eq!(config.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(config.calculate_delay(2), Duration::from_millis(200));
        assert_eq!(config.calculate_delay(3), Duration::from_millis(400));
        assert_eq!(config.calculate_delay(10), Duration::from_secs(1));
        assert_eq!(config.calculate_delay(200), Duration::from_secs(1));
    }

    #[test]
    fn test_linear_and_fixed_delay() {
        let mut config = RetryConfig::default();
        config.backoff = BackoffStrategy::Linear;
        assert_eq!(config.calculate_delay(3), Duration::from_millis(300));

        config.backoff = BackoffStrategy::Fixed;
        assert_eq!(config.calculate_delay(7), Duration::from_millis(100));
    }

    #[test]
    fn test_retry_config_rejects_invalid_values() {
        assert!(RetryConfig::new(
            0,
            BackoffStrategy::Fixed,
            Duration::from_millis(1),
            Duration::from_millis(2)
        )
        .is_err());
        assert!(RetryConfig::new(
            3,
            BackoffStrategy::Fixed,
            Duration::from_secs(10),
            Duration::from_secs(1)
        )
        .is_err());
    }

    #[test]
    fn test_retry_config_from_flat_config() {
        let mut config = FlatConfig::new();
        assert_eq!(RetryConfig::from_flat_config(&config).unwrap(), RetryConfig::default());

        config.set("sampling.retry.max-attempts", "4", PropertySource::TomlFile);
        config.set("sampling.retry.backoff", "linear", PropertySource::TomlFile);
        config.set("sampling.retry.initial-delay", "250ms", PropertySource::TomlFile);
        config.set("sampling.retry.max-delay", "2s", PropertySource::TomlFile);

        let retry = RetryConfig::from_flat_config(&config).unwrap();
        assert_eq!(retry.max_attempts, 4);
        assert_eq!(retry.backoff, BackoffStrategy::Linear);
        assert_eq!(retry.initial_delay, Duration::from_millis(250));
        assert_eq!(retry.max_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("2 m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1500").unwrap(), Duration::from_millis(1500));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("").is_err());
    }
}
