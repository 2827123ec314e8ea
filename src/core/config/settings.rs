// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Engine Settings
//!
//! Layered key-value settings with source tracking. A property set by a higher
//! priority source is never overridden by a lower one.
//!
//! ## Property Sources (Priority: Low to High)
//!
//! 1. **Default** - Built-in Rust defaults
//! 2. **TomlFile** - `entity-validator.toml` (nested tables flattened to dotted keys)
//! 3. **Environment** - `ENTITY_VALIDATOR_*` variables
//! 4. **Override** - Explicit overrides (CLI flags, tests)
//!
//! ```rust,ignore
//! let mut flat = FlatConfig::from_toml_str(&std::fs::read_to_string("entity-validator.toml")?)?;
//! flat.apply_env(std::env::vars());
//! flat.set("validation.match-threshold", "95", PropertySource::Override);
//! let settings = ValidatorSettings::from_flat_config(&flat)?;
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::retry::parse_duration;
use crate::core::error::{RetryConfig, ValidatorError, ValidatorResult};

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "ENTITY_VALIDATOR_";

/// Every key the engine reads. Environment variables are matched against this list.
pub const KNOWN_KEYS: &[&str] = &[
    "validation.sample-limit",
    "validation.fk-sample-limit",
    "validation.type-sample-limit",
    "validation.match-threshold",
    "validation.sample-timeout",
    "validation.max-concurrency",
    "validation.cache-ttl",
    "sampling.retry.max-attempts",
    "sampling.retry.backoff",
    "sampling.retry.initial-delay",
    "sampling.retry.max-delay",
    "fix.backup-dir",
];

/// Property source identifier with priority ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertySource {
    Default,
    TomlFile,
    Environment,
    Override,
}

impl PropertySource {
    /// Numeric priority for comparison (higher = more important)
    #[inline]
    pub const fn priority(&self) -> u8 {
        match self {
            PropertySource::Default => 0,
            PropertySource::TomlFile => 1,
            PropertySource::Environment => 2,
            PropertySource::Override => 3,
        }
    }

    #[inline]
    pub const fn description(&self) -> &'static str {
        match self {
            PropertySource::Default => "Rust default",
            PropertySource::TomlFile => "TOML settings file",
            PropertySource::Environment => "environment variable",
            PropertySource::Override => "explicit override",
        }
    }
}

/// Flat key-value configuration with source tracking
#[derive(Debug, Clone, Default)]
pub struct FlatConfig {
    properties: HashMap<String, String>,
    sources: HashMap<String, PropertySource>,
}

impl FlatConfig {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property unless an equal or higher priority source already set it
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>, source: PropertySource) {
        let key = key.into();

        if let Some(existing_source) = self.sources.get(&key) {
            if existing_source.priority() > source.priority() {
                return;
            }
        }

        self.properties.insert(key.clone(), value.into());
        self.sources.insert(key, source);
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&String> {
        self.properties.get(key)
    }

    /// Get a property value with its source
    #[inline]
    pub fn get_with_source(&self, key: &str) -> Option<(&String, PropertySource)> {
        self.properties
            .get(key)
            .and_then(|value| self.sources.get(key).map(|source| (value, *source)))
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Merge another configuration into this one (respects priorities)
    pub fn merge(&mut self, other: &FlatConfig) {
        for (key, value) in &other.properties {
            if let Some(source) = other.sources.get(key) {
                self.set(key.clone(), value.clone(), *source);
            }
        }
    }

    /// Parse a TOML settings document, flattening nested tables to dotted keys
    pub fn from_toml_str(content: &str) -> ValidatorResult<Self> {
        let table: toml::Table = content.parse()?;
        let mut config = FlatConfig::new();
        flatten_toml("", &toml::Value::Table(table), &mut config);
        Ok(config)
    }

    /// Apply `ENTITY_VALIDATOR_*` overrides for every known key
    ///
    /// `validation.match-threshold` is read from
    /// `ENTITY_VALIDATOR_VALIDATION_MATCH_THRESHOLD`.
    pub fn apply_env<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(name, _)| name.starts_with(ENV_PREFIX))
            .collect();

        for key in KNOWN_KEYS {
            if let Some(value) = vars.get(&env_var_name(key)) {
                log::debug!("Settings: '{}' overridden from environment", key);
                self.set(*key, value.clone(), PropertySource::Environment);
            }
        }
    }
}

/// Environment variable name for a dotted settings key
pub fn env_var_name(key: &str) -> String {
    format!(
        "{}{}",
        ENV_PREFIX,
        key.replace(['.', '-'], "_").to_uppercase()
    )
}

fn flatten_toml(prefix: &str, value: &toml::Value, out: &mut FlatConfig) {
    match value {
        toml::Value::Table(table) => {
            for (key, nested) in table {
                let full_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_toml(&full_key, nested, out);
            }
        }
        toml::Value::String(s) => out.set(prefix, s.clone(), PropertySource::TomlFile),
        other => out.set(prefix, other.to_string(), PropertySource::TomlFile),
    }
}

/// Typed engine settings
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorSettings {
    /// Row cap for column/key/emptiness checks
    pub sample_limit: usize,
    /// Row cap for referential integrity checks
    pub fk_sample_limit: usize,
    /// Row cap for join type inference
    pub type_sample_limit: usize,
    /// Percentage of matched rows below which unmatched FKs are high priority
    pub match_threshold: f64,
    pub sample_timeout: Duration,
    pub max_concurrency: usize,
    /// Zero disables the sample cache
    pub cache_ttl: Duration,
    pub retry: RetryConfig,
    pub backup_dir: PathBuf,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            sample_limit: 1000,
            fk_sample_limit: 1000,
            type_sample_limit: 100,
            match_threshold: 90.0,
            sample_timeout: Duration::from_secs(30),
            max_concurrency: num_cpus::get().clamp(1, 8),
            cache_ttl: Duration::from_secs(300),
            retry: RetryConfig::default(),
            backup_dir: PathBuf::from("backups"),
        }
    }
}

impl ValidatorSettings {
    /// Build typed settings, falling back to defaults for absent keys
    pub fn from_flat_config(config: &FlatConfig) -> ValidatorResult<Self> {
        let defaults = Self::default();

        let settings = Self {
            sample_limit: parse_key(config, "validation.sample-limit", parse_positive)?
                .unwrap_or(defaults.sample_limit),
            fk_sample_limit: parse_key(config, "validation.fk-sample-limit", parse_positive)?
                .unwrap_or(defaults.fk_sample_limit),
            type_sample_limit: parse_key(config, "validation.type-sample-limit", parse_positive)?
                .unwrap_or(defaults.type_sample_limit),
            match_threshold: parse_key(config, "validation.match-threshold", parse_percentage)?
                .unwrap_or(defaults.match_threshold),
            sample_timeout: parse_key(config, "validation.sample-timeout", parse_duration)?
                .unwrap_or(defaults.sample_timeout),
            max_concurrency: parse_key(config, "validation.max-concurrency", parse_positive)?
                .unwrap_or(defaults.max_concurrency),
            cache_ttl: parse_key(config, "validation.cache-ttl", parse_duration)?
                .unwrap_or(defaults.cache_ttl),
            retry: RetryConfig::from_flat_config(config)
                .map_err(|e| ValidatorError::configuration_with_key(e, "sampling.retry"))?,
            backup_dir: config
                .get("fix.backup-dir")
                .map(PathBuf::from)
                .unwrap_or(defaults.backup_dir),
        };

        if settings.sample_timeout.is_zero() {
            return Err(ValidatorError::configuration_with_key(
                "sample timeout must be greater than zero",
                "validation.sample-timeout",
            ));
        }

        Ok(settings)
    }

    /// Largest row count any data check needs from one entity
    pub fn max_sample_rows(&self) -> usize {
        self.sample_limit
            .max(self.fk_sample_limit)
            .max(self.type_sample_limit)
    }
}

fn parse_key<T>(
    config: &FlatConfig,
    key: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> ValidatorResult<Option<T>> {
    config
        .get(key)
        .map(|raw| {
            parse(raw).map_err(|e| ValidatorError::configuration_with_key(format!("{}: {}", key, e), key))
        })
        .transpose()
}

fn parse_positive(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(format!("expected a positive integer, got '{}'", raw)),
        Ok(n) => Ok(n),
    }
}

fn parse_percentage(raw: &str) -> Result<f64, String> {
    let value = raw
        .trim()
        .trim_end_matches('%')
        .parse::<f64>()
        .map_err(|_| format!("expected a percentage, got '{}'", raw))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(format!("percentage must be within 0..=100, got {}", value));
    }
    Ok(value)
}
