//! Application configuration management

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::executor::{RetryConfig, ScanLimits};
use crate::transform::{BindingStrategy, TransformOptions};

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// How field-level @count finds its backing table (`relationship` or `index`)
    pub binding_strategy: BindingStrategy,

    /// API identifier used in backing table names (`<Type>-<apiId>-<env>`)
    pub api_id: String,

    /// Deployment environment name used in backing table names
    pub env_name: String,

    /// Local path to the packaged count executor
    pub handler_artifact: String,

    /// Runtime identifier for the count executor compute resource
    pub handler_runtime: String,

    /// Maximum scan pages per count invocation (0 = unbounded)
    pub max_pages: u32,

    /// Wall-clock ceiling per count invocation, in seconds
    pub deadline_secs: Option<u64>,

    /// Maximum attempts for a throttled scan page
    pub retry_max: u32,

    /// Initial retry backoff, in milliseconds
    pub retry_initial_ms: u64,

    /// Maximum retry backoff, in milliseconds
    pub retry_max_ms: u64,

    /// DynamoDB endpoint override for local stores; the AWS default when unset
    pub dynamo_endpoint: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let binding_strategy = match lookup("COUNT_BINDING_STRATEGY") {
            Some(value) => value
                .parse::<BindingStrategy>()
                .map_err(anyhow::Error::msg)
                .context("Invalid COUNT_BINDING_STRATEGY")?,
            None => BindingStrategy::default(),
        };

        Ok(Self {
            binding_strategy,

            api_id: lookup("COUNT_API_ID").unwrap_or_else(|| "local".to_string()),

            env_name: lookup("COUNT_ENV").unwrap_or_else(|| "NONE".to_string()),

            handler_artifact: lookup("COUNT_HANDLER_ARTIFACT")
                .unwrap_or_else(|| "handler/handler.zip".to_string()),

            handler_runtime: lookup("COUNT_HANDLER_RUNTIME")
                .unwrap_or_else(|| "provided.al2023".to_string()),

            max_pages: lookup("COUNT_MAX_PAGES")
                .unwrap_or_else(|| "10000".to_string())
                .parse()
                .context("Invalid COUNT_MAX_PAGES")?,

            deadline_secs: lookup("COUNT_DEADLINE_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("Invalid COUNT_DEADLINE_SECS")?,

            retry_max: lookup("COUNT_RETRY_MAX")
                .unwrap_or_else(|| "3".to_string())
                .parse()
                .context("Invalid COUNT_RETRY_MAX")?,

            retry_initial_ms: lookup("COUNT_RETRY_INITIAL_MS")
                .unwrap_or_else(|| "100".to_string())
                .parse()
                .unwrap_or(100),

            retry_max_ms: lookup("COUNT_RETRY_MAX_MS")
                .unwrap_or_else(|| "5000".to_string())
                .parse()
                .unwrap_or(5000),

            dynamo_endpoint: lookup("COUNT_DYNAMO_ENDPOINT").filter(|v| !v.is_empty()),
        })
    }

    /// Options for the schema transform
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            binding_strategy: self.binding_strategy,
            api_id: self.api_id.clone(),
            env_name: self.env_name.clone(),
            handler_artifact: self.handler_artifact.clone(),
            handler_runtime: self.handler_runtime.clone(),
        }
    }

    /// Operational bounds for the count executor
    pub fn scan_limits(&self) -> ScanLimits {
        ScanLimits {
            max_pages: (self.max_pages > 0).then_some(self.max_pages),
            deadline: self.deadline_secs.map(Duration::from_secs),
            retry: RetryConfig {
                max_retries: self.retry_max,
                initial_interval: Duration::from_millis(self.retry_initial_ms),
                max_interval: Duration::from_millis(self.retry_max_ms),
                ..RetryConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.binding_strategy, BindingStrategy::Relationship);
        assert_eq!(config.env_name, "NONE");
        assert_eq!(config.max_pages, 10000);
        assert!(config.deadline_secs.is_none());
        assert!(config.dynamo_endpoint.is_none());

        let limits = config.scan_limits();
        assert_eq!(limits.max_pages, Some(10000));
        assert_eq!(limits.retry.max_retries, 3);
    }

    #[test]
    fn test_zero_max_pages_is_unbounded() {
        let config = Config::from_lookup(lookup_from(&[("COUNT_MAX_PAGES", "0")])).unwrap();
        assert_eq!(config.scan_limits().max_pages, None);
    }

    #[test]
    fn test_index_strategy() {
        let config =
            Config::from_lookup(lookup_from(&[("COUNT_BINDING_STRATEGY", "index")])).unwrap();
        assert_eq!(config.transform_options().binding_strategy, BindingStrategy::Index);
    }

    #[test]
    fn test_local_store_endpoint() {
        let config = Config::from_lookup(lookup_from(&[
            ("COUNT_DYNAMO_ENDPOINT", "http://localhost:8000"),
            ("COUNT_DEADLINE_SECS", "20"),
        ]))
        .unwrap();
        assert_eq!(config.dynamo_endpoint.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.scan_limits().deadline, Some(Duration::from_secs(20)));

        let config = Config::from_lookup(lookup_from(&[("COUNT_DYNAMO_ENDPOINT", "")])).unwrap();
        assert!(config.dynamo_endpoint.is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("COUNT_BINDING_STRATEGY", "both")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("COUNT_MAX_PAGES", "many")])).is_err());
    }
}
