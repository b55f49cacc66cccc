// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::AgentError;
use ec2_cloudwatch::metadata::DEFAULT_METADATA_URL;
use std::env;
use std::time::Duration;

pub const DEFAULT_NAMESPACE: &str = "EC2";
pub const DEFAULT_DISK_PATH: &str = "/";
pub const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CPU_SAMPLE_SECS: u64 = 1;
const MAX_NAMESPACE_LEN: usize = 255;
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for one agent process
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// CloudWatch namespace the metrics are published under
    pub namespace: String,
    /// Region override; the identity document's region is used otherwise
    pub region: Option<String>,
    /// Instance identity document endpoint
    pub metadata_url: String,
    /// Emit MemoryUtilization, MemoryUsed and MemoryAvailable
    pub memory: bool,
    /// Emit SwapUtilization, SwapUsed and SwapCached
    pub swap: bool,
    /// Paths whose filesystems get disk space and inode metrics
    pub disk_paths: Vec<String>,
    /// Also report every mounted physical partition
    pub all_partitions: bool,
    /// Emit CPUUtilization sampled over `cpu_sample`
    pub cpu: bool,
    pub cpu_sample: Duration,
    /// Process names reported with ProcessRunning
    pub processes: Vec<String>,
    /// Resolve the autoscaling group and publish group-level datums
    pub autoscaling: bool,
    /// Repeat every interval instead of running once
    pub interval: Option<Duration>,
    /// Log the batch instead of publishing it
    pub dry_run: bool,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            region: None,
            metadata_url: DEFAULT_METADATA_URL.to_string(),
            memory: true,
            swap: true,
            disk_paths: vec![DEFAULT_DISK_PATH.to_string()],
            all_partitions: false,
            cpu: false,
            cpu_sample: Duration::from_secs(DEFAULT_CPU_SAMPLE_SECS),
            processes: Vec::new(),
            autoscaling: false,
            interval: None,
            dry_run: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AgentConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, AgentError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from any key lookup, e.g. a map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key).map_or(default, |val| match val.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => default,
            })
        };
        let seconds = |key: &str| -> Result<Option<Duration>, AgentError> {
            lookup(key)
                .map(|val| {
                    val.trim().parse::<u64>().map(Duration::from_secs).map_err(|e| {
                        AgentError::InvalidConfig(format!("{key} must be a whole number of seconds: {e}"))
                    })
                })
                .transpose()
        };

        let config = Self {
            namespace: lookup("EC2_METRICS_NAMESPACE")
                .map_or(defaults.namespace, |val| val.trim().to_string()),
            region: lookup("EC2_METRICS_REGION")
                .map(|val| val.trim().to_string())
                .filter(|val| !val.is_empty()),
            metadata_url: lookup("EC2_METRICS_METADATA_URL").unwrap_or(defaults.metadata_url),
            memory: flag("EC2_METRICS_MEMORY", defaults.memory),
            swap: flag("EC2_METRICS_SWAP", defaults.swap),
            disk_paths: lookup("EC2_METRICS_DISK_PATHS")
                .map_or(defaults.disk_paths, |val| parse_list(&val)),
            all_partitions: flag("EC2_METRICS_ALL_PARTITIONS", defaults.all_partitions),
            cpu: flag("EC2_METRICS_CPU", defaults.cpu),
            cpu_sample: seconds("EC2_METRICS_CPU_SAMPLE_SECS")?.unwrap_or(defaults.cpu_sample),
            processes: lookup("EC2_METRICS_PROCESSES")
                .map(|val| parse_list(&val))
                .unwrap_or_default(),
            autoscaling: flag("EC2_METRICS_AUTOSCALING", defaults.autoscaling),
            interval: seconds("EC2_METRICS_INTERVAL_SECS")?,
            dry_run: flag("EC2_METRICS_DRY_RUN", defaults.dry_run),
            log_level: lookup("EC2_METRICS_LOG_LEVEL")
                .map_or(defaults.log_level, |val| val.trim().to_lowercase()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.namespace.is_empty() {
            return Err(AgentError::InvalidConfig(
                "EC2_METRICS_NAMESPACE cannot be empty".to_string(),
            ));
        }
        if self.namespace.len() > MAX_NAMESPACE_LEN {
            return Err(AgentError::InvalidConfig(format!(
                "EC2_METRICS_NAMESPACE is longer than {MAX_NAMESPACE_LEN} characters"
            )));
        }
        // CloudWatch rejects custom metrics in the AWS/ namespaces
        if self.namespace.starts_with("AWS/") {
            return Err(AgentError::InvalidConfig(format!(
                "Namespace '{}' is reserved for AWS services",
                self.namespace
            )));
        }

        if self.metadata_url.trim().is_empty() {
            return Err(AgentError::InvalidConfig(
                "EC2_METRICS_METADATA_URL cannot be empty".to_string(),
            ));
        }

        if self.cpu && self.cpu_sample.is_zero() {
            return Err(AgentError::InvalidConfig(
                "EC2_METRICS_CPU_SAMPLE_SECS must be greater than 0".to_string(),
            ));
        }

        if let Some(interval) = self.interval {
            if interval.is_zero() {
                return Err(AgentError::InvalidConfig(
                    "EC2_METRICS_INTERVAL_SECS must be greater than 0".to_string(),
                ));
            }
            if self.cpu && self.cpu_sample >= interval {
                return Err(AgentError::InvalidConfig(
                    "EC2_METRICS_CPU_SAMPLE_SECS must be shorter than EC2_METRICS_INTERVAL_SECS"
                        .to_string(),
                ));
            }
        }

        if !self.memory
            && !self.swap
            && !self.cpu
            && !self.all_partitions
            && self.disk_paths.is_empty()
            && self.processes.is_empty()
        {
            return Err(AgentError::InvalidConfig(
                "No metrics enabled".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(AgentError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AgentConfig, AgentError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AgentConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.namespace, "EC2");
        assert_eq!(config.disk_paths, vec!["/"]);
    }

    #[test]
    fn test_empty_lookup_gives_defaults() {
        assert_eq!(from_pairs(&[]).unwrap(), AgentConfig::default());
    }

    #[test]
    fn test_parses_every_setting() {
        let config = from_pairs(&[
            ("EC2_METRICS_NAMESPACE", "System/Linux"),
            ("EC2_METRICS_REGION", "eu-west-1"),
            ("EC2_METRICS_METADATA_URL", "http://127.0.0.1:1338/document"),
            ("EC2_METRICS_MEMORY", "false"),
            ("EC2_METRICS_SWAP", "0"),
            ("EC2_METRICS_DISK_PATHS", "/, /data ,,/var/log"),
            ("EC2_METRICS_ALL_PARTITIONS", "yes"),
            ("EC2_METRICS_CPU", "TRUE"),
            ("EC2_METRICS_CPU_SAMPLE_SECS", "5"),
            ("EC2_METRICS_PROCESSES", "sshd,crond"),
            ("EC2_METRICS_AUTOSCALING", "true"),
            ("EC2_METRICS_INTERVAL_SECS", "60"),
            ("EC2_METRICS_DRY_RUN", "1"),
            ("EC2_METRICS_LOG_LEVEL", "DEBUG"),
        ])
        .unwrap();

        assert_eq!(config.namespace, "System/Linux");
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.metadata_url, "http://127.0.0.1:1338/document");
        assert!(!config.memory);
        assert!(!config.swap);
        assert_eq!(config.disk_paths, vec!["/", "/data", "/var/log"]);
        assert!(config.all_partitions);
        assert!(config.cpu);
        assert_eq!(config.cpu_sample, Duration::from_secs(5));
        assert_eq!(config.processes, vec!["sshd", "crond"]);
        assert!(config.autoscaling);
        assert_eq!(config.interval, Some(Duration::from_secs(60)));
        assert!(config.dry_run);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_unrecognized_flag_keeps_default() {
        let config = from_pairs(&[("EC2_METRICS_MEMORY", "maybe")]).unwrap();
        assert!(config.memory);
    }

    #[test]
    fn test_blank_region_is_ignored() {
        let config = from_pairs(&[("EC2_METRICS_REGION", "  ")]).unwrap();
        assert_eq!(config.region, None);
    }

    #[test]
    fn test_invalid_interval() {
        assert!(from_pairs(&[("EC2_METRICS_INTERVAL_SECS", "soon")]).is_err());
        assert!(from_pairs(&[("EC2_METRICS_INTERVAL_SECS", "0")]).is_err());
    }

    #[test]
    fn test_cpu_sample_must_fit_interval() {
        let result = from_pairs(&[
            ("EC2_METRICS_CPU", "true"),
            ("EC2_METRICS_CPU_SAMPLE_SECS", "60"),
            ("EC2_METRICS_INTERVAL_SECS", "60"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_namespace() {
        for namespace in ["", "AWS/EC2"] {
            let config = AgentConfig {
                namespace: namespace.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "'{namespace}' should be invalid");
        }

        let config = AgentConfig {
            namespace: "x".repeat(256),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_nothing_enabled() {
        let config = AgentConfig {
            memory: false,
            swap: false,
            disk_paths: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = AgentConfig {
            log_level: "verbose".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        env::set_var("EC2_METRICS_NAMESPACE", "Custom/Hosts");
        env::set_var("EC2_METRICS_PROCESSES", "sshd");
        let config = AgentConfig::from_env();
        env::remove_var("EC2_METRICS_NAMESPACE");
        env::remove_var("EC2_METRICS_PROCESSES");

        let config = config.unwrap();
        assert_eq!(config.namespace, "Custom/Hosts");
        assert_eq!(config.processes, vec!["sshd"]);
    }
}
