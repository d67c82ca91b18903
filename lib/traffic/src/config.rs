// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Service configuration.
//!
//! Settings merge three layers, last wins: built-in defaults, an optional
//! TOML file under `/etc/smartpath/`, and `SP_SENSOR_` / `SP_ROUTE_`
//! prefixed environment variables. Empty environment variables count as
//! unset.

use std::path::PathBuf;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default bind host for both services
const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port for both services
const DEFAULT_PORT: u16 = 8000;

/// Default artifact directory for the sensor service
const DEFAULT_MODEL_DIR: &str = "sensor_models";

/// Sensor model registry service configuration
#[derive(Serialize, Deserialize, Validate, Debug, Clone)]
pub struct SensorServiceConfig {
    /// Bind host.
    /// Set at runtime with environment variable SP_SENSOR_HOST.
    #[validate(length(min = 1))]
    pub host: String,

    /// Bind port.
    /// Set at runtime with environment variable SP_SENSOR_PORT.
    pub port: u16,

    /// Directory scanned for `model_<sensor_id>.json` artifacts.
    /// Set at runtime with environment variable SP_SENSOR_MODEL_DIR.
    pub model_dir: PathBuf,
}

impl Default for SensorServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
        }
    }
}

impl SensorServiceConfig {
    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(SensorServiceConfig::default()))
            .merge(Toml::file("/etc/smartpath/sensor.toml"))
            .merge(Env::prefixed("SP_SENSOR_").filter_map(|k| {
                let full_key = format!("SP_SENSOR_{}", k.as_str());
                // filters out empty environment variables
                match std::env::var(&full_key) {
                    Ok(v) if !v.is_empty() => Some(k.into()),
                    _ => None,
                }
            }))
    }

    /// Load the sensor service configuration. Priority, highest first:
    /// 1. `SP_SENSOR_*` environment variables
    /// 2. `/etc/smartpath/sensor.toml`
    /// 3. built-in defaults
    pub fn from_settings() -> Result<SensorServiceConfig> {
        let config: SensorServiceConfig = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }
}

/// Route estimation service configuration
#[derive(Serialize, Deserialize, Validate, Debug, Clone)]
pub struct RouteServiceConfig {
    /// Bind host.
    /// Set at runtime with environment variable SP_ROUTE_HOST.
    #[validate(length(min = 1))]
    pub host: String,

    /// Bind port.
    /// Set at runtime with environment variable SP_ROUTE_PORT.
    pub port: u16,

    /// Model artifact path. When unset the service looks for `model.json`
    /// next to the running executable.
    /// Set at runtime with environment variable SP_ROUTE_MODEL_PATH.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
}

impl Default for RouteServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_path: None,
        }
    }
}

impl RouteServiceConfig {
    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(RouteServiceConfig::default()))
            .merge(Toml::file("/etc/smartpath/route.toml"))
            .merge(Env::prefixed("SP_ROUTE_").filter_map(|k| {
                let full_key = format!("SP_ROUTE_{}", k.as_str());
                // filters out empty environment variables
                match std::env::var(&full_key) {
                    Ok(v) if !v.is_empty() => Some(k.into()),
                    _ => None,
                }
            }))
    }

    /// Load the route service configuration. Priority, highest first:
    /// 1. `SP_ROUTE_*` environment variables
    /// 2. `/etc/smartpath/route.toml`
    /// 3. built-in defaults
    pub fn from_settings() -> Result<RouteServiceConfig> {
        let config: RouteServiceConfig = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }
}

/// Check if a string is truthy
/// Used to evaluate environment variables or other subjective configuration
/// parameters that should be read as booleans
pub fn is_truthy(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "on" | "yes")
}

/// Check if an environment variable is truthy; unset counts as false
pub fn env_is_truthy(env: &str) -> bool {
    match std::env::var(env) {
        Ok(val) => is_truthy(val.as_str()),
        Err(_) => false,
    }
}

/// Check whether JSONL logging is enabled.
/// Set the `SP_LOGGING_JSONL` environment variable to a [`is_truthy`] value
pub fn jsonl_logging_enabled() -> bool {
    env_is_truthy("SP_LOGGING_JSONL")
}

/// Check whether logging with ANSI terminal escape codes and colors is
/// disabled.
/// Set the `SP_DISABLE_ANSI_LOGGING` environment variable to a [`is_truthy`] value
pub fn disable_ansi_logging() -> bool {
    env_is_truthy("SP_DISABLE_ANSI_LOGGING")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_config_from_env_vars() -> Result<()> {
        temp_env::with_vars(
            vec![
                ("SP_SENSOR_PORT", Some("8123")),
                ("SP_SENSOR_MODEL_DIR", Some("/srv/models")),
            ],
            || {
                let config = SensorServiceConfig::from_settings()?;
                assert_eq!(config.port, 8123);
                assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
                assert_eq!(config.host, DEFAULT_HOST);
                Ok(())
            },
        )
    }

    #[test]
    fn test_sensor_config_ignores_empty_env_vars() -> Result<()> {
        temp_env::with_vars(
            vec![
                ("SP_SENSOR_PORT", None::<&str>),
                ("SP_SENSOR_MODEL_DIR", Some("")),
            ],
            || {
                let config = SensorServiceConfig::from_settings()?;
                assert_eq!(config.port, DEFAULT_PORT);
                assert_eq!(config.model_dir, PathBuf::from(DEFAULT_MODEL_DIR));
                Ok(())
            },
        )
    }

    #[test]
    fn test_sensor_config_rejects_empty_host() {
        let config = SensorServiceConfig {
            host: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_route_config_model_path_from_env() -> Result<()> {
        temp_env::with_vars(
            vec![("SP_ROUTE_MODEL_PATH", Some("/srv/route/model.json"))],
            || {
                let config = RouteServiceConfig::from_settings()?;
                assert_eq!(
                    config.model_path,
                    Some(PathBuf::from("/srv/route/model.json"))
                );
                Ok(())
            },
        )
    }

    #[test]
    fn test_route_config_defaults() -> Result<()> {
        temp_env::with_vars(
            vec![
                ("SP_ROUTE_MODEL_PATH", None::<&str>),
                ("SP_ROUTE_PORT", None::<&str>),
            ],
            || {
                let config = RouteServiceConfig::from_settings()?;
                assert_eq!(config.model_path, None);
                assert_eq!(config.port, DEFAULT_PORT);
                assert_eq!(config.host, DEFAULT_HOST);
                Ok(())
            },
        )
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("on"));
        assert!(is_truthy("yes"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn test_env_is_truthy() {
        temp_env::with_vars(vec![("SP_TEST_TRUTHY", Some("on"))], || {
            assert!(env_is_truthy("SP_TEST_TRUTHY"));
        });
        temp_env::with_vars(vec![("SP_TEST_TRUTHY", Some("off"))], || {
            assert!(!env_is_truthy("SP_TEST_TRUTHY"));
        });
        temp_env::with_vars(vec![("SP_TEST_TRUTHY", None::<&str>)], || {
            assert!(!env_is_truthy("SP_TEST_TRUTHY"));
        });
    }
}
