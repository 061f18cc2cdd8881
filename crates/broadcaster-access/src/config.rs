//! Access layer configuration.
//!
//! Controls how lookups that reference missing roles are treated. Values are
//! loaded from environment variables with lenient defaults for local
//! development.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Environment variable for [`AccessConfig::missing_role_policy`].
pub const MISSING_ROLE_POLICY_VAR: &str = "BROADCASTER_MISSING_ROLE_POLICY";

/// Environment variable for [`AccessConfig::dangling_bindings`].
pub const DANGLING_BINDINGS_VAR: &str = "BROADCASTER_DANGLING_BINDINGS";

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// What to do when a lookup by role name finds no role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingRolePolicy {
    /// Leave the name out of the result.
    #[default]
    Omit,
    /// Fail the whole lookup with `NotFound`.
    Report,
}

impl FromStr for MissingRolePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "omit" => Ok(Self::Omit),
            "report" => Ok(Self::Report),
            other => Err(ConfigError::InvalidValue {
                key: MISSING_ROLE_POLICY_VAR.to_string(),
                message: format!("expected omit or report, got '{}'", other),
            }),
        }
    }
}

/// What to do when a persisted binding points at a role that no longer
/// exists while a user snapshot is being built.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DanglingBindingPolicy {
    /// Drop the binding from the snapshot and log a warning.
    #[default]
    Skip,
    /// Fail the load with `NotFound`.
    Fail,
}

impl FromStr for DanglingBindingPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            other => Err(ConfigError::InvalidValue {
                key: DANGLING_BINDINGS_VAR.to_string(),
                message: format!("expected skip or fail, got '{}'", other),
            }),
        }
    }
}

/// Access layer configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessConfig {
    /// Policy for role names with no stored role when the service resolves
    /// grants, parents or user roles by name.
    #[serde(default)]
    pub missing_role_policy: MissingRolePolicy,

    /// Policy for bindings to deleted roles when loading a user.
    #[serde(default)]
    pub dangling_bindings: DanglingBindingPolicy,
}

impl AccessConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BROADCASTER_MISSING_ROLE_POLICY`: `omit` or `report` (default: omit)
    /// - `BROADCASTER_DANGLING_BINDINGS`: `skip` or `fail` (default: skip)
    ///
    /// Unset variables fall back to the defaults; set but unrecognised
    /// values are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        Ok(Self {
            missing_role_policy: lookup(MISSING_ROLE_POLICY_VAR)
                .map(|s| s.parse::<MissingRolePolicy>())
                .transpose()?
                .unwrap_or(default.missing_role_policy),
            dangling_bindings: lookup(DANGLING_BINDINGS_VAR)
                .map(|s| s.parse::<DanglingBindingPolicy>())
                .transpose()?
                .unwrap_or(default.dangling_bindings),
        })
    }

    /// Strict settings: unknown names and dangling bindings are errors.
    pub fn strict() -> Self {
        Self {
            missing_role_policy: MissingRolePolicy::Report,
            dangling_bindings: DanglingBindingPolicy::Fail,
        }
    }
}
