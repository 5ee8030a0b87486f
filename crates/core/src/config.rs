// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol policy configuration
//!
//! Groups every retry/backoff/wait knob in one serde structure, loadable
//! from TOML. Defaults match the protocol's reference tuning.

use crate::retry::{RetryPolicy, WaitPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Retry/backoff policies for every protocol loop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolPolicies {
    /// Exponential backoff for transient store failures during acquire
    pub acquire_transient: RetryPolicy,
    /// Fixed wait between acquire retries while the semaphore is saturated
    pub saturation: WaitPolicy,
    /// Exponential backoff for transient store failures during release
    pub release_transient: RetryPolicy,
    /// Budget spanning the reaper's inspect and release steps; generous
    /// because the reaper runs off the critical path
    pub reaper: RetryPolicy,
    /// Retries for "execution already exists" start collisions in the
    /// load harness
    pub start_collision: RetryPolicy,
}

impl Default for ProtocolPolicies {
    fn default() -> Self {
        Self {
            acquire_transient: RetryPolicy::new(6, Duration::from_secs(1), 2.0),
            saturation: WaitPolicy::new(Duration::from_secs(3), 200),
            release_transient: RetryPolicy::new(5, Duration::from_secs(1), 1.5),
            reaper: RetryPolicy::new(20, Duration::from_secs(5), 1.4),
            start_collision: RetryPolicy::new(3, Duration::from_millis(250), 2.0),
        }
    }
}

impl ProtocolPolicies {
    /// Parse policies from TOML; missing sections keep their defaults
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load policies from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Millisecond-scale policies so tests never sleep long
    pub fn for_testing() -> Self {
        Self {
            acquire_transient: RetryPolicy::new(6, Duration::from_millis(1), 2.0),
            saturation: WaitPolicy::new(Duration::from_millis(2), 50),
            release_transient: RetryPolicy::new(5, Duration::from_millis(1), 1.5),
            reaper: RetryPolicy::new(20, Duration::from_millis(2), 1.4),
            start_collision: RetryPolicy::new(3, Duration::from_millis(1), 2.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_reference_tuning() {
        let policies = ProtocolPolicies::default();

        assert_eq!(policies.acquire_transient.max_attempts, 6);
        assert_eq!(policies.acquire_transient.multiplier, 2.0);
        assert_eq!(policies.saturation.delay, Duration::from_secs(3));
        assert_eq!(policies.release_transient.max_attempts, 5);
        assert_eq!(policies.release_transient.multiplier, 1.5);
        assert_eq!(policies.reaper.max_attempts, 20);
        assert_eq!(policies.reaper.base_delay, Duration::from_secs(5));
        assert_eq!(policies.reaper.multiplier, 1.4);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_sections() {
        let policies = ProtocolPolicies::from_toml_str(
            r#"
            [saturation]
            delay = "500ms"
            max_waits = 10
            "#,
        )
        .unwrap();

        assert_eq!(policies.saturation.delay, Duration::from_millis(500));
        assert_eq!(policies.saturation.max_waits, 10);
        assert_eq!(policies.acquire_transient.max_attempts, 6);
    }

    #[test]
    fn full_toml_round_trip() {
        let policies = ProtocolPolicies::default();
        let toml = toml::to_string(&policies).unwrap();
        let restored = ProtocolPolicies::from_toml_str(&toml).unwrap();
        assert_eq!(restored, policies);
    }

    #[test]
    fn load_reads_a_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [reaper]
            max_attempts = 7
            base_delay = "2s"
            multiplier = 1.0
            "#
        )
        .unwrap();

        let policies = ProtocolPolicies::load(file.path()).unwrap();
        assert_eq!(policies.reaper.max_attempts, 7);
        assert_eq!(policies.reaper.base_delay, Duration::from_secs(2));
    }

    #[test]
    fn garbage_toml_is_a_parse_error() {
        let err = ProtocolPolicies::from_toml_str("not = [valid").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
