// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal configuration
//!
//! Runtime tuning (`JournalConfig`) is loadable from TOML:
//!
//! ```toml
//! direct_io = true
//! write_retries = 5
//! retry_backoff = "1ms"
//! distill_backoff = "1ms"
//! commit_interval = "1s"
//! pool_prefill = 8
//! pool_max = 0        # 0 = slots + 1
//! ```
//!
//! On-disk geometry (`FormatOptions`) is fixed when the store is formatted.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Runtime tuning for an open journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JournalConfig {
    /// Open the store with O_DIRECT (falls back when the filesystem refuses)
    pub direct_io: bool,
    /// Retries of a slot write that failed with a transient error
    pub write_retries: u32,
    /// Pause between transient write retries
    #[serde(with = "humantime_serde")]
    pub retry_backoff: Duration,
    /// Pause while a reserver waits behind an undistilled entry
    #[serde(with = "humantime_serde")]
    pub distill_backoff: Duration,
    /// Longest the worker sleeps between passes; about the store's commit interval
    #[serde(with = "humantime_serde")]
    pub commit_interval: Duration,
    /// Entry buffers created when recovery completes
    pub pool_prefill: usize,
    /// Cap on entry buffers in circulation (0 = slots + 1)
    pub pool_max: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            direct_io: true,
            write_retries: 5,
            retry_backoff: Duration::from_millis(1),
            distill_backoff: Duration::from_millis(1),
            commit_interval: Duration::from_secs(1),
            pool_prefill: 8,
            pool_max: 0,
        }
    }
}

impl JournalConfig {
    /// Configuration suitable for tests: buffered I/O and short waits.
    pub fn for_testing() -> Self {
        Self {
            direct_io: false,
            write_retries: 2,
            retry_backoff: Duration::from_millis(1),
            distill_backoff: Duration::from_millis(1),
            commit_interval: Duration::from_millis(20),
            pool_prefill: 2,
            pool_max: 0,
        }
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.commit_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "commit_interval must be greater than zero".to_string(),
            ));
        }
        if self.pool_max != 0 && self.pool_prefill > self.pool_max {
            return Err(ConfigError::Invalid(format!(
                "pool_prefill ({}) exceeds pool_max ({})",
                self.pool_prefill, self.pool_max
            )));
        }
        Ok(())
    }

    pub fn with_direct_io(mut self, enabled: bool) -> Self {
        self.direct_io = enabled;
        self
    }

    pub fn with_commit_interval(mut self, interval: Duration) -> Self {
        self.commit_interval = interval;
        self
    }

    pub fn with_pool_max(mut self, max: usize) -> Self {
        self.pool_max = max;
        self
    }

    /// Effective buffer cap for a journal of `slots` slots.
    pub fn pool_limit(&self, slots: u32) -> usize {
        if self.pool_max == 0 {
            slots as usize + 1
        } else {
            self.pool_max
        }
    }
}

/// Geometry chosen when a store is formatted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatOptions {
    /// Bytes per slot, a multiple of 512
    pub entry_size: usize,
    /// Number of slots
    pub slots: u32,
    /// Slots read per batch during recovery scans
    pub scan_batch: u32,
    /// Identity of the store this journal belongs to; random when unset
    pub store_uuid: Option<u64>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            entry_size: 4096,
            slots: 1024,
            scan_batch: 64,
            store_uuid: None,
        }
    }
}

impl FormatOptions {
    pub fn new(entry_size: usize, slots: u32) -> Self {
        Self {
            entry_size,
            slots,
            ..Self::default()
        }
    }

    pub fn with_scan_batch(mut self, scan_batch: u32) -> Self {
        self.scan_batch = scan_batch;
        self
    }

    pub fn with_store_uuid(mut self, uuid: u64) -> Self {
        self.store_uuid = Some(uuid);
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
