//! Centralized configuration for tabkit.
//!
//! Constants for the frame format, retry behaviour and search ranking, plus
//! the optional JSON preferences file read by the command-line front end.

use crate::error::{Result, TabkitError};
use crate::store::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Session frame layout.
pub struct FrameConfig;

impl FrameConfig {
    pub const MAGIC: &'static [u8; 8] = b"mozLz40\0";
    pub const LENGTH_OFFSET: usize = 8;
    pub const HEADER_LEN: usize = 12;
    pub const MIN_MATCH: usize = 4;
}

/// Retry behaviour for locked databases.
pub struct RetryDefaults;

impl RetryDefaults {
    pub const MAX_ATTEMPTS: u32 = 3;
    pub const BASE_DELAY: Duration = Duration::from_millis(100);
}

/// Search ranking defaults.
pub struct SearchConfig;

impl SearchConfig {
    /// Fields whose similarity falls below this value do not contribute.
    pub const SIMILARITY_THRESHOLD: f64 = 0.6;
    pub const TITLE_WEIGHT: f64 = 3.0;
    pub const DOMAIN_WEIGHT: f64 = 1.0;
    pub const FOLDER_WEIGHT: f64 = 0.5;
    pub const DEVICE_WEIGHT: f64 = 0.5;
    pub const DEFAULT_LOCALE: &'static str = "default";
}

/// Device grouping.
pub struct DeviceConfig;

impl DeviceConfig {
    pub const CURRENT_DEVICE_LABEL: &'static str = "This Device";
    pub const CURRENT_DEVICE_ID: &'static str = "current";
}

/// Row limits for database reads.
pub struct QueryDefaults;

impl QueryDefaults {
    pub const BOOKMARK_LIMIT: u32 = 5_000;
    pub const HISTORY_LIMIT: u32 = 100;
}

/// User preferences loaded from a JSON file.
///
/// Every field is optional; missing values fall back to the constants above.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    /// Name this machine uses in the synced-tabs database.
    pub device_name: Option<String>,
    /// Locale whose normalizer is applied during search.
    pub locale: Option<String>,
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub similarity_threshold: Option<f64>,
    /// Synced-tabs database used for remote devices.
    pub remote_db: Option<PathBuf>,
    /// Program used to enumerate open tabs.
    pub enumerator_program: Option<String>,
    pub enumerator_args: Option<Vec<String>>,
}

impl Preferences {
    /// Load preferences from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| TabkitError::io_with_path(e, path))?;
        let prefs: Preferences =
            serde_json::from_str(&content).map_err(|e| TabkitError::Config {
                message: format!("Invalid preferences file {}: {}", path.display(), e),
            })?;
        prefs.validate()?;
        Ok(prefs)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == Some(0) {
            return Err(TabkitError::Config {
                message: "maxAttempts must be at least 1".into(),
            });
        }
        if let Some(threshold) = self.similarity_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(TabkitError::Config {
                    message: format!("similarityThreshold {} is outside 0..=1", threshold),
                });
            }
        }
        Ok(())
    }

    /// Retry policy built from these preferences.
    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::new();
        if let Some(attempts) = self.max_attempts {
            policy = policy.with_max_attempts(attempts);
        }
        if let Some(ms) = self.base_delay_ms {
            policy = policy.with_base_delay(Duration::from_millis(ms));
        }
        policy
    }

    pub fn locale(&self) -> &str {
        self.locale.as_deref().unwrap_or(SearchConfig::DEFAULT_LOCALE)
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
            .unwrap_or(SearchConfig::SIMILARITY_THRESHOLD)
    }
}
