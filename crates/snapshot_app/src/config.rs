//! Monitor configuration: RON file defaults, overridden by command-line flags.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use monitor_logging::monitor_info;
use serde::{Deserialize, Serialize};
use snapshot_engine::{FetchSettings, StoreLayout};

pub const DEFAULT_CONFIG_FILE: &str = "snapshot_monitor.ron";
pub const DEFAULT_URL: &str = "https://mufi.info/";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub url: String,
    /// Directory holding `snapshots/` and `last_hash.txt`.
    pub root: PathBuf,
    pub timeout_secs: u64,
    pub max_bytes: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            root: PathBuf::from("."),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_bytes: None,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub root: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl MonitorConfig {
    /// Load `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read config {path:?}"))
            }
        };
        let config: Self =
            ron::from_str(&content).with_context(|| format!("failed to parse config {path:?}"))?;
        monitor_info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn apply(mut self, overrides: Overrides) -> anyhow::Result<Self> {
        if let Some(url) = overrides.url {
            self.url = url;
        }
        if let Some(root) = overrides.root {
            self.root = root;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        if self.timeout_secs == 0 {
            bail!("timeout must be at least one second");
        }
        Ok(self)
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        let mut settings = FetchSettings::with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(max_bytes) = self.max_bytes {
            settings.max_bytes = max_bytes;
        }
        settings
    }

    pub fn store_layout(&self) -> StoreLayout {
        StoreLayout::under(&self.root)
    }

    pub fn to_ron(&self) -> anyhow::Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())
            .context("failed to serialize configuration")
    }
}
