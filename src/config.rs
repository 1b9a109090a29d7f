use crate::model::ResourceType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_REFRESH_SECS: u64 = 5;

/// Settings persisted between sessions.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_namespace", alias = "namespace")]
    pub last_namespace: String,
    #[serde(default, alias = "resource_type")]
    pub last_resource_type: ResourceType,
    #[serde(
        default = "default_refresh_secs",
        alias = "refresh_interval_secs",
        alias = "refresh"
    )]
    pub refresh_interval: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            last_namespace: default_namespace(),
            last_resource_type: ResourceType::default(),
            refresh_interval: default_refresh_secs(),
        }
    }
}

impl AppConfig {
    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_interval.max(1))
    }

    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut parsed: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        if parsed.last_namespace.trim().is_empty() {
            parsed.last_namespace = default_namespace();
        }
        Ok(parsed)
    }

    pub fn save(&self) -> Result<()> {
        let path = config_path().context("unable to determine config location (HOME is unset)")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir {}", parent.display()))?;
        }
        let rendered = serde_yaml::to_string(self).context("failed to serialize config")?;
        fs::write(path, rendered)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        Ok(())
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_refresh_secs() -> u64 {
    DEFAULT_REFRESH_SECS
}

pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("PODSCOPE_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    std::env::var("HOME")
        .ok()
        .filter(|home| !home.trim().is_empty())
        .map(|home| PathBuf::from(home).join(".config/podscope/config.yaml"))
}
