use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MIN_REFRESH_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_refresh")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_refresh() -> u64 {
    30
}

fn default_timeout() -> u64 {
    10
}

fn default_api_base_url() -> String {
    crate::api::coingecko::BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh(),
            request_timeout_secs: default_timeout(),
            api_base_url: default_api_base_url(),
        }
    }
}

impl Config {
    /// Reads `path` (or the default location), writing defaults on first run.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            Self::from_yaml(&contents)
        } else {
            let cfg = Config::default();
            cfg.save(&path)?;
            Ok(cfg)
        }
    }

    fn from_yaml(contents: &str) -> Result<Self> {
        let mut cfg: Config = serde_yaml::from_str(contents)?;
        if cfg.refresh_interval_secs < MIN_REFRESH_SECS {
            cfg.refresh_interval_secs = MIN_REFRESH_SECS;
        }
        if cfg.request_timeout_secs == 0 {
            cfg.request_timeout_secs = default_timeout();
        }
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("btcbrl");
        path.push("config.yaml");
        path
    }

    pub fn data_dir() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("btcbrl");
        path
    }
}
