use anyhow::{Context, Result};
use arena_vision::VisionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Args;

/// Bot settings, read from an optional JSON file and overridden by CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub adb_path: PathBuf,
    pub device_id: Option<String>,
    pub templates_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Replay screenshots from this directory instead of a device
    pub replay_dir: Option<PathBuf>,
    pub tick_interval_ms: u64,
    pub swipe_duration_ms: u64,
    pub adb_timeout_secs: u64,
    /// Tap through menus and post-game screens
    pub auto_navigate: bool,
    pub vision: VisionConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            adb_path: "adb".into(),
            device_id: None,
            templates_dir: "templates".into(),
            data_dir: "data".into(),
            replay_dir: None,
            tick_interval_ms: 1000,
            swipe_duration_ms: 500,
            adb_timeout_secs: 10,
            auto_navigate: true,
            vision: VisionConfig::default(),
        }
    }
}

impl BotConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Config file (if given) with CLI flags applied on top.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        Ok(config)
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(dir) = &args.templates {
            self.templates_dir = dir.clone();
        }
        if let Some(dir) = &args.data {
            self.data_dir = dir.clone();
        }
        if let Some(id) = &args.device {
            self.device_id = Some(id.clone());
        }
        if let Some(adb) = &args.adb {
            self.adb_path = adb.clone();
        }
        if let Some(dir) = &args.replay {
            self.replay_dir = Some(dir.clone());
        }
        if args.debug {
            self.vision.debug_visualizations = true;
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn swipe_duration(&self) -> Duration {
        Duration::from_millis(self.swipe_duration_ms)
    }

    pub fn adb_timeout(&self) -> Duration {
        Duration::from_secs(self.adb_timeout_secs)
    }
}
