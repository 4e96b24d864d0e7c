//! TOML settings.
//!
//! ```toml
//! [cpu]
//! clock-mode = "high"
//! idle = { enabled = true, threshold = 5, sleep-micros = 1000 }
//!
//! [machine]
//! frame-rate = 60
//! load-address = 0x0100
//!
//! [run]
//! frames = 600
//! realtime = true
//! ```

use std::path::{Path, PathBuf};

use quartz_core::config::CpuConfig;
use quartz_machines::MachineConfig;
use serde::Deserialize;

use crate::error::FrontendError;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RunSettings {
    /// Frames to run before printing the summary.
    pub frames: u64,
    /// Pace frames to the machine's refresh rate instead of running flat out.
    pub realtime: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            frames: 600,
            realtime: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub cpu: CpuConfig,
    pub machine: MachineConfig,
    pub run: RunSettings,
}

impl Settings {
    /// `<config_dir>/quartz/settings.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("quartz").join("settings.toml"))
    }

    /// Load from `explicit` if given, which must exist. Otherwise use the
    /// default location when a file is there, or built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, FrontendError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    log::debug!(target: "frontend", "no settings file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let text = std::fs::read_to_string(&path).map_err(|source| FrontendError::Io {
            path: path.clone(),
            source,
        })?;
        let settings = Self::parse(&text, &path)?;
        log::info!(target: "frontend", "settings loaded from {}", path.display());
        Ok(settings)
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self, FrontendError> {
        toml::from_str(text).map_err(|source| FrontendError::Settings {
            path: path.to_path_buf(),
            source,
        })
    }
}
