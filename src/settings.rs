//! Service settings: `tapdeck.json` in the config dir, overridden by CLI flags.

use crate::cli::Args;
use crate::paths::{self, PathConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE: &str = "tapdeck.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Listen address; loopback unless opened up explicitly
    pub bind: String,
    pub port: u16,
    pub mopidy_url: String,
    pub mopidy_timeout_ms: u64,
    /// Defaults to `<data dir>/registry.json`
    pub registry: Option<PathBuf>,
    /// Defaults to `<data dir>/sounds`
    pub sounds_dir: Option<PathBuf>,
    /// Player program and leading arguments; the cue file is appended
    pub player_command: Vec<String>,
    pub feedback: bool,
    /// Accept `RunCommand` registrations over the API
    pub allow_commands: bool,
    pub device: Option<PathBuf>,
    pub device_name: Option<String>,
    pub debounce_ms: u64,
    pub error_backoff_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 6681,
            mopidy_url: "http://127.0.0.1:6680".to_string(),
            mopidy_timeout_ms: 3000,
            registry: None,
            sounds_dir: None,
            player_command: vec!["aplay".to_string(), "-q".to_string()],
            feedback: true,
            allow_commands: false,
            device: None,
            device_name: None,
            debounce_ms: 1000,
            error_backoff_ms: 500,
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file: {}", path.display()))?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load `tapdeck.json` from the config dir and apply CLI overrides.
    pub fn resolve(args: &Args, path_config: &PathConfig) -> Result<Self> {
        let mut settings = Self::load(&paths::config_file(SETTINGS_FILE, path_config))?;
        settings.apply_args(args);
        Ok(settings)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(bind) = &args.bind {
            self.bind = bind.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(url) = &args.mopidy_url {
            self.mopidy_url = url.clone();
        }
        if let Some(registry) = &args.registry {
            self.registry = Some(registry.clone());
        }
        if let Some(dir) = &args.sounds_dir {
            self.sounds_dir = Some(dir.clone());
        }
        if args.no_sound {
            self.feedback = false;
        }
        if args.allow_commands {
            self.allow_commands = true;
        }
        if let Some(ms) = args.debounce_ms {
            self.debounce_ms = ms;
        }
        // An explicit source on the command line replaces the configured reader
        if args.device.is_some() || args.device_name.is_some() || args.line_device.is_some() || args.stdin {
            self.device = args.device.clone();
            self.device_name = args.device_name.clone();
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn registry_path(&self, path_config: &PathConfig) -> PathBuf {
        self.registry
            .clone()
            .unwrap_or_else(|| paths::data_file("registry.json", path_config))
    }

    pub fn sounds_path(&self, path_config: &PathConfig) -> PathBuf {
        self.sounds_dir
            .clone()
            .unwrap_or_else(|| paths::data_file("sounds", path_config))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn mopidy_timeout(&self) -> Duration {
        Duration::from_millis(self.mopidy_timeout_ms)
    }
}
