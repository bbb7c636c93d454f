use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the config/data directory
pub const CONFIG_DIR_ENV: &str = "TAPDECK_CONFIG_DIR";

/// Files whose presence in the working directory makes it the config dir
const LOCAL_FILES: [&str; 3] = ["tapdeck.json", "registry.json", "tapdeck.log"];

/// Configuration for overriding default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Create PathConfig from CLI arguments and environment variables
    ///
    /// Priority: CLI args → ENV var (TAPDECK_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| {
            std::env::var(CONFIG_DIR_ENV)
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        });

        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. TAPDECK_CONFIG_DIR environment variable
/// 3. Local folder IF any tapdeck files exist (tapdeck.json, registry.json, tapdeck.log)
/// 4. Platform-specific config directory from dirs-next (default)
///
/// Platform paths:
/// - Linux: ~/.config/tapdeck/{name}
/// - macOS: ~/Library/Application Support/tapdeck/{name}
/// - Windows: %APPDATA%\tapdeck\{name}
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    get_config_dir(config).join(name)
}

/// Get path to a data file (registry, sounds, logs)
///
/// Same priority as [`config_file`], falling back to the platform data
/// directory (Linux: ~/.local/share/tapdeck/{name}).
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    get_data_dir(config).join(name)
}

/// Ensure that configuration and data directories exist
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = get_config_dir(config);
    let data_dir = get_data_dir(config);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    }

    // Only create data_dir if it's different from config_dir
    if data_dir != config_dir && !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    }

    Ok(())
}

fn has_local_files(dir: &Path) -> bool {
    LOCAL_FILES.iter().any(|f| dir.join(f).exists())
}

fn get_config_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::config_dir)
}

fn get_data_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::data_dir)
}

/// Explicit dir, else a working dir holding tapdeck files, else `<platform>/tapdeck`.
fn resolve_dir(config: &PathConfig, platform_dir: fn() -> Option<PathBuf>) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }

    std::env::current_dir()
        .ok()
        .filter(|dir| has_local_files(dir))
        .or_else(|| platform_dir().map(|dir| dir.join("tapdeck")))
        .unwrap_or_else(|| PathBuf::from("."))
}
