use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// How remediation commands are run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActionsConfig {
    /// Binary used to load kernel modules.
    pub modprobe: String,
    /// Binary used to write kernel parameters.
    pub sysctl: String,
    /// Upper bound for a single remediation command.
    pub timeout_secs: u64,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            modprobe: "modprobe".to_string(),
            sysctl: "sysctl".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ActionsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Drop-in files that make applied fixes survive a reboot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistConfig {
    pub enabled: bool,
    pub modules_file: PathBuf,
    pub sysctl_file: PathBuf,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            modules_file: PathBuf::from("/etc/modules-load.d/nodefix.conf"),
            sysctl_file: PathBuf::from("/etc/sysctl.d/50-nodefix.conf"),
        }
    }
}

/// Top-level config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub actions: ActionsConfig,
    pub persist: PersistConfig,
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))?;
    if config.actions.timeout_secs == 0 {
        anyhow::bail!("Invalid config {}: actions.timeout_secs must be > 0", path.display());
    }
    Ok(config)
}

/// Load the explicitly requested config, or the default path if it exists.
pub fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    match explicit {
        Some(path) => load_config(path),
        None => {
            let path = default_config_path();
            if path.exists() {
                load_config(&path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("/etc/nodefix/config.toml")
}
