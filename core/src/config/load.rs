use std::path::{Path, PathBuf};

use super::types::AppConfig;
use crate::stream::{HookKind, Passthrough};

/// Get the default outfeed data directory: ~/.outfeed
pub fn get_outfeed_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".outfeed"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.outfeed/config.toml (highest)
    let data_dir = get_outfeed_data_dir()?;
    let user_config = data_dir.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg = if user_config.exists() {
        load_from(&user_config)?
    } else if local_config.exists() {
        load_from(local_config)?
    } else {
        AppConfig::default()
    };

    if cfg
        .logging
        .directory
        .as_deref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true)
    {
        cfg.logging.directory = Some(data_dir.join("logs").to_string_lossy().to_string());
    }

    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

pub fn load_from(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read {} failed: {e}", path.display()))?;
    Ok(toml::from_str::<AppConfig>(&s)?)
}

/// Environment variable overrides (Priority 0: highest)
fn apply_env_overrides(cfg: &mut AppConfig) -> anyhow::Result<()> {
    if let Ok(v) = std::env::var("OUTFEED_REDIRECT_HOOK") {
        if !v.trim().is_empty() {
            cfg.redirect.hook = v.parse::<HookKind>().map_err(anyhow::Error::msg)?;
        }
    }
    if let Ok(v) = std::env::var("OUTFEED_PASSTHROUGH") {
        if !v.trim().is_empty() {
            cfg.redirect.passthrough = v.parse::<Passthrough>().map_err(anyhow::Error::msg)?;
        }
    }
    Ok(())
}
