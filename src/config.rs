use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// On-disk defaults. Every field is an Option so CLI flags layer on top.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Interface to operate on when -i is not given
    pub interface: Option<String>,
    pub log_level: Option<String>, // "info" | "debug"
}

/// Last-resort interface when neither -i nor the config file names one.
pub const FALLBACK_INTERFACE: &str = "enp2s0";

/// Read the YAML file (explicit path or search) and validate.
pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = explicit {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    validate(&cfg)?;

    Ok(cfg)
}

/// Effective interface name: CLI flag beats config file beats fallback.
pub fn resolve_interface(cli: Option<&str>, cfg: &Config) -> String {
    cli.map(str::to_string)
        .or_else(|| cfg.interface.clone())
        .unwrap_or_else(|| FALLBACK_INTERFACE.to_string())
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/macshift/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/macshift/config.yaml");
        if p.exists() {
            return Some(p);
        }
        let p = home.join(".config/macshift.yaml");
        if p.exists() {
            return Some(p);
        }
    }
    // project local
    let p = PathBuf::from("macshift.yaml");
    if p.exists() {
        return Some(p);
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.interface.is_some() {
        dst.interface = src.interface;
    }
    if src.log_level.is_some() {
        dst.log_level = src.log_level;
    }
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(name) = cfg.interface.as_ref() {
        if name.is_empty() || name.len() >= libc::IF_NAMESIZE {
            return Err(ConfigError::Validation(format!(
                "interface name must be 1..{} characters",
                libc::IF_NAMESIZE - 1
            )));
        }
    }
    Ok(())
}
