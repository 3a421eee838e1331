//! Configuration — workspace location, model defaults, and command toggles.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};

/// Text-command toggles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandsConfig {
    /// Allow text commands (e.g. `/cache_report`) in inbound messages.
    #[serde(default = "default_true")]
    pub text: bool,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self { text: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Root for session state: `<workspace>/sessions.json` and the
    /// `<workspace>/sessions/<agent>/` transcript tree.
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_agent_id")]
    pub default_agent_id: String,
    #[serde(default)]
    pub commands: CommandsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_dir: default_workspace_dir(),
            default_provider: default_provider(),
            default_model: default_model(),
            default_agent_id: default_agent_id(),
            commands: CommandsConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_workspace_dir() -> PathBuf {
    let home = UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
    home.join(".clawmeter").join("workspace")
}

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_model() -> String {
    "claude-opus-4-6".to_string()
}

fn default_agent_id() -> String {
    "main".to_string()
}

impl Config {
    /// Load `~/.clawmeter/config.toml` if present, else defaults. Environment
    /// overrides apply either way.
    pub fn load_or_default() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            _ => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(workspace) = std::env::var("CLAWMETER_WORKSPACE") {
            if !workspace.is_empty() {
                self.workspace_dir = PathBuf::from(shellexpand::tilde(&workspace).into_owned());
            }
        }
        if let Ok(provider) = std::env::var("CLAWMETER_PROVIDER") {
            if !provider.is_empty() {
                self.default_provider = provider;
            }
        }
        if let Ok(model) = std::env::var("CLAWMETER_MODEL") {
            if !model.is_empty() {
                self.default_model = model;
            }
        }
    }

    fn config_path() -> Option<PathBuf> {
        let home = UserDirs::new()?.home_dir().to_path_buf();
        Some(home.join(".clawmeter").join("config.toml"))
    }
}
