// Application configuration loading
//
// Configuration is read from an explicit path or ~/.ideaforge/config.toml.
// A missing file yields the built-in defaults.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{CoordinatorConfig, RoutingConfig};
use crate::errors::ConfigurationError;
use crate::models::AgentDescriptor;
use crate::routing::CapabilityRegistry;

/// External command used to invoke one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Executable name or path
    pub command: String,
    /// Arguments; `{prompt}` is replaced by the prompt, otherwise the prompt is appended
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON-lines interaction log; in-memory only when unset
    pub interaction_log: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3430,
            bind: "127.0.0.1".to_string(),
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub routing: RoutingConfig,
    pub coordinator: CoordinatorConfig,
    /// Replaces the built-in catalog when non-empty
    pub agents: Vec<AgentDescriptor>,
    /// Agent id -> command that answers for it
    pub commands: BTreeMap<String, CommandConfig>,
    /// Command for agents without an entry in `commands`
    pub default_command: Option<CommandConfig>,
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Default config file path (~/.ideaforge/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".ideaforge").join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = Self::default_path()
                    .ok_or_else(|| anyhow!("Could not determine home directory"))?;
                if !default.exists() {
                    log::debug!("No config at {}, using defaults", default.display());
                    return Ok(Self::default());
                }
                default
            }
        };

        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

        let config = Self::from_toml(&contents)
            .map_err(|e| anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;

        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Build the agent registry: configured agents, or the built-in catalog
    pub fn registry(&self) -> Result<CapabilityRegistry, ConfigurationError> {
        if self.agents.is_empty() {
            return Ok(CapabilityRegistry::builtin());
        }

        let agents = self
            .agents
            .iter()
            .cloned()
            .map(|mut agent| {
                let tags = std::mem::take(&mut agent.capabilities);
                agent.with_capabilities(tags)
            })
            .collect();
        CapabilityRegistry::new(agents)
    }

    /// Validate every section and return the registry they were checked against
    pub fn validate(&self) -> Result<CapabilityRegistry, ConfigurationError> {
        let registry = self.registry()?;
        self.routing.validate(&registry)?;
        self.coordinator.validate()?;

        for agent_id in self.commands.keys() {
            if !registry.contains(agent_id) {
                return Err(ConfigurationError::UnknownAgent {
                    setting: format!("commands.{}", agent_id),
                    agent_id: agent_id.clone(),
                });
            }
        }

        Ok(registry)
    }
}
