// Coordinator configuration: mode default, timeouts, fan-out limits

use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;
use crate::models::CoordinationMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Mode used when the caller does not ask for one
    pub default_mode: CoordinationMode,
    /// Per-agent call timeout
    pub agent_timeout_secs: u64,
    /// Whole-turn deadline
    pub turn_timeout_secs: u64,
    /// Maximum agent calls in flight at once
    pub max_concurrency: usize,
    /// Prior conversation turns rendered into prompts
    pub history_window: usize,
    /// Show consulted agents' raw replies as sections in collaborative mode
    pub surface_consultations: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_mode: CoordinationMode::default(),
            agent_timeout_secs: 60,
            turn_timeout_secs: 180,
            max_concurrency: 4,
            history_window: 6,
            surface_consultations: false,
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.agent_timeout_secs == 0 {
            return Err(ConfigurationError::InvalidSetting {
                setting: "coordinator.agent_timeout_secs".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.turn_timeout_secs < self.agent_timeout_secs {
            return Err(ConfigurationError::InvalidSetting {
                setting: "coordinator.turn_timeout_secs".to_string(),
                message: format!(
                    "{}s is shorter than agent_timeout_secs ({}s)",
                    self.turn_timeout_secs, self.agent_timeout_secs
                ),
            });
        }
        if self.max_concurrency == 0 {
            return Err(ConfigurationError::InvalidSetting {
                setting: "coordinator.max_concurrency".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
