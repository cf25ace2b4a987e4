// Error taxonomy for routing and coordination
//
// Only ConfigurationError crosses the coordinator boundary. Agent failures are
// recorded and isolated; synthesis failures degrade to raw per-agent output.

use thiserror::Error;

/// Invalid or empty registry / routing configuration. Fatal for the turn.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Capability registry is empty")]
    EmptyRegistry,

    #[error("Duplicate agent id in registry: {0}")]
    DuplicateAgent(String),

    #[error("Agent id '{0}' is reserved")]
    ReservedAgentId(String),

    #[error("Agent '{agent_id}' has an invalid weight {weight} (expected 0.0-1.0)")]
    InvalidWeight { agent_id: String, weight: f64 },

    #[error("{setting} references unknown agent '{agent_id}'")]
    UnknownAgent { setting: String, agent_id: String },

    #[error("Invalid setting {setting}: {message}")]
    InvalidSetting { setting: String, message: String },
}

/// Failure of a single agent call. Recovered locally by the orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentInvocationError {
    #[error("Agent {agent_id} timed out after {timeout_secs}s")]
    Timeout { agent_id: String, timeout_secs: u64 },

    #[error("Agent {agent_id} failed: {message}")]
    Failed { agent_id: String, message: String },

    #[error("No invocation handler registered for agent {0}")]
    NoHandler(String),

    #[error("Agent {agent_id} is unavailable: command '{command}' not found")]
    Unavailable { agent_id: String, command: String },

    #[error("Agent {agent_id} was cut off by the turn deadline")]
    Cancelled { agent_id: String },
}

impl AgentInvocationError {
    pub fn failed(agent_id: &str, message: impl Into<String>) -> Self {
        AgentInvocationError::Failed {
            agent_id: agent_id.to_string(),
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentInvocationError::Timeout { .. })
    }
}

/// The final merge step could not produce a narrative
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthesisError {
    #[error("No successful agent output to synthesize")]
    NothingToSynthesize,

    #[error("Merge step by agent {agent_id} failed: {source}")]
    MergeFailed {
        agent_id: String,
        #[source]
        source: AgentInvocationError,
    },
}

/// Errors that propagate past the coordinator boundary
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
