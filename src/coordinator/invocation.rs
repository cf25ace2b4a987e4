// Agent invocation interface
//
// The orchestrator only talks to agents through `AgentInvoker`. Concrete
// invokers (CLI commands, in-process handlers) live in `crate::agents`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AgentInvocationError;
use crate::models::InteractionKind;

/// One prompt sent to one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    pub turn_id: String,
    pub agent_id: String,
    /// Why the agent is being called (request, consultation, delegation)
    pub kind: InteractionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u8>,
    pub prompt: String,
}

/// What an agent handed back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationReply {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    /// Set when the agent answered but reported a failure of its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InvocationReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = Some(confidence.min(100));
        self
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Anything that can answer a prompt on behalf of an agent
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(
        &self,
        request: InvocationRequest,
    ) -> Result<InvocationReply, AgentInvocationError>;
}
