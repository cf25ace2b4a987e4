// Interaction audit trail and per-call invocation results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Participant id used for the coordinator side of an interaction
pub const COORDINATOR_ID: &str = "coordinator";

/// Kind of edge recorded between the coordinator and an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Coordinator asks an agent to answer (or refine) the query
    Request,
    /// Outcome of a call: agent output, or a coordinator-sourced failure record
    Response,
    /// Coordinator consults a supporting agent on behalf of the primary
    Consultation,
    /// Coordinator hands a merge step (final answer, debate synthesis) to an agent
    Delegation,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Request => "request",
            InteractionKind::Response => "response",
            InteractionKind::Consultation => "consultation",
            InteractionKind::Delegation => "delegation",
        }
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded coordinator<->agent edge. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInteraction {
    pub id: String,
    pub turn_id: String,
    /// Turn-local monotonic sequence number
    pub sequence: u64,
    /// `coordinator` or an agent id
    pub source: String,
    /// `coordinator` or an agent id
    pub target: String,
    /// Registered agent this edge concerns
    pub agent_id: String,
    pub kind: InteractionKind,
    /// Reference to the message this edge carries (the call id shared by request and response)
    pub message_ref: String,
    /// Debate round, when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AgentInteraction {
    /// Whether the agent itself produced this edge (a successful output)
    pub fn produced_by_agent(&self) -> bool {
        self.source == self.agent_id && self.error.is_none()
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of a single agent call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInvocationResult {
    pub agent_id: String,
    /// Kind of the request that produced this result
    pub kind: InteractionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u8>,
    pub content: String,
    /// Self-reported confidence (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl AgentInvocationResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}
