// Event types and payload structures for real-time updates
// These are broadcast via WebSocket to connected clients

use serde::{Deserialize, Serialize};

use crate::models::{AgentInteraction, CoordinationMode, RoutingDecision};

// Event name constants
pub const EVENT_ROUTING_DECIDED: &str = "routing:decided";
pub const EVENT_INTERACTION_RECORDED: &str = "routing:interaction";
pub const EVENT_TURN_COMPLETED: &str = "routing:turn_completed";
pub const EVENT_TURN_FAILED: &str = "routing:turn_failed";

/// Payload for routing decision events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecidedPayload {
    pub turn_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub decision: RoutingDecision,
}

/// Payload for interaction events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecordedPayload {
    pub interaction: AgentInteraction,
}

/// Payload for turn completion events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnCompletedPayload {
    pub turn_id: String,
    pub mode: CoordinationMode,
    pub headings: Vec<String>,
    pub partial: bool,
    pub degraded: bool,
    pub duration_ms: u64,
}

/// Payload for turn failure events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnFailedPayload {
    pub turn_id: String,
    pub mode: CoordinationMode,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_completed_payload_camel_case() {
        let payload = TurnCompletedPayload {
            turn_id: "turn-1".to_string(),
            mode: CoordinationMode::Parallel,
            headings: vec!["Research Insights".to_string()],
            partial: true,
            degraded: false,
            duration_ms: 12,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["turnId"], "turn-1");
        assert_eq!(json["mode"], "parallel");
        assert_eq!(json["durationMs"], 12);
    }
}
