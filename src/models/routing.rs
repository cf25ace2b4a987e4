// Routing decision models

use serde::{Deserialize, Serialize};

/// Orchestration topology applied to the selected agents for one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationMode {
    /// Agents run one at a time, each seeing every prior output
    Sequential,
    /// Agents run concurrently against the same context
    Parallel,
    /// Primary leads and consults supporting agents through the coordinator
    Collaborative,
    /// Two rounds of independent positions and refinements, then synthesis
    Debate,
}

impl CoordinationMode {
    pub fn all() -> &'static [CoordinationMode] {
        &[
            CoordinationMode::Sequential,
            CoordinationMode::Parallel,
            CoordinationMode::Collaborative,
            CoordinationMode::Debate,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinationMode::Sequential => "sequential",
            CoordinationMode::Parallel => "parallel",
            CoordinationMode::Collaborative => "collaborative",
            CoordinationMode::Debate => "debate",
        }
    }
}

impl Default for CoordinationMode {
    fn default() -> Self {
        CoordinationMode::Collaborative
    }
}

impl std::fmt::Display for CoordinationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CoordinationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(CoordinationMode::Sequential),
            "parallel" => Ok(CoordinationMode::Parallel),
            "collaborative" => Ok(CoordinationMode::Collaborative),
            "debate" => Ok(CoordinationMode::Debate),
            _ => Err(format!(
                "Invalid coordination mode: '{}'. Expected 'sequential', 'parallel', 'collaborative', or 'debate'",
                s
            )),
        }
    }
}

/// Why the primary agent was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryReason {
    /// The query phase is mapped to this agent
    PhaseMapping,
    /// Highest relevance score, ties broken by registry order
    HighestScore,
    /// No phase and every score was below the confidence threshold
    Fallback,
}

impl PrimaryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryReason::PhaseMapping => "phase_mapping",
            PrimaryReason::HighestScore => "highest_score",
            PrimaryReason::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for PrimaryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relevance score of one agent for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentScore {
    pub agent_id: String,
    pub confidence: f64,
}

/// Outcome of routing one query. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    /// Agent leading the response
    pub primary: String,
    /// Auxiliary agents in selection order (never contains `primary`, no duplicates)
    pub supporting: Vec<String>,
    pub mode: CoordinationMode,
    pub reason: PrimaryReason,
    /// Score of every registered agent, in registry order
    pub scores: Vec<AgentScore>,
}

impl RoutingDecision {
    /// Primary followed by supporting agents, the order sequential mode runs them in
    pub fn participants(&self) -> Vec<String> {
        std::iter::once(self.primary.clone())
            .chain(self.supporting.iter().cloned())
            .collect()
    }

    pub fn score_of(&self, agent_id: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.agent_id == agent_id)
            .map(|s| s.confidence)
    }
}
