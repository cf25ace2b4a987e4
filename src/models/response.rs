// Synthesized response and turn outcome models

use serde::{Deserialize, Serialize};

use super::{AgentInteraction, AgentInvocationResult, RoutingDecision};

/// Heading of the fixed trailing section
pub const SUMMARY_HEADING: &str = "Summary & Next Steps";

/// One agent's contribution to the final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSection {
    pub heading: String,
    pub agent_id: String,
    pub content: String,
}

/// A selected agent that contributed nothing this turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentGap {
    pub agent_id: String,
    pub reason: String,
}

/// The externally visible answer for one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedResponse {
    pub turn_id: String,
    /// Agent sections ordered by first involvement
    pub sections: Vec<ResponseSection>,
    /// Trailing "Summary & Next Steps" body
    pub summary: String,
    /// Merged narrative (collaborative final answer or debate synthesis)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(default)]
    pub gaps: Vec<AgentGap>,
    /// True when at least one selected agent failed or was cut off
    pub partial: bool,
    /// True when the merge step failed and raw outputs are returned instead
    pub degraded: bool,
}

impl SynthesizedResponse {
    pub fn headings(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.heading.as_str()).collect()
    }

    pub fn has_heading(&self, heading: &str) -> bool {
        self.sections.iter().any(|s| s.heading == heading)
    }

    pub fn section_for(&self, agent_id: &str) -> Option<&ResponseSection> {
        self.sections.iter().find(|s| s.agent_id == agent_id)
    }

    /// Render as markdown, summary last
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();

        if let Some(narrative) = &self.narrative {
            out.push_str(narrative.trim());
            out.push_str("\n\n");
        }

        for section in &self.sections {
            out.push_str(&format!("## {}\n\n{}\n\n", section.heading, section.content.trim()));
        }

        out.push_str(&format!("## {}\n\n{}\n", SUMMARY_HEADING, self.summary.trim()));
        out
    }
}

/// Everything produced by a turn that returned an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReport {
    pub turn_id: String,
    pub decision: RoutingDecision,
    pub response: SynthesizedResponse,
    pub interactions: Vec<AgentInteraction>,
    pub results: Vec<AgentInvocationResult>,
}

/// A turn in which no agent call succeeded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnFailure {
    pub turn_id: String,
    pub decision: RoutingDecision,
    pub reason: String,
    pub gaps: Vec<AgentGap>,
    pub interactions: Vec<AgentInteraction>,
}

/// Result of handling one query turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnOutcome {
    Answered(TurnReport),
    Failed(TurnFailure),
}

impl TurnOutcome {
    pub fn turn_id(&self) -> &str {
        match self {
            TurnOutcome::Answered(report) => &report.turn_id,
            TurnOutcome::Failed(failure) => &failure.turn_id,
        }
    }

    pub fn decision(&self) -> &RoutingDecision {
        match self {
            TurnOutcome::Answered(report) => &report.decision,
            TurnOutcome::Failed(failure) => &failure.decision,
        }
    }

    pub fn interactions(&self) -> &[AgentInteraction] {
        match self {
            TurnOutcome::Answered(report) => &report.interactions,
            TurnOutcome::Failed(failure) => &failure.interactions,
        }
    }

    pub fn response(&self) -> Option<&SynthesizedResponse> {
        match self {
            TurnOutcome::Answered(report) => Some(&report.response),
            TurnOutcome::Failed(_) => None,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, TurnOutcome::Answered(_))
    }
}
