// Response synthesizer: merges per-agent results into one sectioned answer

use crate::config::RoutingConfig;
use crate::errors::SynthesisError;
use crate::models::{
    AgentGap, AgentInvocationResult, CoordinationMode, InteractionKind, QueryContext,
    ResponseSection, RoutingDecision, SynthesizedResponse,
};
use crate::routing::CapabilityRegistry;

/// Everything the synthesizer needs from a finished (or cut-off) turn
pub struct SynthesisInput<'a> {
    pub turn_id: &'a str,
    pub context: &'a QueryContext,
    pub decision: &'a RoutingDecision,
    pub registry: &'a CapabilityRegistry,
    pub routing: &'a RoutingConfig,
    /// Agents with at least one successful output, by first involvement
    pub contributors: &'a [String],
    /// Call results in completion order
    pub results: &'a [AgentInvocationResult],
    pub surface_consultations: bool,
}

impl SynthesisInput<'_> {
    fn display_name(&self, agent_id: &str) -> String {
        self.registry
            .get(agent_id)
            .map(|a| a.display_name.clone())
            .unwrap_or_else(|| agent_id.to_string())
    }

    fn last_success<F>(&self, agent_id: &str, filter: F) -> Option<&AgentInvocationResult>
    where
        F: Fn(&AgentInvocationResult) -> bool,
    {
        self.results
            .iter()
            .rev()
            .find(|r| r.agent_id == agent_id && r.success() && filter(r))
    }

    /// Final merge call of the primary, if one was made
    fn merge_result(&self) -> Option<&AgentInvocationResult> {
        self.results.iter().rev().find(|r| {
            r.agent_id == self.decision.primary && r.kind == InteractionKind::Delegation
        })
    }

    fn primary_succeeded(&self) -> bool {
        self.last_success(&self.decision.primary, |_| true).is_some()
    }

    fn section_content(&self, agent_id: &str) -> String {
        let is_primary = agent_id == self.decision.primary;

        match self.decision.mode {
            CoordinationMode::Debate => self
                .last_success(agent_id, |r| r.kind != InteractionKind::Delegation)
                .map(|r| r.content.clone())
                .unwrap_or_else(|| {
                    "Moderated the debate; the merged answer is shown above.".to_string()
                }),
            CoordinationMode::Collaborative
                if !is_primary && !self.surface_consultations && self.primary_succeeded() =>
            {
                format!(
                    "Consulted by the {} specialist; this input is reflected in the answer above.",
                    self.display_name(&self.decision.primary)
                )
            }
            _ => self
                .last_success(agent_id, |_| true)
                .map(|r| r.content.clone())
                .unwrap_or_default(),
        }
    }
}

/// Build the response for a turn.
///
/// Fails with [`SynthesisError::NothingToSynthesize`] when no agent produced
/// anything. A failed merge step does not fail synthesis: raw per-agent output
/// is returned and the response is flagged as degraded.
pub fn synthesize(input: &SynthesisInput<'_>) -> Result<SynthesizedResponse, SynthesisError> {
    if input.contributors.is_empty() {
        return Err(SynthesisError::NothingToSynthesize);
    }

    let merge = input.merge_result();
    let degraded = merge.map(|r| !r.success()).unwrap_or(false);

    let narrative = match input.decision.mode {
        CoordinationMode::Debate => merge
            .filter(|r| r.success())
            .map(|r| r.content.trim().to_string()),
        _ => None,
    };

    let sections: Vec<ResponseSection> = input
        .contributors
        .iter()
        .map(|agent_id| ResponseSection {
            heading: input.registry.heading_for(agent_id),
            agent_id: agent_id.clone(),
            content: input.section_content(agent_id),
        })
        .collect();

    let gaps = collect_gaps(input);
    let partial = !gaps.is_empty() || input.results.iter().any(|r| !r.success());

    let summary = build_summary(input, &sections, &gaps, degraded);

    Ok(SynthesizedResponse {
        turn_id: input.turn_id.to_string(),
        sections,
        summary,
        narrative,
        gaps,
        partial,
        degraded,
    })
}

/// Selected agents that contributed nothing, with the last recorded reason
pub fn collect_gaps(input: &SynthesisInput<'_>) -> Vec<AgentGap> {
    input
        .decision
        .participants()
        .into_iter()
        .filter(|id| !input.contributors.contains(id))
        .map(|agent_id| {
            let reason = input
                .results
                .iter()
                .rev()
                .find(|r| r.agent_id == agent_id)
                .and_then(|r| r.error.clone())
                .unwrap_or_else(|| "not invoked".to_string());
            AgentGap { agent_id, reason }
        })
        .collect()
}

fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

/// Mean self-reported confidence of successful calls
pub fn average_confidence(results: &[AgentInvocationResult]) -> Option<u8> {
    let reported: Vec<u32> = results
        .iter()
        .filter(|r| r.success())
        .filter_map(|r| r.confidence.map(u32::from))
        .collect();
    if reported.is_empty() {
        return None;
    }
    Some((reported.iter().sum::<u32>() / reported.len() as u32) as u8)
}

fn build_summary(
    input: &SynthesisInput<'_>,
    sections: &[ResponseSection],
    gaps: &[AgentGap],
    degraded: bool,
) -> String {
    let mut lines = Vec::new();

    let included: Vec<String> = sections
        .iter()
        .map(|s| input.display_name(&s.agent_id))
        .collect();
    lines.push(format!(
        "This answer combines the {} perspective{} ({} mode).",
        join_names(&included),
        if included.len() == 1 { "" } else { "s" },
        input.decision.mode
    ));

    let missing: Vec<String> = gaps.iter().map(|g| input.display_name(&g.agent_id)).collect();
    if !missing.is_empty() {
        lines.push(format!("Not included: {}.", join_names(&missing)));
    }
    if degraded {
        lines.push(
            "The merge step did not complete, so each specialist's answer is shown as-is."
                .to_string(),
        );
    }
    if let Some(confidence) = average_confidence(input.results) {
        lines.push(format!("Average stated confidence: {}%.", confidence));
    }

    lines.push(String::new());
    lines.push("Next steps:".to_string());
    lines.push("- Review the insights above and record the decisions you make.".to_string());
    if !missing.is_empty() {
        lines.push(format!(
            "- Ask again to fill in the {} perspective{}.",
            join_names(&missing),
            if missing.len() == 1 { "" } else { "s" }
        ));
    }
    match input.context.phase.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(phase) => match input.routing.next_phase(phase) {
            Some(next) => lines.push(format!(
                "- When this is settled, move from {} to {}.",
                phase, next
            )),
            None => lines.push(format!(
                "- Keep refining {} until the team agrees it is done.",
                phase
            )),
        },
        None => lines.push(
            "- Set the product phase so future questions are routed to the right specialist."
                .to_string(),
        ),
    }

    lines.join("\n")
}
