//! Relevance scoring of agents against a query.
//!
//! Scores are a pure function of the agent descriptor and the query context:
//! no hidden state and no randomness, so replaying a query reproduces the same
//! routing decision.

use crate::models::{AgentDescriptor, AgentScore, QueryContext};
use crate::utils::tokenize;
use std::collections::BTreeSet;

use super::CapabilityRegistry;

/// Score every agent receives before any signal is applied
pub const SCORE_FLOOR: f64 = 0.10;
/// Maximum contribution of capability tag matches (scaled by agent weight)
pub const KEYWORD_SPAN: f64 = 0.65;
/// Fixed bonus when the query phase is one of the agent's affinities
pub const PHASE_BONUS: f64 = 0.25;
/// Number of tag matches at which the keyword component saturates
pub const KEYWORD_SATURATION: usize = 3;

/// Pre-tokenized view of the query text
struct QueryTerms {
    tokens: BTreeSet<String>,
    /// Space-padded normalized text for phrase matching
    padded: String,
}

impl QueryTerms {
    fn from_text(text: &str) -> Self {
        let cleaned: String = text
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { ' ' })
            .collect();
        Self {
            tokens: tokenize(text),
            padded: format!(" {} ", crate::utils::collapse_whitespace(&cleaned)),
        }
    }

    fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn matches(&self, tag: &str) -> bool {
        if tag.contains(char::is_whitespace) || tag.contains('-') {
            self.padded.contains(&format!(" {} ", tag))
        } else {
            self.tokens.contains(tag)
        }
    }
}

/// Capability tags of `agent` that occur in the query text
pub fn matched_capabilities<'a>(agent: &'a AgentDescriptor, text: &str) -> Vec<&'a str> {
    let terms = QueryTerms::from_text(text);
    agent
        .capabilities
        .iter()
        .filter(|tag| terms.matches(tag))
        .map(String::as_str)
        .collect()
}

/// Confidence in [0, 1] that `agent` is relevant to `context`.
///
/// Empty query text yields the floor for every agent, regardless of phase.
pub fn score(agent: &AgentDescriptor, context: &QueryContext) -> f64 {
    let terms = QueryTerms::from_text(&context.text);
    score_terms(agent, context, &terms)
}

fn score_terms(agent: &AgentDescriptor, context: &QueryContext, terms: &QueryTerms) -> f64 {
    if terms.is_empty() {
        return SCORE_FLOOR;
    }

    let matches = agent
        .capabilities
        .iter()
        .filter(|tag| terms.matches(tag))
        .count()
        .min(KEYWORD_SATURATION);
    let keyword = agent.weight * KEYWORD_SPAN * matches as f64 / KEYWORD_SATURATION as f64;

    let phase_bonus = match context.normalized_phase() {
        Some(phase) if agent.has_affinity(&phase) => PHASE_BONUS,
        _ => 0.0,
    };

    (SCORE_FLOOR + keyword + phase_bonus).clamp(0.0, 1.0)
}

/// Score a registered agent by id
pub fn score_agent(
    registry: &CapabilityRegistry,
    agent_id: &str,
    context: &QueryContext,
) -> Option<f64> {
    registry.get(agent_id).map(|agent| score(agent, context))
}

/// Score every agent, in registry declaration order
pub fn score_all(registry: &CapabilityRegistry, context: &QueryContext) -> Vec<AgentScore> {
    let terms = QueryTerms::from_text(&context.text);
    registry
        .agents()
        .iter()
        .map(|agent| AgentScore {
            agent_id: agent.id.clone(),
            confidence: score_terms(agent, context, &terms),
        })
        .collect()
}

/// Sort scores by confidence, highest first. Stable: equal scores keep registry order.
pub fn rank(scores: &[AgentScore]) -> Vec<AgentScore> {
    let mut ranked = scores.to_vec();
    ranked.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}
