// Routing configuration: phase map, exclusions, thresholds

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::ConfigurationError;
use crate::routing::CapabilityRegistry;
use crate::utils::normalize_label;

/// Static routing rules, fixed at router construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Phase name -> agent that leads every query in that phase
    pub phase_agents: BTreeMap<String, String>,
    /// Phase name -> agents that must never support in that phase
    pub phase_exclusions: BTreeMap<String, Vec<String>>,
    /// Agents that may only support when the phase is absent or one of their affinities
    pub affinity_gated_agents: Vec<String>,
    /// Agent that answers when nothing scores above `min_primary_confidence`
    pub fallback_agent: Option<String>,
    /// Retrieval-augmented agent that supports every turn it does not lead
    pub retrieval_agent: Option<String>,
    pub max_supporting: usize,
    pub min_primary_confidence: f64,
    pub min_supporting_confidence: f64,
    /// Ordered product lifecycle, used for next-step suggestions
    pub lifecycle: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        let phase_agents = [
            ("Ideation", "ideation"),
            ("Concept", "ideation"),
            ("Market Research", "research"),
            ("Competitive Analysis", "research"),
            ("Requirements", "prd"),
            ("Specification", "prd"),
            ("Design", "design"),
            ("Prototyping", "design"),
            ("Prioritization", "scoring"),
            ("Evaluation", "scoring"),
        ]
        .into_iter()
        .map(|(phase, agent)| (phase.to_string(), agent.to_string()))
        .collect();

        let phase_exclusions = [
            ("Market Research", vec!["ideation"]),
            ("Requirements", vec!["ideation"]),
        ]
        .into_iter()
        .map(|(phase, agents)| {
            (
                phase.to_string(),
                agents.into_iter().map(String::from).collect(),
            )
        })
        .collect();

        Self {
            phase_agents,
            phase_exclusions,
            affinity_gated_agents: vec!["ideation".to_string()],
            fallback_agent: Some("general".to_string()),
            retrieval_agent: Some("knowledge".to_string()),
            max_supporting: 3,
            min_primary_confidence: 0.2,
            min_supporting_confidence: 0.3,
            lifecycle: [
                "Ideation",
                "Market Research",
                "Requirements",
                "Design",
                "Prioritization",
                "Roadmap",
                "Launch",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl RoutingConfig {
    /// Agent mapped to a (normalized) phase, if any
    pub fn agent_for_phase(&self, normalized_phase: &str) -> Option<&str> {
        self.phase_agents
            .iter()
            .find(|(phase, _)| normalize_label(phase) == normalized_phase)
            .map(|(_, agent)| agent.as_str())
    }

    /// Agents excluded from supporting in a (normalized) phase
    pub fn excluded_in_phase(&self, normalized_phase: &str) -> Vec<&str> {
        self.phase_exclusions
            .iter()
            .filter(|(phase, _)| normalize_label(phase) == normalized_phase)
            .flat_map(|(_, agents)| agents.iter().map(String::as_str))
            .collect()
    }

    /// Lifecycle phase following `phase`, if the phase is known and not last
    pub fn next_phase(&self, phase: &str) -> Option<&str> {
        let normalized = normalize_label(phase);
        let pos = self
            .lifecycle
            .iter()
            .position(|p| normalize_label(p) == normalized)?;
        self.lifecycle.get(pos + 1).map(String::as_str)
    }

    /// Check limits and that every referenced agent is registered
    pub fn validate(&self, registry: &CapabilityRegistry) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("routing.min_primary_confidence", self.min_primary_confidence),
            ("routing.min_supporting_confidence", self.min_supporting_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::InvalidSetting {
                    setting: name.to_string(),
                    message: format!("{} is outside 0.0-1.0", value),
                });
            }
        }

        if self.max_supporting == 0 && self.retrieval_agent.is_some() {
            return Err(ConfigurationError::InvalidSetting {
                setting: "routing.max_supporting".to_string(),
                message: "must be at least 1 while a retrieval agent is configured".to_string(),
            });
        }

        let known = |setting: &str, agent_id: &str| -> Result<(), ConfigurationError> {
            if registry.contains(agent_id) {
                Ok(())
            } else {
                Err(ConfigurationError::UnknownAgent {
                    setting: setting.to_string(),
                    agent_id: agent_id.to_string(),
                })
            }
        };

        for (phase, agent_id) in &self.phase_agents {
            known(&format!("routing.phase_agents.\"{}\"", phase), agent_id)?;
        }
        for (phase, agents) in &self.phase_exclusions {
            for agent_id in agents {
                known(&format!("routing.phase_exclusions.\"{}\"", phase), agent_id)?;
            }
        }
        for agent_id in &self.affinity_gated_agents {
            known("routing.affinity_gated_agents", agent_id)?;
        }
        if let Some(agent_id) = &self.fallback_agent {
            known("routing.fallback_agent", agent_id)?;
        }
        if let Some(agent_id) = &self.retrieval_agent {
            known("routing.retrieval_agent", agent_id)?;
        }

        Ok(())
    }
}
