// Agent descriptor models for the capability registry

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Static description of one routable agent.
///
/// Descriptors are loaded once at startup and never change for the lifetime of
/// the process. Tag and affinity sets are ordered so that serialized registries
/// and score tables are reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    /// Unique identifier used for routing (e.g. "research", "ideation")
    pub id: String,
    /// Human-readable name, used to generate response section headings
    #[serde(alias = "display_name")]
    pub display_name: String,
    /// Capability tags matched against query text (lowercase words or phrases)
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    /// Lifecycle phases this agent is naturally associated with
    #[serde(default, alias = "phase_affinities")]
    pub phase_affinities: BTreeSet<String>,
    /// Multiplier applied to the keyword component of the relevance score (0.0-1.0)
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Whether this agent answers from a retrieval-augmented knowledge base
    #[serde(default, alias = "retrieval_augmented")]
    pub retrieval_augmented: bool,
}

fn default_weight() -> f64 {
    1.0
}

impl AgentDescriptor {
    /// Create a descriptor with no tags or affinities and the default weight
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            capabilities: BTreeSet::new(),
            phase_affinities: BTreeSet::new(),
            weight: default_weight(),
            retrieval_augmented: false,
        }
    }

    pub fn with_capabilities<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities
            .extend(tags.into_iter().map(|t| t.into().to_lowercase()));
        self
    }

    pub fn with_affinities<I, S>(mut self, phases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phase_affinities
            .extend(phases.into_iter().map(Into::into));
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn retrieval(mut self) -> Self {
        self.retrieval_augmented = true;
        self
    }

    /// Section heading used when this agent contributes to a response
    pub fn heading(&self) -> String {
        format!("{} Insights", self.display_name)
    }

    /// Whether the given (already normalized) phase is one of this agent's affinities
    pub fn has_affinity(&self, normalized_phase: &str) -> bool {
        self.phase_affinities
            .iter()
            .any(|p| crate::utils::normalize_label(p) == normalized_phase)
    }
}
