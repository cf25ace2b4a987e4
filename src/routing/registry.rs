use crate::errors::ConfigurationError;
use crate::models::{AgentDescriptor, COORDINATOR_ID};
use std::collections::HashMap;

/// Read-only catalog of routable agents.
///
/// Declaration order is significant: it breaks score ties and is the fallback
/// order when every agent scores the same.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    agents: Vec<AgentDescriptor>,
    index: HashMap<String, usize>,
}

impl CapabilityRegistry {
    /// Build a registry, validating ids and weights
    pub fn new(agents: Vec<AgentDescriptor>) -> Result<Self, ConfigurationError> {
        if agents.is_empty() {
            return Err(ConfigurationError::EmptyRegistry);
        }

        let mut index = HashMap::with_capacity(agents.len());
        for (i, agent) in agents.iter().enumerate() {
            if agent.id.trim().is_empty() {
                return Err(ConfigurationError::InvalidSetting {
                    setting: "agents.id".to_string(),
                    message: format!("agent #{} has an empty id", i + 1),
                });
            }
            if agent.id == COORDINATOR_ID {
                return Err(ConfigurationError::ReservedAgentId(agent.id.clone()));
            }
            if !(0.0..=1.0).contains(&agent.weight) {
                return Err(ConfigurationError::InvalidWeight {
                    agent_id: agent.id.clone(),
                    weight: agent.weight,
                });
            }
            if index.insert(agent.id.clone(), i).is_some() {
                return Err(ConfigurationError::DuplicateAgent(agent.id.clone()));
            }
        }

        Ok(Self { agents, index })
    }

    /// The built-in product-management agent catalog
    pub fn builtin() -> Self {
        let agents = default_catalog();
        let index = agents
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.clone(), i))
            .collect();
        Self { agents, index }
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentDescriptor> {
        self.index.get(agent_id).map(|&i| &self.agents[i])
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.index.contains_key(agent_id)
    }

    /// Declaration position of an agent
    pub fn position(&self, agent_id: &str) -> Option<usize> {
        self.index.get(agent_id).copied()
    }

    /// All agents in declaration order
    pub fn agents(&self) -> &[AgentDescriptor] {
        &self.agents
    }

    pub fn ids(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Heading for an agent's section, falling back to the raw id
    pub fn heading_for(&self, agent_id: &str) -> String {
        self.get(agent_id)
            .map(|a| a.heading())
            .unwrap_or_else(|| format!("{} Insights", agent_id))
    }
}

/// Default agents, in declaration order
pub fn default_catalog() -> Vec<AgentDescriptor> {
    vec![
        AgentDescriptor::new("general", "General")
            .with_capabilities([
                "help",
                "overview",
                "explain",
                "advice",
                "guidance",
                "general",
                "question",
                "getting started",
            ])
            .with_weight(0.6),
        AgentDescriptor::new("research", "Research")
            .with_capabilities([
                "market",
                "trend",
                "research",
                "competitor",
                "competitive",
                "competition",
                "customer",
                "industry",
                "analysis",
                "demand",
                "segment",
                "survey",
                "landscape",
                "pricing",
                "market size",
            ])
            .with_affinities(["Market Research", "Competitive Analysis", "Research", "Discovery"]),
        AgentDescriptor::new("ideation", "Ideation")
            .with_capabilities([
                "idea",
                "ideate",
                "brainstorm",
                "feature",
                "concept",
                "generate",
                "creative",
                "innovation",
                "opportunity",
                "new product",
            ])
            .with_affinities(["Ideation", "Concept"]),
        AgentDescriptor::new("prd", "Requirements")
            .with_capabilities([
                "requirement",
                "prd",
                "spec",
                "specification",
                "user story",
                "acceptance criteria",
                "scope",
                "functional",
                "non-functional",
            ])
            .with_affinities(["Requirements", "PRD", "Specification"]),
        AgentDescriptor::new("scoring", "Prioritization")
            .with_capabilities([
                "score",
                "prioritize",
                "prioritization",
                "priority",
                "rank",
                "evaluate",
                "rice",
                "impact",
                "effort",
                "feasibility",
                "tradeoff",
            ])
            .with_affinities(["Prioritization", "Evaluation", "Validation"]),
        AgentDescriptor::new("design", "Design")
            .with_capabilities([
                "design",
                "ui",
                "ux",
                "wireframe",
                "mockup",
                "prototype",
                "layout",
                "user flow",
                "interface",
                "visual",
            ])
            .with_affinities(["Design", "Prototyping"]),
        AgentDescriptor::new("knowledge", "Knowledge Base")
            .with_capabilities([
                "knowledge",
                "reference",
                "previous",
                "history",
                "notes",
                "document",
                "decision",
                "context",
                "lookup",
                "source",
            ])
            .with_weight(0.8)
            .retrieval(),
    ]
}
