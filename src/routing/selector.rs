// Primary and supporting agent selection

use std::sync::Arc;

use crate::config::RoutingConfig;
use crate::errors::ConfigurationError;
use crate::models::{AgentScore, CoordinationMode, PrimaryReason, QueryContext, RoutingDecision};

use super::scorer::{rank, score_all};
use super::CapabilityRegistry;

/// Picks the agent that leads a turn
#[derive(Debug, Clone)]
pub struct PrimarySelector {
    registry: Arc<CapabilityRegistry>,
    config: Arc<RoutingConfig>,
}

impl PrimarySelector {
    pub fn new(registry: Arc<CapabilityRegistry>, config: Arc<RoutingConfig>) -> Self {
        Self { registry, config }
    }

    /// Select the primary agent from a score table in registry order.
    ///
    /// A phase mapping to a registered agent overrides scores. Otherwise the
    /// highest score wins (first declared on ties). With no phase and no agent
    /// above the primary threshold, the fallback agent answers.
    pub fn select(
        &self,
        context: &QueryContext,
        scores: &[AgentScore],
    ) -> Result<(String, PrimaryReason), ConfigurationError> {
        if self.registry.is_empty() {
            return Err(ConfigurationError::EmptyRegistry);
        }

        let phase = context.normalized_phase();

        if let Some(phase) = &phase {
            if let Some(agent_id) = self.config.agent_for_phase(phase) {
                if self.registry.contains(agent_id) {
                    log::debug!("Phase '{}' maps to primary {}", phase, agent_id);
                    return Ok((agent_id.to_string(), PrimaryReason::PhaseMapping));
                }
                log::warn!(
                    "Phase '{}' maps to unregistered agent {}, ignoring",
                    phase,
                    agent_id
                );
            }
        }

        let best = scores
            .iter()
            .filter(|s| self.registry.contains(&s.agent_id))
            .fold(None::<&AgentScore>, |best, s| match best {
                Some(b) if b.confidence >= s.confidence => Some(b),
                _ => Some(s),
            })
            .ok_or(ConfigurationError::EmptyRegistry)?;

        if phase.is_none() && best.confidence < self.config.min_primary_confidence {
            if let Some(fallback) = self
                .config
                .fallback_agent
                .as_deref()
                .filter(|id| self.registry.contains(id))
            {
                return Ok((fallback.to_string(), PrimaryReason::Fallback));
            }
        }

        Ok((best.agent_id.clone(), PrimaryReason::HighestScore))
    }
}

/// Picks the auxiliary agents of a turn
#[derive(Debug, Clone)]
pub struct SupportingSelector {
    registry: Arc<CapabilityRegistry>,
    config: Arc<RoutingConfig>,
}

impl SupportingSelector {
    pub fn new(registry: Arc<CapabilityRegistry>, config: Arc<RoutingConfig>) -> Self {
        Self { registry, config }
    }

    fn retrieval_agent(&self) -> Option<&str> {
        self.config
            .retrieval_agent
            .as_deref()
            .filter(|id| self.registry.contains(id))
    }

    /// Whether an affinity-gated agent may support in this phase
    fn passes_affinity_gate(&self, agent_id: &str, phase: Option<&str>) -> bool {
        if !self.config.affinity_gated_agents.iter().any(|a| a == agent_id) {
            return true;
        }
        match (phase, self.registry.get(agent_id)) {
            (None, _) => true,
            (Some(phase), Some(agent)) => agent.has_affinity(phase),
            (Some(_), None) => false,
        }
    }

    /// Select up to `max_supporting` agents, ranked by score.
    ///
    /// The primary never appears. The retrieval agent is always kept unless it
    /// is the primary, regardless of thresholds and exclusions.
    pub fn select(
        &self,
        context: &QueryContext,
        primary: &str,
        scores: &[AgentScore],
    ) -> Vec<String> {
        let phase = context.normalized_phase();
        let excluded = phase
            .as_deref()
            .map(|p| self.config.excluded_in_phase(p))
            .unwrap_or_default();
        let retrieval = self.retrieval_agent().filter(|id| *id != primary);

        let mut selected: Vec<String> = Vec::new();
        for candidate in rank(scores) {
            let id = candidate.agent_id.as_str();
            if id == primary || !self.registry.contains(id) || selected.iter().any(|s| s == id) {
                continue;
            }
            if Some(id) == retrieval {
                selected.push(candidate.agent_id);
                continue;
            }
            if excluded.contains(&id) {
                log::debug!("{} excluded from supporting in this phase", id);
                continue;
            }
            if !self.passes_affinity_gate(id, phase.as_deref()) {
                log::debug!("{} has no affinity for the current phase", id);
                continue;
            }
            if candidate.confidence < self.config.min_supporting_confidence {
                continue;
            }
            selected.push(candidate.agent_id);
        }

        // Trim from the lowest-ranked end, never dropping the retrieval agent
        while selected.len() > self.config.max_supporting {
            let drop_at = selected
                .iter()
                .rposition(|id| Some(id.as_str()) != retrieval);
            match drop_at {
                Some(i) => {
                    selected.remove(i);
                }
                None => break,
            }
        }

        selected
    }
}

/// Routing facade: scores, selects, and packages a [`RoutingDecision`]
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<CapabilityRegistry>,
    config: Arc<RoutingConfig>,
    primary: PrimarySelector,
    supporting: SupportingSelector,
}

impl Router {
    pub fn new(registry: Arc<CapabilityRegistry>, config: RoutingConfig) -> Self {
        let config = Arc::new(config);
        Self {
            primary: PrimarySelector::new(registry.clone(), config.clone()),
            supporting: SupportingSelector::new(registry.clone(), config.clone()),
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Route one query. Deterministic for a given registry, config and context.
    pub fn route(
        &self,
        context: &QueryContext,
        mode: CoordinationMode,
    ) -> Result<RoutingDecision, ConfigurationError> {
        if self.registry.is_empty() {
            return Err(ConfigurationError::EmptyRegistry);
        }

        let scores = score_all(&self.registry, context);
        let (primary, reason) = self.primary.select(context, &scores)?;
        let supporting = self.supporting.select(context, &primary, &scores);

        log::debug!(
            "Routed to {} ({}) with supporting [{}]",
            primary,
            reason,
            supporting.join(", ")
        );

        Ok(RoutingDecision {
            primary,
            supporting,
            mode,
            reason,
            scores,
        })
    }
}
