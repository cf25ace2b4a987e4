//! Coordination strategies
//!
//! Each mode drives the selected agents through the invoker and records every
//! call. Results land in a [`TurnLedger`] as soon as they complete, so a turn
//! cut off by the outer deadline still keeps everything that finished.

use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use super::invocation::{AgentInvoker, InvocationRequest};
use super::prompts::{
    build_agent_prompt, build_consultation_prompt, build_debate_synthesis_prompt,
    build_final_answer_prompt, build_rebuttal_prompt, build_sequential_prompt,
};
use super::recorder::{InteractionRecorder, OpenCall};
use crate::config::CoordinatorConfig;
use crate::errors::{AgentInvocationError, SynthesisError};
use crate::models::{
    AgentDescriptor, AgentInvocationResult, CoordinationMode, InteractionKind, QueryContext,
    ResponseSection, RoutingDecision,
};
use crate::routing::CapabilityRegistry;
use crate::utils::lock_mutex_recover;

/// Error recorded for calls still open when the turn deadline fires
pub const DEADLINE_EXCEEDED: &str = "turn deadline exceeded";

/// Results of one turn, in completion order
#[derive(Debug, Default)]
pub struct TurnLedger {
    results: Mutex<Vec<AgentInvocationResult>>,
}

impl TurnLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: AgentInvocationResult) {
        lock_mutex_recover(&self.results).push(result);
    }

    pub fn results(&self) -> Vec<AgentInvocationResult> {
        lock_mutex_recover(&self.results).clone()
    }
}

struct CallOutcome {
    result: AgentInvocationResult,
    error: Option<AgentInvocationError>,
}

impl CallOutcome {
    fn section(&self, agent: &AgentDescriptor) -> Option<ResponseSection> {
        self.result.success().then(|| ResponseSection {
            heading: agent.heading(),
            agent_id: agent.id.clone(),
            content: self.result.content.clone(),
        })
    }
}

/// Runs one turn's agents according to the decision's mode
pub struct ModeOrchestrator<'a> {
    turn_id: &'a str,
    context: &'a QueryContext,
    decision: &'a RoutingDecision,
    registry: &'a CapabilityRegistry,
    config: &'a CoordinatorConfig,
    invoker: &'a dyn AgentInvoker,
    recorder: &'a InteractionRecorder,
    ledger: &'a TurnLedger,
    permits: Semaphore,
}

impl<'a> ModeOrchestrator<'a> {
    pub fn new(
        turn_id: &'a str,
        context: &'a QueryContext,
        decision: &'a RoutingDecision,
        registry: &'a CapabilityRegistry,
        config: &'a CoordinatorConfig,
        invoker: &'a dyn AgentInvoker,
        recorder: &'a InteractionRecorder,
        ledger: &'a TurnLedger,
    ) -> Self {
        Self {
            turn_id,
            context,
            decision,
            registry,
            config,
            invoker,
            recorder,
            ledger,
            permits: Semaphore::new(config.max_concurrency.max(1)),
        }
    }

    fn descriptor(&self, agent_id: &str) -> AgentDescriptor {
        self.registry
            .get(agent_id)
            .cloned()
            .unwrap_or_else(|| AgentDescriptor::new(agent_id, agent_id))
    }

    fn window(&self) -> usize {
        self.config.history_window
    }

    pub async fn run(&self) {
        log::info!(
            "Turn {}: running {} mode with primary {} and {} supporting",
            self.turn_id,
            self.decision.mode,
            self.decision.primary,
            self.decision.supporting.len()
        );

        match self.decision.mode {
            CoordinationMode::Sequential => self.run_sequential().await,
            CoordinationMode::Parallel => self.run_parallel().await,
            CoordinationMode::Collaborative => self.run_collaborative().await,
            CoordinationMode::Debate => self.run_debate().await,
        }
    }

    /// Invoke one opened call under the concurrency limit and per-agent timeout
    async fn call(&self, call: OpenCall, prompt: String) -> CallOutcome {
        let started = Instant::now();
        let agent_id = call.agent_id.clone();

        let outcome = match self.permits.acquire().await {
            Ok(_permit) => {
                let request = InvocationRequest {
                    turn_id: self.turn_id.to_string(),
                    agent_id: agent_id.clone(),
                    kind: call.kind,
                    round: call.round,
                    prompt,
                };
                let limit = Duration::from_secs(self.config.agent_timeout_secs);
                match tokio::time::timeout(limit, self.invoker.invoke(request)).await {
                    Ok(Ok(reply)) => match reply.error {
                        None => Ok(reply),
                        Some(message) => Err(AgentInvocationError::failed(&agent_id, message)),
                    },
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(AgentInvocationError::Timeout {
                        agent_id: agent_id.clone(),
                        timeout_secs: self.config.agent_timeout_secs,
                    }),
                }
            }
            Err(_) => Err(AgentInvocationError::Cancelled {
                agent_id: agent_id.clone(),
            }),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let (result, error) = match outcome {
            Ok(reply) => {
                self.recorder.reply(&call);
                let result = AgentInvocationResult {
                    agent_id,
                    kind: call.kind,
                    round: call.round,
                    content: reply.content,
                    confidence: reply.confidence,
                    duration_ms,
                    error: None,
                    completed_at: Utc::now(),
                };
                (result, None)
            }
            Err(e) => {
                log::warn!("Turn {}: {}", self.turn_id, e);
                self.recorder.fail(&call, e.to_string());
                let result = AgentInvocationResult {
                    agent_id,
                    kind: call.kind,
                    round: call.round,
                    content: String::new(),
                    confidence: None,
                    duration_ms,
                    error: Some(e.to_string()),
                    completed_at: Utc::now(),
                };
                (result, Some(e))
            }
        };

        self.ledger.push(result.clone());
        CallOutcome { result, error }
    }

    /// Open every call first so the log order follows the given agent order
    async fn fan_out(&self, calls: Vec<(OpenCall, String)>) -> Vec<CallOutcome> {
        join_all(
            calls
                .into_iter()
                .map(|(call, prompt)| self.call(call, prompt)),
        )
        .await
    }

    async fn run_sequential(&self) {
        let mut previous: Vec<ResponseSection> = Vec::new();

        for agent_id in self.decision.participants() {
            let agent = self.descriptor(&agent_id);
            let prompt = build_sequential_prompt(&agent, self.context, self.window(), &previous);
            let call = self
                .recorder
                .open(&agent_id, InteractionKind::Request, None);
            let outcome = self.call(call, prompt).await;

            if let Some(section) = outcome.section(&agent) {
                previous.push(section);
            }
        }
    }

    async fn run_parallel(&self) {
        let calls = self
            .decision
            .participants()
            .into_iter()
            .map(|agent_id| {
                let agent = self.descriptor(&agent_id);
                let prompt = build_agent_prompt(&agent, self.context, self.window());
                let call = self
                    .recorder
                    .open(&agent_id, InteractionKind::Request, None);
                (call, prompt)
            })
            .collect();

        self.fan_out(calls).await;
    }

    async fn run_collaborative(&self) {
        let primary = self.descriptor(&self.decision.primary);

        let draft_call = self
            .recorder
            .open(&primary.id, InteractionKind::Request, None);
        let draft = self
            .call(
                draft_call,
                build_agent_prompt(&primary, self.context, self.window()),
            )
            .await;
        let draft_text = draft
            .result
            .success()
            .then(|| draft.result.content.clone());

        // Consultations run one at a time, in supporting order
        let mut replies: Vec<CallOutcome> = Vec::with_capacity(self.decision.supporting.len());
        for agent_id in &self.decision.supporting {
            let agent = self.descriptor(agent_id);
            let prompt = build_consultation_prompt(
                &agent,
                &primary,
                self.context,
                self.window(),
                draft_text.as_deref(),
            );
            let call = self
                .recorder
                .open(agent_id, InteractionKind::Consultation, None);
            replies.push(self.call(call, prompt).await);
        }

        let Some(draft_text) = draft_text else {
            log::warn!(
                "Turn {}: primary {} produced no draft, surfacing consulted agents directly",
                self.turn_id,
                primary.id
            );
            return;
        };

        if self.decision.supporting.is_empty() {
            return;
        }

        let input: Vec<ResponseSection> = replies
            .iter()
            .filter_map(|reply| reply.section(&self.descriptor(&reply.result.agent_id)))
            .collect();

        let final_call = self
            .recorder
            .open(&primary.id, InteractionKind::Delegation, None);
        let prompt =
            build_final_answer_prompt(&primary, self.context, self.window(), &draft_text, &input);
        let merged = self.call(final_call, prompt).await;

        if let Some(source) = merged.error {
            let err = SynthesisError::MergeFailed {
                agent_id: primary.id.clone(),
                source,
            };
            log::warn!("Turn {}: {}; keeping the draft", self.turn_id, err);
        }
    }

    async fn run_debate(&self) {
        let participants = self.decision.participants();

        let opening: Vec<(OpenCall, String)> = participants
            .iter()
            .map(|agent_id| {
                let agent = self.descriptor(agent_id);
                let prompt = build_agent_prompt(&agent, self.context, self.window());
                let call = self
                    .recorder
                    .open(agent_id, InteractionKind::Request, Some(1));
                (call, prompt)
            })
            .collect();
        let positions: Vec<ResponseSection> = self
            .fan_out(opening)
            .await
            .iter()
            .filter_map(|o| o.section(&self.descriptor(&o.result.agent_id)))
            .collect();

        if positions.len() < 2 {
            log::info!(
                "Turn {}: {} opening position(s), nothing to debate",
                self.turn_id,
                positions.len()
            );
            return;
        }

        let rebuttals: Vec<(OpenCall, String)> = positions
            .iter()
            .map(|own| {
                let agent = self.descriptor(&own.agent_id);
                let others: Vec<ResponseSection> = positions
                    .iter()
                    .filter(|p| p.agent_id != own.agent_id)
                    .cloned()
                    .collect();
                let prompt = build_rebuttal_prompt(
                    &agent,
                    self.context,
                    self.window(),
                    &own.content,
                    &others,
                );
                let call = self
                    .recorder
                    .open(&own.agent_id, InteractionKind::Request, Some(2));
                (call, prompt)
            })
            .collect();
        let refined = self.fan_out(rebuttals).await;

        let final_positions: Vec<ResponseSection> = positions
            .into_iter()
            .map(|position| {
                let refined_content = refined
                    .iter()
                    .find(|o| o.result.agent_id == position.agent_id && o.result.success())
                    .map(|o| o.result.content.clone());
                ResponseSection {
                    content: refined_content.unwrap_or(position.content.clone()),
                    ..position
                }
            })
            .collect();

        let call = self
            .recorder
            .open(&self.decision.primary, InteractionKind::Delegation, None);
        let prompt = build_debate_synthesis_prompt(self.context, &final_positions);
        let merged = self.call(call, prompt).await;

        if let Some(source) = merged.error {
            let err = SynthesisError::MergeFailed {
                agent_id: self.decision.primary.clone(),
                source,
            };
            log::warn!("Turn {}: {}; returning raw positions", self.turn_id, err);
        }
    }

    /// Close every call left open by a turn cut off at the deadline
    pub fn expire_open_calls(&self) -> usize {
        let open = self.recorder.open_calls();
        for call in &open {
            self.recorder.fail(call, DEADLINE_EXCEEDED);
            self.ledger.push(AgentInvocationResult {
                agent_id: call.agent_id.clone(),
                kind: call.kind,
                round: call.round,
                content: String::new(),
                confidence: None,
                duration_ms: 0,
                error: Some(DEADLINE_EXCEEDED.to_string()),
                completed_at: Utc::now(),
            });
        }
        open.len()
    }
}
