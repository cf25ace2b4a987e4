//! Turn coordination
//!
//! [`Coordinator::handle`] is the single entry point for a query turn: route,
//! run the selected mode under the turn deadline, record every interaction,
//! and synthesize the final response. Records are flushed to the store
//! before the outcome is returned. Only configuration errors escape; agent
//! failures end up as gaps in a partial answer or as a failed turn outcome.

pub mod invocation;
pub mod modes;
pub mod prompts;
pub mod recorder;
pub mod synthesizer;

use std::sync::Arc;
use std::time::{Duration, Instant};

pub use invocation::{AgentInvoker, InvocationReply, InvocationRequest};
pub use modes::{ModeOrchestrator, TurnLedger, DEADLINE_EXCEEDED};
pub use recorder::{InteractionRecorder, OpenCall};
pub use synthesizer::{synthesize, SynthesisInput};

use crate::config::{AppConfig, CoordinatorConfig};
use crate::errors::{CoordinatorError, SynthesisError};
use crate::events::{
    RoutingDecidedPayload, TurnCompletedPayload, TurnFailedPayload, EVENT_ROUTING_DECIDED,
    EVENT_TURN_COMPLETED, EVENT_TURN_FAILED,
};
use crate::models::{
    CoordinationMode, QueryContext, RoutingDecision, TurnFailure, TurnOutcome, TurnReport,
};
use crate::routing::Router;
use crate::server::EventBroadcaster;
use crate::storage::{MemoryStore, RecordStore, RecordWriter, TurnRecord};

pub struct Coordinator {
    router: Router,
    config: CoordinatorConfig,
    invoker: Arc<dyn AgentInvoker>,
    store: Arc<dyn RecordStore>,
    broadcaster: Option<Arc<EventBroadcaster>>,
}

impl Coordinator {
    /// Coordinator with an in-memory record store and no event broadcasting
    pub fn new(router: Router, config: CoordinatorConfig, invoker: Arc<dyn AgentInvoker>) -> Self {
        Self {
            router,
            config,
            invoker,
            store: Arc::new(MemoryStore::new()),
            broadcaster: None,
        }
    }

    /// Build from a validated application config
    pub fn from_config(
        app: &AppConfig,
        invoker: Arc<dyn AgentInvoker>,
    ) -> Result<Self, CoordinatorError> {
        let registry = app.validate()?;
        let router = Router::new(Arc::new(registry), app.routing.clone());
        Ok(Self::new(router, app.coordinator.clone(), invoker))
    }

    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<EventBroadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    /// Route without invoking any agent
    pub fn preview(
        &self,
        context: &QueryContext,
        mode: Option<CoordinationMode>,
    ) -> Result<RoutingDecision, CoordinatorError> {
        let mode = mode.unwrap_or(self.config.default_mode);
        Ok(self.router.route(context, mode)?)
    }

    fn broadcast(&self, event: &str, payload: impl serde::Serialize) {
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.broadcast(event, payload);
        }
    }

    /// Handle one query turn end to end
    pub async fn handle(
        &self,
        context: QueryContext,
        mode: Option<CoordinationMode>,
    ) -> Result<TurnOutcome, CoordinatorError> {
        let started = Instant::now();
        let turn_id = uuid::Uuid::new_v4().to_string();
        let decision = self.preview(&context, mode)?;

        log::info!(
            "Turn {}: routed to {} ({}), mode {}",
            turn_id,
            decision.primary,
            decision.reason,
            decision.mode
        );
        self.broadcast(
            EVENT_ROUTING_DECIDED,
            RoutingDecidedPayload {
                turn_id: turn_id.clone(),
                session_id: context.session_id.clone(),
                decision: decision.clone(),
            },
        );

        let writer = RecordWriter::spawn(self.store.clone());
        let recorder = InteractionRecorder::new(
            turn_id.clone(),
            writer.sink(),
            self.broadcaster.clone(),
        );
        let ledger = TurnLedger::new();

        {
            let orchestrator = ModeOrchestrator::new(
                &turn_id,
                &context,
                &decision,
                self.router.registry(),
                &self.config,
                self.invoker.as_ref(),
                &recorder,
                &ledger,
            );

            let deadline = Duration::from_secs(self.config.turn_timeout_secs);
            if tokio::time::timeout(deadline, orchestrator.run())
                .await
                .is_err()
            {
                let expired = orchestrator.expire_open_calls();
                log::warn!(
                    "Turn {}: deadline of {}s exceeded, {} call(s) cut off",
                    turn_id,
                    self.config.turn_timeout_secs,
                    expired
                );
            }
        }

        let results = ledger.results();
        let contributors = recorder.contributors();
        let interactions = recorder.snapshot();
        drop(recorder);
        let input = SynthesisInput {
            turn_id: &turn_id,
            context: &context,
            decision: &decision,
            registry: self.router.registry(),
            routing: self.router.config(),
            contributors: &contributors,
            results: &results,
            surface_consultations: self.config.surface_consultations,
        };

        match synthesize(&input) {
            Ok(response) => {
                writer.send(TurnRecord::Response(response.clone()));
                writer.finish().await;
                self.broadcast(
                    EVENT_TURN_COMPLETED,
                    TurnCompletedPayload {
                        turn_id: turn_id.clone(),
                        mode: decision.mode,
                        headings: response.headings().iter().map(|h| h.to_string()).collect(),
                        partial: response.partial,
                        degraded: response.degraded,
                        duration_ms: started.elapsed().as_millis() as u64,
                    },
                );
                log::info!(
                    "Turn {}: answered with {} section(s){}",
                    turn_id,
                    response.sections.len(),
                    if response.partial { " (partial)" } else { "" }
                );

                Ok(TurnOutcome::Answered(TurnReport {
                    turn_id,
                    decision,
                    response,
                    interactions,
                    results,
                }))
            }
            Err(e) => {
                let gaps = synthesizer::collect_gaps(&input);
                let reason = match &e {
                    SynthesisError::NothingToSynthesize => format!(
                        "No agent produced a response ({} selected)",
                        decision.participants().len()
                    ),
                    other => other.to_string(),
                };
                log::warn!("Turn {}: failed: {}", turn_id, reason);
                writer.finish().await;
                self.broadcast(
                    EVENT_TURN_FAILED,
                    TurnFailedPayload {
                        turn_id: turn_id.clone(),
                        mode: decision.mode,
                        reason: reason.clone(),
                    },
                );

                Ok(TurnOutcome::Failed(TurnFailure {
                    turn_id,
                    decision,
                    reason,
                    gaps,
                    interactions,
                }))
            }
        }
    }
}
