// Interaction recorder: the append-only log of one turn
//
// Every coordinator<->agent edge passes through here. Records get a turn-local
// sequence number, are queued for persistence, and are broadcast.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::events::{InteractionRecordedPayload, EVENT_INTERACTION_RECORDED};
use crate::models::{AgentInteraction, InteractionKind, COORDINATOR_ID};
use crate::server::EventBroadcaster;
use crate::storage::{RecordSink, TurnRecord};
use crate::utils::lock_mutex_recover;

/// A request that has been issued and not yet answered
#[derive(Debug, Clone, PartialEq)]
pub struct OpenCall {
    pub agent_id: String,
    pub kind: InteractionKind,
    pub round: Option<u8>,
    pub message_ref: String,
}

pub struct InteractionRecorder {
    turn_id: String,
    sequence: AtomicU64,
    log: Mutex<Vec<AgentInteraction>>,
    sink: RecordSink,
    broadcaster: Option<Arc<EventBroadcaster>>,
}

impl InteractionRecorder {
    pub fn new(
        turn_id: impl Into<String>,
        sink: RecordSink,
        broadcaster: Option<Arc<EventBroadcaster>>,
    ) -> Self {
        Self {
            turn_id: turn_id.into(),
            sequence: AtomicU64::new(0),
            log: Mutex::new(Vec::new()),
            sink,
            broadcaster,
        }
    }

    pub fn turn_id(&self) -> &str {
        &self.turn_id
    }

    fn record(
        &self,
        source: &str,
        target: &str,
        call: &OpenCall,
        kind: InteractionKind,
        error: Option<String>,
    ) -> AgentInteraction {
        // Sequence, push and enqueue happen under the lock so both logs follow sequence order
        let mut entries = lock_mutex_recover(&self.log);
        let interaction = AgentInteraction {
            id: uuid::Uuid::new_v4().to_string(),
            turn_id: self.turn_id.clone(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            source: source.to_string(),
            target: target.to_string(),
            agent_id: call.agent_id.clone(),
            kind,
            message_ref: call.message_ref.clone(),
            round: call.round,
            error,
            timestamp: Utc::now(),
        };
        entries.push(interaction.clone());
        self.sink.send(TurnRecord::Interaction(interaction.clone()));
        drop(entries);

        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.broadcast(
                EVENT_INTERACTION_RECORDED,
                InteractionRecordedPayload {
                    interaction: interaction.clone(),
                },
            );
        }

        interaction
    }

    /// Record a coordinator -> agent call and return its handle
    pub fn open(&self, agent_id: &str, kind: InteractionKind, round: Option<u8>) -> OpenCall {
        let call = OpenCall {
            agent_id: agent_id.to_string(),
            kind,
            round,
            message_ref: uuid::Uuid::new_v4().to_string(),
        };
        self.record(COORDINATOR_ID, agent_id, &call, kind, None);
        call
    }

    /// Record the agent's successful answer to `call`
    pub fn reply(&self, call: &OpenCall) -> AgentInteraction {
        self.record(
            &call.agent_id,
            COORDINATOR_ID,
            call,
            InteractionKind::Response,
            None,
        )
    }

    /// Record that `call` produced nothing. The agent is never the source.
    pub fn fail(&self, call: &OpenCall, error: impl Into<String>) -> AgentInteraction {
        self.record(
            COORDINATOR_ID,
            &call.agent_id,
            call,
            InteractionKind::Response,
            Some(error.into()),
        )
    }

    /// Calls that have been opened but neither answered nor failed
    pub fn open_calls(&self) -> Vec<OpenCall> {
        let entries = lock_mutex_recover(&self.log);
        let closed: HashSet<&str> = entries
            .iter()
            .filter(|i| i.kind == InteractionKind::Response)
            .map(|i| i.message_ref.as_str())
            .collect();

        entries
            .iter()
            .filter(|i| {
                i.kind != InteractionKind::Response && !closed.contains(i.message_ref.as_str())
            })
            .map(|i| OpenCall {
                agent_id: i.agent_id.clone(),
                kind: i.kind,
                round: i.round,
                message_ref: i.message_ref.clone(),
            })
            .collect()
    }

    /// Agents that produced at least one successful output, by first involvement
    pub fn contributors(&self) -> Vec<String> {
        let entries = lock_mutex_recover(&self.log);
        let produced: HashSet<&str> = entries
            .iter()
            .filter(|i| i.produced_by_agent())
            .map(|i| i.agent_id.as_str())
            .collect();

        let mut ordered: Vec<String> = Vec::new();
        for interaction in entries.iter() {
            let id = interaction.agent_id.as_str();
            if produced.contains(id) && !ordered.iter().any(|o| o == id) {
                ordered.push(id.to_string());
            }
        }
        ordered
    }

    /// Copy of the log, in sequence order
    pub fn snapshot(&self) -> Vec<AgentInteraction> {
        lock_mutex_recover(&self.log).clone()
    }

    pub fn len(&self) -> usize {
        lock_mutex_recover(&self.log).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
