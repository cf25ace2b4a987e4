//! Append-only persistence for turn records
//!
//! Every recorded interaction and every synthesized response is appended to a
//! [`RecordStore`]. Stores never rewrite or delete records. Turn handling
//! queues records on a [`RecordWriter`] so store I/O stays off the executor.

mod jsonl;
mod writer;

pub use jsonl::JsonlStore;
pub use writer::{RecordSink, RecordWriter};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::models::{AgentInteraction, SynthesizedResponse};
use crate::utils::lock_mutex_recover;

/// One persisted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "record", rename_all = "snake_case")]
pub enum TurnRecord {
    Interaction(AgentInteraction),
    Response(SynthesizedResponse),
}

impl TurnRecord {
    pub fn turn_id(&self) -> &str {
        match self {
            TurnRecord::Interaction(i) => &i.turn_id,
            TurnRecord::Response(r) => &r.turn_id,
        }
    }
}

/// Append-only record sink
pub trait RecordStore: Send + Sync {
    fn append(&self, record: &TurnRecord) -> Result<()>;

    /// All records, in append order
    fn records(&self) -> Result<Vec<TurnRecord>>;

    /// Interactions of one turn, in append order
    fn interactions_for(&self, turn_id: &str) -> Result<Vec<AgentInteraction>> {
        Ok(self
            .records()?
            .into_iter()
            .filter_map(|r| match r {
                TurnRecord::Interaction(i) if i.turn_id == turn_id => Some(i),
                _ => None,
            })
            .collect())
    }

    /// Synthesized response of one turn, if it was answered
    fn response_for(&self, turn_id: &str) -> Result<Option<SynthesizedResponse>> {
        Ok(self.records()?.into_iter().find_map(|r| match r {
            TurnRecord::Response(resp) if resp.turn_id == turn_id => Some(resp),
            _ => None,
        }))
    }
}

/// In-process store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<TurnRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock_mutex_recover(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryStore {
    fn append(&self, record: &TurnRecord) -> Result<()> {
        lock_mutex_recover(&self.records).push(record.clone());
        Ok(())
    }

    fn records(&self) -> Result<Vec<TurnRecord>> {
        Ok(lock_mutex_recover(&self.records).clone())
    }
}
