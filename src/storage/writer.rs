// Background writer that persists turn records off the async executor
//
// Records are queued on an unbounded channel and appended by one task, each
// append running on the blocking pool. Queue order is append order.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{RecordStore, TurnRecord};

/// Cheap, cloneable handle for queueing records
#[derive(Debug, Clone)]
pub struct RecordSink {
    tx: mpsc::UnboundedSender<TurnRecord>,
}

impl RecordSink {
    /// Sink plus the receiving end, for callers that drain records themselves
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TurnRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a record. Never blocks.
    pub fn send(&self, record: TurnRecord) {
        if let Err(e) = self.tx.send(record) {
            log::error!(
                "Record writer is gone, dropping record of turn {}",
                e.0.turn_id()
            );
        }
    }
}

pub struct RecordWriter {
    sink: RecordSink,
    task: JoinHandle<()>,
}

impl RecordWriter {
    /// Start the writer task. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn RecordStore>) -> Self {
        let (sink, mut rx) = RecordSink::channel();

        let task = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                let store = store.clone();
                let turn_id = record.turn_id().to_string();
                match tokio::task::spawn_blocking(move || store.append(&record)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        log::error!("Failed to persist record of turn {}: {}", turn_id, e)
                    }
                    Err(e) => log::error!("Record append for turn {} panicked: {}", turn_id, e),
                }
            }
        });

        Self { sink, task }
    }

    pub fn sink(&self) -> RecordSink {
        self.sink.clone()
    }

    pub fn send(&self, record: TurnRecord) {
        self.sink.send(record);
    }

    /// Wait until every queued record is written.
    ///
    /// Completes once all sinks handed out by [`RecordWriter::sink`] are dropped.
    pub async fn finish(self) {
        drop(self.sink);
        if let Err(e) = self.task.await {
            log::error!("Record writer stopped unexpectedly: {}", e);
        }
    }
}
