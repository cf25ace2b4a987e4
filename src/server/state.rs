//! Server application state shared across handlers

use super::events::EventBroadcaster;
use crate::coordinator::Coordinator;
use crate::shutdown::ShutdownState;
use std::sync::Arc;

#[derive(Clone)]
pub struct ServerAppState {
    pub coordinator: Arc<Coordinator>,

    /// Event broadcaster for WebSocket clients
    pub broadcaster: Arc<EventBroadcaster>,

    pub shutdown_state: ShutdownState,
}

impl ServerAppState {
    /// Wire the coordinator to the broadcaster so turn events reach clients
    pub fn new(
        coordinator: Coordinator,
        broadcaster: Arc<EventBroadcaster>,
        shutdown_state: ShutdownState,
    ) -> Self {
        Self {
            coordinator: Arc::new(coordinator.with_broadcaster(broadcaster.clone())),
            broadcaster,
            shutdown_state,
        }
    }
}
