use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::CommandInvoker;
use crate::config::CommandConfig;
use crate::coordinator::{AgentInvoker, InvocationReply, InvocationRequest};
use crate::errors::AgentInvocationError;

/// Routes each invocation to the invoker registered for its agent id
#[derive(Default, Clone)]
pub struct AgentDispatcher {
    handlers: HashMap<String, Arc<dyn AgentInvoker>>,
    fallback: Option<Arc<dyn AgentInvoker>>,
}

impl AgentDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher over configured commands
    pub fn from_commands(
        commands: &BTreeMap<String, CommandConfig>,
        default_command: Option<&CommandConfig>,
    ) -> Self {
        let mut dispatcher = Self::new();
        for (agent_id, config) in commands {
            dispatcher.register(agent_id, Arc::new(CommandInvoker::new(config.clone())));
        }
        if let Some(config) = default_command {
            dispatcher.fallback = Some(Arc::new(CommandInvoker::new(config.clone())));
        }
        dispatcher
    }

    /// Register (or replace) the handler for an agent
    pub fn register(&mut self, agent_id: &str, invoker: Arc<dyn AgentInvoker>) {
        self.handlers.insert(agent_id.to_string(), invoker);
    }

    pub fn with_handler(mut self, agent_id: &str, invoker: Arc<dyn AgentInvoker>) -> Self {
        self.register(agent_id, invoker);
        self
    }

    /// Handler for agents without their own registration
    pub fn with_fallback(mut self, invoker: Arc<dyn AgentInvoker>) -> Self {
        self.fallback = Some(invoker);
        self
    }

    pub fn has_handler(&self, agent_id: &str) -> bool {
        self.handlers.contains_key(agent_id) || self.fallback.is_some()
    }

    /// Agent ids with a dedicated handler, sorted
    pub fn agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.handlers.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl AgentInvoker for AgentDispatcher {
    async fn invoke(
        &self,
        request: InvocationRequest,
    ) -> Result<InvocationReply, AgentInvocationError> {
        let handler = self
            .handlers
            .get(&request.agent_id)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| AgentInvocationError::NoHandler(request.agent_id.clone()))?;

        handler.invoke(request).await
    }
}
